//! Clause model: predicates, joins and orderings.
//!
//! Clauses are plain data. Rendering lives in [`crate::grammar`].

use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, Result};
use crate::query::Query;
use crate::value::SqlValue;

/// Operators accepted by `where`, `having` and `join`.
///
/// Matching is case-insensitive.
pub const OPERATORS: &[&str] = &[
    "=",
    "<",
    ">",
    "<=",
    ">=",
    "<>",
    "!=",
    "<=>",
    "like",
    "like binary",
    "not like",
    "ilike",
    "&",
    "|",
    "^",
    "<<",
    ">>",
    "rlike",
    "regexp",
    "not regexp",
    "~",
    "~*",
    "!~*",
    "similar to",
    "not similar to",
    "not ilike",
    "~~*",
    "!~~*",
];

/// A whitelisted comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operator(&'static str);

impl Operator {
    /// Equality.
    pub const EQ: Self = Self("=");

    /// Validates `raw` against [`OPERATORS`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] for anything outside the whitelist.
    pub fn parse(raw: &str) -> Result<Self> {
        let wanted = raw.trim();
        OPERATORS
            .iter()
            .find(|op| op.eq_ignore_ascii_case(wanted))
            .map(|op| Self(*op))
            .ok_or_else(|| QueryError::InvalidOperator(raw.to_string()))
    }

    /// Canonical lower-case spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }

    /// Returns `true` for `!=` and `<>`.
    #[must_use]
    pub fn is_negation(self) -> bool {
        matches!(self.0, "!=" | "<>")
    }

    /// SQL rendering: word operators upper-cased, symbols verbatim.
    #[must_use]
    pub fn to_sql(self) -> String {
        if self.0.chars().any(|c| c.is_ascii_alphabetic()) {
            self.0.to_ascii_uppercase()
        } else {
            self.0.to_string()
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Connector joining a clause to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    /// `AND`
    #[default]
    And,
    /// `OR`
    Or,
}

impl Connector {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// One predicate kind.
#[derive(Debug, Clone)]
pub enum ClauseKind {
    /// `column <op> ?`
    Basic {
        /// Column name.
        column: String,
        /// Comparison operator.
        operator: Operator,
        /// Bound value.
        value: SqlValue,
    },
    /// `column IS [NOT] NULL`
    Null {
        /// Column name.
        column: String,
        /// `IS NOT NULL` when set.
        negated: bool,
    },
    /// `column [NOT] IN (?, ...)`
    Membership {
        /// Column name.
        column: String,
        /// One placeholder per value.
        values: Vec<SqlValue>,
        /// `NOT IN` when set.
        negated: bool,
    },
    /// `column [NOT] IN (<select>)`
    Sub {
        /// Column name.
        column: String,
        /// Embedded child select.
        query: Box<Query>,
        /// `NOT IN` when set.
        negated: bool,
    },
}

impl ClauseKind {
    /// Builds a basic comparison.
    ///
    /// A null value becomes a null check instead of a bound `NULL`:
    /// `!=`/`<>` map to `IS NOT NULL`, every other operator to `IS NULL`.
    #[must_use]
    pub fn basic(column: impl Into<String>, operator: Operator, value: SqlValue) -> Self {
        let column = column.into();
        if value.is_null() {
            return Self::Null {
                column,
                negated: operator.is_negation(),
            };
        }
        Self::Basic {
            column,
            operator,
            value,
        }
    }

    /// Column the predicate tests.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Basic { column, .. }
            | Self::Null { column, .. }
            | Self::Membership { column, .. }
            | Self::Sub { column, .. } => column,
        }
    }
}

/// A predicate plus its connector to the previous predicate.
///
/// The first clause's connector is never rendered.
#[derive(Debug, Clone)]
pub struct Clause {
    /// Connector to the preceding clause.
    pub connector: Connector,
    /// The predicate.
    pub kind: ClauseKind,
}

/// Join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `FULL OUTER JOIN`
    Outer,
}

impl JoinKind {
    /// SQL keyword(s) preceding `JOIN`.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Outer => "FULL OUTER",
        }
    }
}

/// `<kind> JOIN table ON left <op> right`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub table: String,
    pub left: String,
    pub operator: Operator,
    pub right: String,
    pub kind: JoinKind,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if trimmed.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(QueryError::InvalidDirection(s.to_string()))
        }
    }
}

/// `column ASC|DESC`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub column: String,
    pub direction: Direction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_whitelist_case_insensitive() {
        assert_eq!(Operator::parse("LIKE").unwrap().as_str(), "like");
        assert_eq!(Operator::parse(" Not Like ").unwrap().as_str(), "not like");
        assert_eq!(Operator::parse("<=>").unwrap().as_str(), "<=>");
    }

    #[test]
    fn test_operator_rejects_unknown() {
        assert_eq!(
            Operator::parse("==="),
            Err(QueryError::InvalidOperator(String::from("===")))
        );
        assert!(Operator::parse("; drop table x").is_err());
        assert!(Operator::parse("").is_err());
    }

    #[test]
    fn test_operator_rendering() {
        assert_eq!(Operator::parse("similar to").unwrap().to_sql(), "SIMILAR TO");
        assert_eq!(Operator::parse("~*").unwrap().to_sql(), "~*");
    }

    #[test]
    fn test_null_value_becomes_null_check() {
        let kind = ClauseKind::basic("a", Operator::EQ, SqlValue::Null);
        assert!(matches!(kind, ClauseKind::Null { negated: false, .. }));

        let ne = Operator::parse("<>").unwrap();
        let kind = ClauseKind::basic("a", ne, SqlValue::Null);
        assert!(matches!(kind, ClauseKind::Null { negated: true, .. }));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("ASC".parse::<Direction>(), Ok(Direction::Asc));
        assert_eq!("desc".parse::<Direction>(), Ok(Direction::Desc));
        assert_eq!(
            "$$$".parse::<Direction>(),
            Err(QueryError::InvalidDirection(String::from("$$$")))
        );
    }

    #[test]
    fn test_outer_join_is_full_outer() {
        assert_eq!(JoinKind::Outer.as_sql(), "FULL OUTER");
    }
}
