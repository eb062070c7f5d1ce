//! SQL grammars.
//!
//! A [`Grammar`] turns a [`Query`] into SQL text and defines the order in
//! which staged values are bound. Compilation is pure: no I/O, no state.
//! Dialects only override the identifier quote; every compile step has a
//! default implementation that can be overridden piecemeal.

mod mysql;
mod sqlite;

pub use mysql::MySqlGrammar;
pub use sqlite::SqliteGrammar;

use crate::binding::StatementKind;
use crate::clause::{Clause, ClauseKind};
use crate::error::{QueryError, Result};
use crate::query::Query;
use crate::value::SqlValue;

/// Select components, in the order they are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Columns,
    From,
    Joins,
    Wheres,
    Groups,
    Havings,
    Orders,
    Limit,
    Offset,
}

impl Component {
    /// Fixed pipeline order for `SELECT`.
    pub const SELECT: [Self; 9] = [
        Self::Columns,
        Self::From,
        Self::Joins,
        Self::Wheres,
        Self::Groups,
        Self::Havings,
        Self::Orders,
        Self::Limit,
        Self::Offset,
    ];
}

/// Dialect-specific SQL compiler.
pub trait Grammar: Send + Sync {
    /// Dialect name.
    fn name(&self) -> &'static str;

    /// Identifier quote character.
    fn identifier_quote(&self) -> char {
        '`'
    }

    /// Parameter placeholder.
    fn placeholder(&self) -> &'static str {
        SqlValue::placeholder()
    }

    /// Quotes a single identifier segment, doubling embedded quotes.
    fn quote(&self, segment: &str) -> String {
        let quote = self.identifier_quote();
        let escaped = segment.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }

    /// Quotes an identifier.
    ///
    /// Dotted names are handled per segment: `*` stays bare, a segment
    /// already wrapped in the quote character is kept, anything else is
    /// quoted.
    fn wrap(&self, identifier: &str) -> String {
        if identifier == "*" {
            return identifier.to_string();
        }
        let quote = self.identifier_quote();
        identifier
            .split('.')
            .map(|segment| {
                let quoted = segment.len() >= 2
                    && segment.starts_with(quote)
                    && segment.ends_with(quote);
                if segment == "*" || quoted {
                    segment.to_string()
                } else {
                    self.quote(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Compiles `query` as statement `kind`.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from the per-kind compiler.
    fn compile(&self, kind: StatementKind, query: &Query) -> Result<String> {
        if query.table_name().is_empty() {
            return Err(QueryError::MissingTable);
        }
        match kind {
            StatementKind::Select => Ok(self.compile_select(query)),
            StatementKind::Exists => Ok(self.compile_exists(query)),
            StatementKind::Insert => self.compile_insert(query),
            StatementKind::InsertMany => self.compile_insert_many(query),
            StatementKind::Update => self.compile_update(query),
            StatementKind::Delete => Ok(self.compile_delete(query)),
        }
    }

    /// Bound values for the statement `compile(kind, query)` produces.
    fn bind(&self, query: &Query, kind: StatementKind) -> Vec<SqlValue> {
        query.bindings_for(kind)
    }

    /// `SELECT ...`, assembled from [`Component::SELECT`].
    fn compile_select(&self, query: &Query) -> String {
        Component::SELECT
            .iter()
            .map(|component| self.compile_component(*component, query))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One select component; empty when it does not apply.
    fn compile_component(&self, component: Component, query: &Query) -> String {
        match component {
            Component::Columns => self.compile_columns(query),
            Component::From => self.compile_from(query),
            Component::Joins => self.compile_joins(query),
            Component::Wheres => self.compile_wheres(query),
            Component::Groups => self.compile_groups(query),
            Component::Havings => self.compile_havings(query),
            Component::Orders => self.compile_orders(query),
            Component::Limit => query
                .limit_value()
                .map_or_else(String::new, |n| format!("LIMIT {n}")),
            Component::Offset => query
                .offset_value()
                .map_or_else(String::new, |n| format!("OFFSET {n}")),
        }
    }

    fn compile_columns(&self, query: &Query) -> String {
        let columns = if query.columns().is_empty() {
            String::from("*")
        } else {
            query
                .columns()
                .iter()
                .map(|c| self.wrap(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        if query.is_distinct() {
            format!("SELECT DISTINCT {columns}")
        } else {
            format!("SELECT {columns}")
        }
    }

    fn compile_from(&self, query: &Query) -> String {
        if query.table_name().is_empty() {
            return String::new();
        }
        format!("FROM {}", self.wrap(query.table_name()))
    }

    /// Join operands are emitted as given.
    fn compile_joins(&self, query: &Query) -> String {
        query
            .joins()
            .iter()
            .map(|join| {
                format!(
                    "{} JOIN {} ON {} {} {}",
                    join.kind.as_sql(),
                    join.table,
                    join.left,
                    join.operator.to_sql(),
                    join.right
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn compile_wheres(&self, query: &Query) -> String {
        if query.wheres().is_empty() {
            return String::new();
        }
        format!("WHERE {}", self.compile_clauses(query.wheres()))
    }

    fn compile_groups(&self, query: &Query) -> String {
        if query.groups().is_empty() {
            return String::new();
        }
        let groups: Vec<_> = query.groups().iter().map(|g| self.wrap(g)).collect();
        format!("GROUP BY {}", groups.join(", "))
    }

    fn compile_havings(&self, query: &Query) -> String {
        if query.havings().is_empty() {
            return String::new();
        }
        format!("HAVING {}", self.compile_clauses(query.havings()))
    }

    fn compile_orders(&self, query: &Query) -> String {
        if query.orders().is_empty() {
            return String::new();
        }
        let orders: Vec<_> = query
            .orders()
            .iter()
            .map(|o| format!("{} {}", self.wrap(&o.column), o.direction.as_sql()))
            .collect();
        format!("ORDER BY {}", orders.join(", "))
    }

    /// Joins clauses with their connectors; the first connector is dropped.
    fn compile_clauses(&self, clauses: &[Clause]) -> String {
        let mut sql = String::new();
        for (index, clause) in clauses.iter().enumerate() {
            if index > 0 {
                sql.push(' ');
                sql.push_str(clause.connector.as_sql());
                sql.push(' ');
            }
            sql.push_str(&self.compile_clause(&clause.kind));
        }
        sql
    }

    /// Renders one predicate.
    fn compile_clause(&self, kind: &ClauseKind) -> String {
        match kind {
            ClauseKind::Basic {
                column, operator, ..
            } => format!(
                "{} {} {}",
                self.wrap(column),
                operator.to_sql(),
                self.placeholder()
            ),
            ClauseKind::Null { column, negated } => {
                let not = if *negated { " NOT" } else { "" };
                format!("{} IS{not} NULL", self.wrap(column))
            }
            ClauseKind::Membership {
                column,
                values,
                negated,
            } => {
                // An empty list matches nothing (IN) or everything (NOT IN).
                if values.is_empty() {
                    return String::from(if *negated { "1 = 1" } else { "0 = 1" });
                }
                let not = if *negated { " NOT" } else { "" };
                format!(
                    "{}{not} IN ({})",
                    self.wrap(column),
                    self.parameterize(values.len())
                )
            }
            ClauseKind::Sub {
                column,
                query,
                negated,
            } => {
                let not = if *negated { " NOT" } else { "" };
                format!(
                    "{}{not} IN ({})",
                    self.wrap(column),
                    self.compile_select(query)
                )
            }
        }
    }

    /// `?, ?, ?`
    fn parameterize(&self, count: usize) -> String {
        vec![self.placeholder(); count].join(", ")
    }

    /// ``SELECT EXISTS(<select>) AS `exists` ``
    fn compile_exists(&self, query: &Query) -> String {
        format!(
            "SELECT EXISTS({}) AS {}",
            self.compile_select(query),
            self.wrap("exists")
        )
    }

    /// `INSERT INTO t (a, b) VALUES (?, ?)`, one tuple per staged row.
    ///
    /// # Errors
    ///
    /// - [`QueryError::EmptyInsert`] when nothing is staged.
    /// - [`QueryError::BindingMismatch`] when the staged values do not fill
    ///   the tuples.
    fn compile_insert(&self, query: &Query) -> Result<String> {
        let columns = query.insert_columns();
        let rows = query.insert_row_count();
        if columns.is_empty() || rows == 0 {
            return Err(QueryError::EmptyInsert);
        }
        let staged = query.bindings_for(StatementKind::Insert).len();
        if staged != columns.len() * rows {
            return Err(QueryError::BindingMismatch {
                placeholders: columns.len() * rows,
                bindings: staged,
            });
        }

        let names: Vec<_> = columns.iter().map(|c| self.wrap(c)).collect();
        let tuple = format!("({})", self.parameterize(columns.len()));
        Ok(format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.wrap(query.table_name()),
            names.join(", "),
            vec![tuple.as_str(); rows].join(", ")
        ))
    }

    /// Multi-row insert. Row shapes are validated when rows are staged;
    /// this re-checks the staged values before rendering anything.
    ///
    /// # Errors
    ///
    /// Same as [`Grammar::compile_insert`].
    fn compile_insert_many(&self, query: &Query) -> Result<String> {
        self.compile_insert(query)
    }

    /// `UPDATE t SET a = ?, b = ? [WHERE ...]`
    ///
    /// # Errors
    ///
    /// [`QueryError::EmptyAssignment`] when no assignment is staged.
    fn compile_update(&self, query: &Query) -> Result<String> {
        if query.assignments().is_empty() {
            return Err(QueryError::EmptyAssignment);
        }
        let sets: Vec<_> = query
            .assignments()
            .iter()
            .map(|c| format!("{} = {}", self.wrap(c), self.placeholder()))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.wrap(query.table_name()), sets.join(", "));
        let wheres = self.compile_wheres(query);
        if !wheres.is_empty() {
            sql.push(' ');
            sql.push_str(&wheres);
        }
        Ok(sql)
    }

    /// `DELETE FROM t [WHERE ...]`
    fn compile_delete(&self, query: &Query) -> String {
        let mut sql = format!("DELETE FROM {}", self.wrap(query.table_name()));
        let wheres = self.compile_wheres(query);
        if !wheres.is_empty() {
            sql.push(' ');
            sql.push_str(&wheres);
        }
        sql
    }
}
