//! Query descriptor and fluent builder.
//!
//! A [`Query`] accumulates everything needed to compile one statement:
//! table, columns, clauses, joins, ordering, pagination, staged write values
//! and the bound values for every placeholder. It is created per call,
//! mutated by builder methods and by lifecycle listeners, then consumed by a
//! [`Grammar`](crate::grammar::Grammar).
//!
//! ```rust
//! use spork_core::{Direction, MySqlGrammar, Grammar, Query};
//!
//! let query = Query::table("users")
//!     .select(["id", "name"])
//!     .where_eq("active", true)
//!     .where_op("age", ">=", 18)
//!     .unwrap()
//!     .order_by("name", Direction::Asc)
//!     .limit(10);
//!
//! assert_eq!(
//!     MySqlGrammar.compile_select(&query),
//!     "SELECT `id`, `name` FROM `users` WHERE `active` = ? AND `age` >= ? ORDER BY `name` ASC LIMIT 10"
//! );
//! ```

use crate::binding::{Bindings, Section, StatementKind};
use crate::clause::{
    Clause, ClauseKind, Connector, Direction, JoinClause, JoinKind, Operator, OrderClause,
};
use crate::error::{QueryError, Result};
use crate::event::{EventBus, EventKind, HookResult, LifecycleEvent, ListenerId};
use crate::value::{ColumnValues, SqlValue, ToSqlValue};

/// Accumulated state for one logical database operation.
#[derive(Debug, Clone, Default)]
pub struct Query {
    table: String,
    columns: Vec<String>,
    distinct: bool,
    wheres: Vec<Clause>,
    joins: Vec<JoinClause>,
    groups: Vec<String>,
    havings: Vec<Clause>,
    orders: Vec<OrderClause>,
    limit: Option<u64>,
    offset: Option<u64>,
    assignments: Vec<String>,
    insert_columns: Vec<String>,
    insert_rows: usize,
    bindings: Bindings,
    events: EventBus,
}

impl Query {
    /// Creates an empty descriptor. Set the table with [`Query::from`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a descriptor targeting `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Sets the target table.
    #[must_use]
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Replaces the selected columns. No columns selects `*`.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Emits `SELECT DISTINCT`. Idempotent.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    // Filters

    /// `column = value`. Same as `where_op(column, "=", value)`.
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.push_where(
            Connector::And,
            ClauseKind::basic(column, Operator::EQ, value.to_sql_value()),
        );
        self
    }

    /// `OR column = value`.
    #[must_use]
    pub fn or_where_eq(mut self, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        self.push_where(
            Connector::Or,
            ClauseKind::basic(column, Operator::EQ, value.to_sql_value()),
        );
        self
    }

    /// `column <operator> value`.
    ///
    /// A null value turns into `IS NULL` (or `IS NOT NULL` for `!=`/`<>`).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn where_op(
        self,
        column: impl Into<String>,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Result<Self> {
        self.basic(Connector::And, column, operator, value)
    }

    /// `OR column <operator> value`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn or_where_op(
        self,
        column: impl Into<String>,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Result<Self> {
        self.basic(Connector::Or, column, operator, value)
    }

    fn basic(
        mut self,
        connector: Connector,
        column: impl Into<String>,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Result<Self> {
        let operator = Operator::parse(operator)?;
        self.push_where(
            connector,
            ClauseKind::basic(column, operator, value.to_sql_value()),
        );
        Ok(self)
    }

    /// `column IS NULL`.
    #[must_use]
    pub fn where_null(self, column: impl Into<String>) -> Self {
        self.null(Connector::And, column, false)
    }

    /// `column IS NOT NULL`.
    #[must_use]
    pub fn where_not_null(self, column: impl Into<String>) -> Self {
        self.null(Connector::And, column, true)
    }

    /// `OR column IS NULL`.
    #[must_use]
    pub fn or_where_null(self, column: impl Into<String>) -> Self {
        self.null(Connector::Or, column, false)
    }

    /// `OR column IS NOT NULL`.
    #[must_use]
    pub fn or_where_not_null(self, column: impl Into<String>) -> Self {
        self.null(Connector::Or, column, true)
    }

    fn null(mut self, connector: Connector, column: impl Into<String>, negated: bool) -> Self {
        self.push_where(
            connector,
            ClauseKind::Null {
                column: column.into(),
                negated,
            },
        );
        self
    }

    /// `column IN (?, ...)`, one placeholder per value.
    #[must_use]
    pub fn where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.membership(Connector::And, column, values, false)
    }

    /// `column NOT IN (?, ...)`.
    #[must_use]
    pub fn where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.membership(Connector::And, column, values, true)
    }

    /// `OR column IN (?, ...)`.
    #[must_use]
    pub fn or_where_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.membership(Connector::Or, column, values, false)
    }

    /// `OR column NOT IN (?, ...)`.
    #[must_use]
    pub fn or_where_not_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.membership(Connector::Or, column, values, true)
    }

    fn membership<I, V>(
        mut self,
        connector: Connector,
        column: impl Into<String>,
        values: I,
        negated: bool,
    ) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToSqlValue,
    {
        self.push_where(
            connector,
            ClauseKind::Membership {
                column: column.into(),
                values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
                negated,
            },
        );
        self
    }

    /// `column IN (<sub select>)`.
    ///
    /// The child's bound values are absorbed into this descriptor's `where`
    /// section right away, in clause order.
    #[must_use]
    pub fn where_sub(self, column: impl Into<String>, query: Self) -> Self {
        self.sub(Connector::And, column, query, false)
    }

    /// `column NOT IN (<sub select>)`.
    #[must_use]
    pub fn where_not_sub(self, column: impl Into<String>, query: Self) -> Self {
        self.sub(Connector::And, column, query, true)
    }

    /// `OR column IN (<sub select>)`.
    #[must_use]
    pub fn or_where_sub(self, column: impl Into<String>, query: Self) -> Self {
        self.sub(Connector::Or, column, query, false)
    }

    fn sub(mut self, connector: Connector, column: impl Into<String>, query: Self, negated: bool) -> Self {
        self.push_where(
            connector,
            ClauseKind::Sub {
                column: column.into(),
                query: Box::new(query),
                negated,
            },
        );
        self
    }

    /// Appends a where clause, staging its values.
    pub fn push_where(&mut self, connector: Connector, kind: ClauseKind) {
        let kind = normalize(kind);
        self.bindings.extend(Section::Where, clause_values(&kind));
        self.wheres.push(Clause { connector, kind });
    }

    /// Appends a having clause, staging its values.
    pub fn push_having(&mut self, connector: Connector, kind: ClauseKind) {
        let kind = normalize(kind);
        self.bindings.extend(Section::Having, clause_values(&kind));
        self.havings.push(Clause { connector, kind });
    }

    // Joins

    /// `<kind> JOIN table ON left <operator> right`.
    ///
    /// Join operands are emitted verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn join(
        mut self,
        kind: JoinKind,
        table: impl Into<String>,
        left: impl Into<String>,
        operator: &str,
        right: impl Into<String>,
    ) -> Result<Self> {
        let operator = Operator::parse(operator)?;
        self.joins.push(JoinClause {
            table: table.into(),
            left: left.into(),
            operator,
            right: right.into(),
            kind,
        });
        Ok(self)
    }

    /// `INNER JOIN`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn inner_join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        operator: &str,
        right: impl Into<String>,
    ) -> Result<Self> {
        self.join(JoinKind::Inner, table, left, operator, right)
    }

    /// `LEFT JOIN`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn left_join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        operator: &str,
        right: impl Into<String>,
    ) -> Result<Self> {
        self.join(JoinKind::Left, table, left, operator, right)
    }

    /// `RIGHT JOIN`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn right_join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        operator: &str,
        right: impl Into<String>,
    ) -> Result<Self> {
        self.join(JoinKind::Right, table, left, operator, right)
    }

    /// `FULL OUTER JOIN`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn outer_join(
        self,
        table: impl Into<String>,
        left: impl Into<String>,
        operator: &str,
        right: impl Into<String>,
    ) -> Result<Self> {
        self.join(JoinKind::Outer, table, left, operator, right)
    }

    // Grouping, ordering, pagination

    /// Appends `GROUP BY` columns.
    #[must_use]
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(columns.into_iter().map(Into::into));
        self
    }

    /// `HAVING column <operator> value`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn having(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Result<Self> {
        let operator = Operator::parse(operator)?;
        self.push_having(
            Connector::And,
            ClauseKind::basic(column, operator, value.to_sql_value()),
        );
        Ok(self)
    }

    /// `OR column <operator> value` inside `HAVING`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOperator`] if `operator` is not whitelisted.
    pub fn or_having(
        mut self,
        column: impl Into<String>,
        operator: &str,
        value: impl ToSqlValue,
    ) -> Result<Self> {
        let operator = Operator::parse(operator)?;
        self.push_having(
            Connector::Or,
            ClauseKind::basic(column, operator, value.to_sql_value()),
        );
        Ok(self)
    }

    /// Appends an ordering.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(OrderClause {
            column: column.into(),
            direction,
        });
        self
    }

    /// Appends an ordering from a direction string (`asc`/`desc`, any case).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidDirection`] for any other direction.
    pub fn order_by_str(self, column: impl Into<String>, direction: &str) -> Result<Self> {
        let direction = direction.parse::<Direction>()?;
        Ok(self.order_by(column, direction))
    }

    /// Sets `LIMIT`.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets `OFFSET`.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    // Write staging

    /// Stages `SET` assignments for an update.
    pub fn stage_update(&mut self, values: ColumnValues) {
        for (column, value) in values {
            self.assignments.push(column);
            self.bindings.add(Section::Update, value);
        }
    }

    /// Stages insert rows.
    ///
    /// Every row must carry exactly the first row's columns. Values are
    /// aligned to the first row's column order. Nothing is staged unless
    /// every row is valid.
    ///
    /// # Errors
    ///
    /// - [`QueryError::EmptyInsert`] for no rows or an empty first row.
    /// - [`QueryError::InsertRowMismatch`] when a row's column count differs.
    /// - [`QueryError::InsertColumnMismatch`] when a row lacks a column.
    pub fn stage_insert(&mut self, rows: Vec<ColumnValues>) -> Result<()> {
        let columns: Vec<String> = match rows.first() {
            Some(first) if !first.is_empty() => first.columns().map(String::from).collect(),
            _ => return Err(QueryError::EmptyInsert),
        };

        let mut staged = Vec::with_capacity(columns.len() * rows.len());
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(QueryError::InsertRowMismatch {
                    row: index,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            for column in &columns {
                let value = row.get(column).ok_or_else(|| QueryError::InsertColumnMismatch {
                    row: index,
                    column: column.clone(),
                })?;
                staged.push(value.clone());
            }
        }

        self.insert_columns = columns;
        self.insert_rows = rows.len();
        self.bindings.extend(Section::Insert, staged);
        Ok(())
    }

    // In-place builder access

    /// Runs a fluent builder closure against a borrowed descriptor.
    ///
    /// ```rust
    /// use spork_core::Query;
    ///
    /// let mut query = Query::table("posts");
    /// query.apply(|q| q.where_null("deleted_at"));
    /// assert_eq!(query.wheres().len(), 1);
    /// ```
    pub fn apply(&mut self, f: impl FnOnce(Self) -> Self) {
        let current = std::mem::take(self);
        *self = f(current);
    }

    /// Fallible form of [`Query::apply`]. On error the descriptor is left
    /// as it was before the call.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error.
    pub fn try_apply(&mut self, f: impl FnOnce(Self) -> Result<Self>) -> Result<()> {
        let backup = self.clone();
        let current = std::mem::take(self);
        match f(current) {
            Ok(next) => {
                *self = next;
                Ok(())
            }
            Err(err) => {
                *self = backup;
                Err(err)
            }
        }
    }

    // Events

    /// Registers a lifecycle listener, builder style.
    #[must_use]
    pub fn on<F>(mut self, kind: EventKind, listener: F) -> Self
    where
        F: Fn(&mut LifecycleEvent<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.events.register(kind, listener);
        self
    }

    /// Registers a lifecycle listener and returns its id.
    pub fn listen<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&mut LifecycleEvent<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.events.register(kind, listener)
    }

    /// The descriptor's event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Mutable access to the event bus.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // Accessors

    /// Target table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Selected columns; empty means `*`.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    #[must_use]
    pub fn wheres(&self) -> &[Clause] {
        &self.wheres
    }

    #[must_use]
    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    #[must_use]
    pub fn havings(&self) -> &[Clause] {
        &self.havings
    }

    #[must_use]
    pub fn orders(&self) -> &[OrderClause] {
        &self.orders
    }

    #[must_use]
    pub const fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub const fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// Columns staged for `UPDATE ... SET`.
    #[must_use]
    pub fn assignments(&self) -> &[String] {
        &self.assignments
    }

    /// Columns staged for `INSERT`.
    #[must_use]
    pub fn insert_columns(&self) -> &[String] {
        &self.insert_columns
    }

    /// Number of staged insert rows.
    #[must_use]
    pub const fn insert_row_count(&self) -> usize {
        self.insert_rows
    }

    /// Staged values by section.
    #[must_use]
    pub const fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Values consumed by `kind`, in placeholder order.
    #[must_use]
    pub fn bindings_for(&self, kind: StatementKind) -> Vec<SqlValue> {
        self.bindings.for_statement(kind)
    }
}

fn normalize(kind: ClauseKind) -> ClauseKind {
    match kind {
        ClauseKind::Basic {
            column,
            operator,
            value,
        } => ClauseKind::basic(column, operator, value),
        other => other,
    }
}

fn clause_values(kind: &ClauseKind) -> Vec<SqlValue> {
    match kind {
        ClauseKind::Basic { value, .. } => vec![value.clone()],
        ClauseKind::Null { .. } => Vec::new(),
        ClauseKind::Membership { values, .. } => values.clone(),
        ClauseKind::Sub { query, .. } => query.bindings_for(StatementKind::Select),
    }
}
