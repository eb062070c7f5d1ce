use spork_core::{ColumnValues, EventKind, HookOutcome, Query, Schema, SqlValue, ToSqlValue};

use super::Enhancer;

/// Restricts every select, update and delete to `column = value`, and
/// fills `column` on insert. Typical use is tenant scoping.
#[derive(Debug, Clone)]
pub struct ColumnScope {
    name: String,
    column: String,
    value: SqlValue,
}

impl ColumnScope {
    #[must_use]
    pub fn new(name: impl Into<String>, column: impl Into<String>, value: impl ToSqlValue) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            value: value.to_sql_value(),
        }
    }
}

impl Enhancer for ColumnScope {
    fn name(&self) -> &str {
        &self.name
    }

    fn enhance(&self, _schema: &'static Schema, query: &mut Query) {
        for kind in [EventKind::PreSelect, EventKind::PreUpdate, EventKind::PreDelete] {
            let column = self.column.clone();
            let value = self.value.clone();
            query.listen(kind, move |event| {
                event
                    .query_mut()
                    .apply(|q| q.where_eq(column.as_str(), &value));
                Ok(HookOutcome::Continue)
            });
        }
    }

    fn on_insert(&self, _schema: &'static Schema, values: &mut ColumnValues) {
        if values.get(&self.column).is_none_or(SqlValue::is_null) {
            values.set(self.column.as_str(), &self.value);
        }
    }
}
