use chrono::Utc;
use spork_core::{ColumnValues, EventKind, HookOutcome, Query, Schema, StatementKind};

use super::{Enhancer, SOFT_DELETE};

/// Marks rows as deleted instead of removing them.
///
/// Selects gain `<column> IS NULL`. A delete is canceled on `pre_delete`
/// and replaced by an update setting the column to the current time,
/// restricted to rows that are not already trashed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftDeletes;

impl Enhancer for SoftDeletes {
    fn name(&self) -> &str {
        SOFT_DELETE
    }

    fn enhance(&self, schema: &'static Schema, query: &mut Query) {
        let Some(column) = schema.soft_delete_column() else {
            return;
        };

        query.listen(EventKind::PreSelect, move |event| {
            event.query_mut().apply(|q| q.where_null(column));
            Ok(HookOutcome::Continue)
        });

        query.listen(EventKind::PreDelete, move |event| {
            let now = Utc::now();
            let mut values = ColumnValues::new().with(column, now);
            if let Some(ts) = schema.timestamps() {
                values.set(ts.updated, now);
            }
            let mut update = event.query().clone();
            update.apply(|q| q.where_null(column));
            update.stage_update(values);
            event.substitute(StatementKind::Update, update);
            Ok(HookOutcome::Cancel)
        });
    }
}

#[cfg(test)]
mod tests {
    use spork_core::{dispatch, ColumnDef, Grammar, MySqlGrammar, SqlValue};

    use super::*;

    const COLUMNS: &[ColumnDef] = &[ColumnDef::new("id").primary_key(), ColumnDef::new("deleted_at")];
    static SCHEMA: Schema = Schema::new("posts", COLUMNS).soft_deletes("deleted_at");

    #[test]
    fn test_select_excludes_trashed() {
        let mut query = Query::table("posts").where_eq("id", 1);
        SoftDeletes.enhance(&SCHEMA, &mut query);
        dispatch(EventKind::PreSelect, &mut query).unwrap();
        assert_eq!(
            MySqlGrammar.compile_select(&query),
            "SELECT * FROM `posts` WHERE `id` = ? AND `deleted_at` IS NULL"
        );
    }

    #[test]
    fn test_delete_becomes_update() {
        let mut query = Query::table("posts").where_eq("id", 1);
        SoftDeletes.enhance(&SCHEMA, &mut query);
        let report = dispatch(EventKind::PreDelete, &mut query).unwrap();
        assert!(report.is_canceled());

        let subs = report.into_substitutes();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].kind(), StatementKind::Update);
        let update = subs[0].query();
        assert_eq!(
            MySqlGrammar.compile(StatementKind::Update, update).unwrap(),
            "UPDATE `posts` SET `deleted_at` = ? WHERE `id` = ? AND `deleted_at` IS NULL"
        );
        let bindings = MySqlGrammar.bind(update, StatementKind::Update);
        assert!(matches!(bindings[0], SqlValue::Timestamp(_)));
        assert_eq!(bindings[1], SqlValue::Int(1));
    }
}
