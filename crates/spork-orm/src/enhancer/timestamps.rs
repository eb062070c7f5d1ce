use chrono::Utc;
use spork_core::{ColumnValues, Schema, SqlValue};

use super::{Enhancer, TIMESTAMPS};

/// Maintains the schema's created/updated timestamp columns.
///
/// Values the caller set explicitly are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamps;

impl Enhancer for Timestamps {
    fn name(&self) -> &str {
        TIMESTAMPS
    }

    fn on_insert(&self, schema: &'static Schema, values: &mut ColumnValues) {
        let Some(ts) = schema.timestamps() else {
            return;
        };
        let now = Utc::now();
        for column in [ts.created, ts.updated] {
            if values.get(column).is_none_or(SqlValue::is_null) {
                values.set(column, now);
            }
        }
    }

    fn on_update(&self, schema: &'static Schema, values: &mut ColumnValues) {
        let Some(ts) = schema.timestamps() else {
            return;
        };
        if !values.contains(ts.updated) {
            values.set(ts.updated, Utc::now());
        }
    }
}
