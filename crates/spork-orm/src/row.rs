//! Generic row records.

use spork_core::{ColumnValues, FromSqlValue, SqlValue};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::{OrmError, Result};

/// One result row: column name to value, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbRow {
    values: ColumnValues,
}

impl DbRow {
    #[must_use]
    pub const fn new(values: ColumnValues) -> Self {
        Self { values }
    }

    /// Raw value of a column.
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    /// Typed value of a column.
    ///
    /// # Errors
    ///
    /// [`OrmError::MissingColumn`] if the column is absent,
    /// [`OrmError::Decode`] if it cannot be read as `T`.
    pub fn get<T: FromSqlValue>(&self, column: &str) -> Result<T> {
        let value = self
            .value(column)
            .ok_or_else(|| OrmError::MissingColumn(column.to_string()))?;
        decode(column, value)
    }

    /// Returns `true` if the column is absent or null.
    #[must_use]
    pub fn is_null(&self, column: &str) -> bool {
        self.value(column).is_none_or(SqlValue::is_null)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.columns()
    }

    #[must_use]
    pub const fn values(&self) -> &ColumnValues {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> ColumnValues {
        self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn from_sqlite(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let mut values = ColumnValues::new();
        for (index, column) in row.columns().iter().enumerate() {
            let (is_null, storage) = {
                let raw = row.try_get_raw(index)?;
                (raw.is_null(), raw.type_info().name().to_ascii_uppercase())
            };
            let value = if is_null {
                SqlValue::Null
            } else {
                match storage.as_str() {
                    "INTEGER" | "INT" | "INT8" | "BIGINT" | "BOOLEAN" | "BOOL" => {
                        SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?)
                    }
                    "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                        SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?)
                    }
                    "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
                    _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
                }
            };
            values.set(column.name(), value);
        }
        Ok(Self { values })
    }
}

/// Decodes one value, naming the column in the error.
///
/// # Errors
///
/// [`OrmError::Decode`] when `value` cannot be read as `T`.
pub fn decode<T: FromSqlValue>(column: &str, value: &SqlValue) -> Result<T> {
    T::from_sql_value(value).ok_or_else(|| OrmError::Decode {
        column: column.to_string(),
        expected: std::any::type_name::<T>(),
        found: value.type_name(),
    })
}
