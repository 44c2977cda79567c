//! SQLite driver glue: value conversion and result-set extraction.

use deadpool_sqlite::rusqlite::types::Value;
use deadpool_sqlite::rusqlite::{self, Statement, ToSql};

use crate::error::OrmError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Convert an engine value into a `rusqlite` value for binding.
#[must_use]
pub fn sql_value_to_sqlite(value: &SqlValue) -> Value {
    match value {
        SqlValue::Int(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Timestamp(ts) => Value::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        SqlValue::Null => Value::Null,
        SqlValue::Json(j) => Value::Text(j.to_string()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
    }
}

/// Convert a parameter slice for binding.
#[must_use]
pub fn to_sqlite_params(params: &[SqlValue]) -> Vec<Value> {
    params.iter().map(sql_value_to_sqlite).collect()
}

/// Extract one column value from a row.
///
/// # Errors
///
/// Returns the driver error when the column cannot be read.
pub fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, OrmError> {
    let value: Value = row.get(idx).map_err(OrmError::Sqlite)?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    })
}

/// Run a prepared statement and collect every row into a [`ResultSet`].
///
/// # Errors
///
/// Returns `OrmError::Sqlite` when execution or row extraction fails.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<ResultSet, OrmError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(10);
    result_set.set_column_names(column_names);

    let mut rows_iter = stmt.query(&param_refs[..])?;
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
