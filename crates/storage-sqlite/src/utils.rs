//! Helpers shared by the repositories.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;
use ledgerfolio_core::Result;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite caps bound parameters per statement (SQLITE_MAX_VARIABLE_NUMBER,
/// 999 on older builds); 500 leaves room for the query's other parameters.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Splits a slice into chunks that fit in one `IN (...)` clause.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Decimals are stored as TEXT to keep their exact scale.
pub fn parse_decimal(column: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| {
        StorageError::CorruptValue(format!("{} = '{}': {}", column, raw, e)).into()
    })
}

pub fn parse_optional_decimal(column: &str, raw: Option<&str>) -> Result<Option<Decimal>> {
    raw.map(|value| parse_decimal(column, value)).transpose()
}

pub fn optional_decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}
