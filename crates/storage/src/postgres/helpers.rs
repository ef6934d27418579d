//! Shared helper functions for PostgreSQL row conversion.

use warden_core::error::{StorageError, StorageResult};

/// Parse a text column holding an enum value.
///
/// Returns an error naming the field if the value is not recognized.
pub fn parse_column<V>(
    value: &str,
    field_name: &str,
    parse: impl FnOnce(&str) -> Option<V>,
) -> StorageResult<V> {
    parse(value).ok_or_else(|| {
        StorageError::SerializationError(format!(
            "{} has unexpected value '{}'",
            field_name, value
        ))
    })
}

/// Convert a `BIGINT` aggregate to `u32`, rejecting negative or oversized values.
pub fn count_to_u32(value: i64, field_name: &str) -> StorageResult<u32> {
    u32::try_from(value).map_err(|_| {
        StorageError::SerializationError(format!(
            "{} is out of range: {}",
            field_name, value
        ))
    })
}

/// Escape `LIKE` wildcards so user search terms match literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
