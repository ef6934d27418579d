//! Opaque cursor codec.
//!
//! Cursors identify one record's position in one ordered collection. The
//! codec is a narrow trust boundary: everything outside the resolver treats
//! a cursor as an unparsed string, and decoding checks that the token was
//! issued for the collection and ordering being queried.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::{CursorError, CursorResult};
use crate::models::{FieldName, Language, Record};

use super::pagination::{Cursor, OrderBy};

/// Format marker prefixed to every encoded payload.
const CURSOR_VERSION: &str = "v1";

/// The collection and ordering a cursor belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorScope {
    pub collection: &'static str,
    /// Ordering descriptor, e.g. `name.asc` or `name.asc.fr`.
    pub ordering: String,
}

impl CursorScope {
    pub fn new<F: FieldName>(collection: &'static str, order_by: &OrderBy<F>) -> Self {
        Self {
            collection,
            ordering: format!("{}.{}", order_by.field.as_str(), order_by.direction.as_str()),
        }
    }

    /// Scope for a page of `T`. Localized sort fields carry the language,
    /// since each language orders the collection differently.
    pub fn for_records<T: Record>(order_by: &OrderBy<T::SortField>, language: Language) -> Self {
        let scope = Self::new(T::COLLECTION, order_by);
        if T::localized_sort(order_by.field) {
            scope.in_language(language)
        } else {
            scope
        }
    }

    pub fn in_language(mut self, language: Language) -> Self {
        self.ordering = format!("{}.{}", self.ordering, language.code());
        self
    }
}

impl std::fmt::Display for CursorScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ordered by {}", self.collection, self.ordering)
    }
}

/// A cursor payload after decoding, not yet checked against a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCursor {
    pub collection: String,
    pub ordering: String,
    pub key: String,
}

impl DecodedCursor {
    /// Return the record key if the cursor was issued for `expected`.
    pub fn into_key_for(self, expected: &CursorScope) -> CursorResult<String> {
        if self.collection != expected.collection || self.ordering != expected.ordering {
            return Err(CursorError::ForeignScope {
                expected: expected.to_string(),
                found: format!("{} ordered by {}", self.collection, self.ordering),
            });
        }
        Ok(self.key)
    }
}

/// Encodes record positions into opaque cursors and back.
pub trait CursorCodec: Send + Sync {
    /// Build the cursor for `key` within `scope`.
    fn encode(&self, scope: &CursorScope, key: &str) -> Cursor;

    /// Parse a cursor previously produced by [`CursorCodec::encode`].
    fn decode(&self, cursor: &Cursor) -> CursorResult<DecodedCursor>;

    /// Decode and check the scope in one step.
    fn decode_key(&self, cursor: &Cursor, expected: &CursorScope) -> CursorResult<String> {
        self.decode(cursor)?.into_key_for(expected)
    }
}

/// Default codec: URL-safe base64 over `v1:<collection>:<ordering>:<key>`.
///
/// Keys may contain `:`; collection names and ordering descriptors never do.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64CursorCodec;

impl CursorCodec for Base64CursorCodec {
    fn encode(&self, scope: &CursorScope, key: &str) -> Cursor {
        let payload = format!(
            "{}:{}:{}:{}",
            CURSOR_VERSION, scope.collection, scope.ordering, key
        );
        Cursor::new(URL_SAFE_NO_PAD.encode(payload))
    }

    fn decode(&self, cursor: &Cursor) -> CursorResult<DecodedCursor> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor.as_str())
            .map_err(|_| CursorError::InvalidEncoding)?;
        let payload = String::from_utf8(bytes).map_err(|_| CursorError::Malformed)?;

        let mut parts = payload.splitn(4, ':');
        let (Some(version), Some(collection), Some(ordering), Some(key)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CursorError::Malformed);
        };

        if version != CURSOR_VERSION || collection.is_empty() || ordering.is_empty() || key.is_empty()
        {
            return Err(CursorError::Malformed);
        }

        Ok(DecodedCursor {
            collection: collection.to_string(),
            ordering: ordering.to_string(),
            key: key.to_string(),
        })
    }
}
