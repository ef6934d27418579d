//! Error types for the connection pagination layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`StorageError`] - Database/repository errors
//! - [`CursorError`] - Opaque cursor encoding and decoding errors
//! - [`ConnectionError`] - Errors raised while resolving one connection page
//!
//! Error conversion is automatic via `From` implementations where the
//! conversion is unambiguous, allowing `?` to work across error boundaries.
//! Storage failures are never converted implicitly into a [`ConnectionError`]:
//! the resolver attributes them to the query phase that produced them.

use thiserror::Error;

/// Message shown to callers for any retryable collection failure.
pub const UNABLE_TO_LOAD_COLLECTION: &str = "Unable to load collection. Please try again.";

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries
/// and data serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The store does not know how to traverse the requested relation.
    #[error("Unsupported relation '{relation}' for collection {collection}")]
    UnsupportedRelation {
        /// Collection being scoped.
        collection: &'static str,
        /// Relation identifier returned by the scope collaborator.
        relation: String,
    },

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Cursor Errors
// =============================================================================

/// Opaque cursor decoding failures.
///
/// A cursor that cannot be decoded is an invalid-input error, never a
/// "record not found" condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    /// Token is not valid base64.
    #[error("Cursor is not a valid token")]
    InvalidEncoding,

    /// Token decoded but its payload does not have the expected shape.
    #[error("Cursor payload is malformed")]
    Malformed,

    /// Token was issued for another collection or ordering.
    #[error("Cursor was issued for {found}, expected {expected}")]
    ForeignScope {
        /// Scope the resolver expected.
        expected: String,
        /// Scope carried by the token.
        found: String,
    },
}

// =============================================================================
// Connection Errors
// =============================================================================

/// Errors raised while resolving a single connection page.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Both `first` and `last` were supplied.
    #[error(
        "Passing both `first` and `last` to paginate the `{collection}` connection is not supported"
    )]
    ConflictingPageBounds {
        /// Collection that was queried.
        collection: &'static str,
    },

    /// A page count was negative or above the allowed maximum.
    #[error("`{argument}` on the `{collection}` connection must be between 0 and {max}, got {value}")]
    InvalidPageSize {
        /// Collection that was queried.
        collection: &'static str,
        /// Argument name (`first` or `last`).
        argument: &'static str,
        /// Value supplied by the caller.
        value: i64,
        /// Maximum accepted value.
        max: usize,
    },

    /// An `after`/`before` cursor failed to decode.
    #[error("Invalid `{argument}` cursor: {source}")]
    InvalidCursor {
        /// Argument name (`after` or `before`).
        argument: &'static str,
        /// Decode failure.
        #[source]
        source: CursorError,
    },

    /// A cursor decoded but its record no longer exists.
    #[error("The `{argument}` cursor no longer points to an existing record")]
    StaleCursor {
        /// Argument name (`after` or `before`).
        argument: &'static str,
    },

    /// Resolving the principal's visibility scope failed.
    #[error("Eligible set query failed for {collection}: {source}")]
    EligibleSet {
        /// Collection that was queried.
        collection: &'static str,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// Fetching the page window or total count failed.
    #[error("Window query failed for {collection}: {source}")]
    WindowFetch {
        /// Collection that was queried.
        collection: &'static str,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },
}

impl ConnectionError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EligibleSet { .. } | Self::WindowFetch { .. })
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConflictingPageBounds { .. } => "conflicting_page_bounds",
            Self::InvalidPageSize { .. } => "invalid_page_size",
            Self::InvalidCursor { .. } => "invalid_cursor",
            Self::StaleCursor { .. } => "stale_cursor",
            Self::EligibleSet { .. } => "eligible_set",
            Self::WindowFetch { .. } => "window_fetch",
        }
    }

    /// Message safe to return to API callers.
    ///
    /// Backing-store failures collapse into one generic message; the specific
    /// cause stays in the logs.
    pub fn public_message(&self) -> String {
        if self.is_retryable() {
            UNABLE_TO_LOAD_COLLECTION.to_string()
        } else {
            self.to_string()
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for cursor decoding.
pub type CursorResult<T> = Result<T, CursorError>;

/// Result type for connection resolution.
pub type ConnectionResult<T> = Result<T, ConnectionError>;
