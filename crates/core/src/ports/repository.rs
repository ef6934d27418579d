//! Port traits for collection stores and visibility scoping.
//!
//! These traits define the storage interface used by the connection
//! resolver. Implementations live in the infrastructure layer
//! (e.g., `warden-storage`).
//!
//! Visibility and windowing are two separate stages so each can be tested
//! and diagnosed on its own:
//!
//! 1. [`CollectionStore::eligible_set`] - which keys the principal may see
//! 2. [`CollectionStore::fetch_window`] - one ordered window inside that set

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{AuditLog, Domain, Language, OrganizationRecord, Principal, Record, User};

use super::pagination::{OrderBy, OrderDirection, PageDirection};

/// Relation traversed for principals without elevated scope.
pub const AFFILIATIONS: &str = "affiliations";

// =============================================================================
// Scope Types
// =============================================================================

/// Visibility scope of a principal, as decided by the authorization
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every record of every collection is visible.
    Unrestricted,
    /// Only records reachable through `relation` are visible.
    Affiliated { relation: String },
}

/// Keys visible to one principal for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EligibleSet {
    All,
    Keys(BTreeSet<String>),
}

impl EligibleSet {
    pub fn contains(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Keys(keys) => keys.contains(key),
        }
    }

    /// True when nothing can be visible, so the window query can be skipped.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Keys(keys) if keys.is_empty())
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Comparison applied by a structured filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
}

/// One structured filter condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition<F> {
    pub field: F,
    pub comparison: Comparison,
    pub value: String,
}

/// Free-text search plus structured filters, applied to both the window
/// and the total count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFilter<F> {
    pub search: Option<String>,
    pub conditions: Vec<FilterCondition<F>>,
    pub language: Language,
}

impl<F> Default for CollectionFilter<F> {
    fn default() -> Self {
        Self {
            search: None,
            conditions: Vec::new(),
            language: Language::default(),
        }
    }
}

/// One over-fetched window request.
///
/// Stores return at most `limit` records strictly between the `after` and
/// `before` anchors (in `order_by` order, ties broken by key), scanned in
/// [`WindowQuery::scan_direction`] order. An anchor key that does not exist
/// must be reported as [`crate::error::StorageError::NotFound`] carrying that
/// key.
#[derive(Debug, Clone)]
pub struct WindowQuery<T: Record> {
    pub order_by: OrderBy<T::SortField>,
    pub direction: PageDirection,
    pub after: Option<String>,
    pub before: Option<String>,
    pub limit: usize,
    pub filter: CollectionFilter<T::FilterField>,
}

impl<T: Record> WindowQuery<T> {
    pub fn scan_direction(&self) -> OrderDirection {
        self.order_by.scan_direction(self.direction)
    }
}

// =============================================================================
// Store Traits
// =============================================================================

/// Authorization collaborator deciding a principal's visibility scope.
#[async_trait]
pub trait ScopeResolver: Send + Sync {
    async fn scope_for(&self, principal: &Principal) -> StorageResult<Scope>;
}

/// Read access to one paginated collection.
#[async_trait]
pub trait CollectionStore<T: Record>: Send + Sync {
    /// Keys reachable from `principal` through `relation`.
    async fn eligible_set(&self, principal: &Principal, relation: &str)
    -> StorageResult<EligibleSet>;

    /// Fetch one ordered window of records within the eligible set.
    async fn fetch_window(
        &self,
        eligible: &EligibleSet,
        query: &WindowQuery<T>,
    ) -> StorageResult<Vec<T>>;

    /// Count records within the eligible set matching `filter`.
    async fn count(
        &self,
        eligible: &EligibleSet,
        filter: &CollectionFilter<T::FilterField>,
    ) -> StorageResult<u64>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined store access for the API layer.
pub trait Repositories: Send + Sync {
    fn organizations(&self) -> &dyn CollectionStore<OrganizationRecord>;

    fn domains(&self) -> &dyn CollectionStore<Domain>;

    fn users(&self) -> &dyn CollectionStore<User>;

    fn audit_logs(&self) -> &dyn CollectionStore<AuditLog>;

    fn scopes(&self) -> &dyn ScopeResolver;
}
