//! PostgreSQL storage adapter.
//!
//! This module implements the store traits defined in `warden-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - [`PgCollectionStore`] - Keyset window reads for any [`PgCollection`]
//! - [`PgScopeResolver`] - Super admin lookup
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_graphql(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(&db);
//! ```

mod collections;
mod database;
mod helpers;
mod scope;
mod window;

pub use database::{Database, DatabaseConfig};
pub use scope::PgScopeResolver;
pub use window::{PgCollection, PgCollectionStore, SqlParam, SqlQuery, count_sql, window_sql};

use warden_core::models::{AuditLog, Domain, OrganizationRecord, User};
use warden_core::ports::{CollectionStore, Repositories, ScopeResolver};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL stores implementing the `Repositories` trait.
///
/// This provides a single entry point for every collection the API pages
/// through.
pub struct PgRepositories {
    organizations: PgCollectionStore<OrganizationRecord>,
    domains: PgCollectionStore<Domain>,
    users: PgCollectionStore<User>,
    audit_logs: PgCollectionStore<AuditLog>,
    scopes: PgScopeResolver,
}

impl PgRepositories {
    /// Create a new repository aggregate sharing the database pool.
    pub fn new(db: &Database) -> Self {
        Self {
            organizations: PgCollectionStore::new(db),
            domains: PgCollectionStore::new(db),
            users: PgCollectionStore::new(db),
            audit_logs: PgCollectionStore::new(db),
            scopes: PgScopeResolver::new(db),
        }
    }
}

impl Repositories for PgRepositories {
    fn organizations(&self) -> &dyn CollectionStore<OrganizationRecord> {
        &self.organizations
    }

    fn domains(&self) -> &dyn CollectionStore<Domain> {
        &self.domains
    }

    fn users(&self) -> &dyn CollectionStore<User> {
        &self.users
    }

    fn audit_logs(&self) -> &dyn CollectionStore<AuditLog> {
        &self.audit_logs
    }

    fn scopes(&self) -> &dyn ScopeResolver {
        &self.scopes
    }
}
