//! Scope resolver backed by the `users` table.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use warden_core::error::{StorageError, StorageResult};
use warden_core::models::Principal;
use warden_core::ports::{AFFILIATIONS, Scope, ScopeResolver};

use super::database::Database;

/// Grants super admins unrestricted scope; everyone else, including unknown
/// principals, is limited to their affiliations.
pub struct PgScopeResolver {
    pool: PgPool,
}

impl PgScopeResolver {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl ScopeResolver for PgScopeResolver {
    async fn scope_for(&self, principal: &Principal) -> StorageResult<Scope> {
        let super_admin: Option<bool> =
            sqlx::query_scalar("SELECT super_admin FROM users WHERE key = $1")
                .bind(&principal.user_key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorageError::QueryError(e.to_string()))?;

        if super_admin.unwrap_or(false) {
            debug!(principal = %principal.user_key, "Unrestricted scope");
            Ok(Scope::Unrestricted)
        } else {
            Ok(Scope::Affiliated {
                relation: AFFILIATIONS.to_string(),
            })
        }
    }
}
