//! GraphQL schema definition.
//!
//! This module exposes one connection field per dashboard collection. Every
//! field is scoped to the calling principal and localized to the request
//! language.

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, ErrorExtensions, Object, Result, Schema};

use warden_core::error::ConnectionError;
use warden_core::models::{
    AuditLog, AuditLogSortField, Domain, DomainSortField, OrganizationRecord,
    OrganizationSortField, Principal, RequestContext, User, UserSortField,
};
use warden_core::ports::{CollectionFilter, Cursor, FilterCondition, OrderBy, Pagination, Repositories};
use warden_core::services::{ConnectionArgs, ConnectionResolver};

use crate::types::{
    AuditLogConnection, AuditLogFilter, AuditLogOrder, DomainConnection, DomainFilter,
    DomainOrder, OrganizationConnection, OrganizationOrder, UserConnection, UserOrder,
    WardenSchema,
};

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

/// Maximum length for free-text search terms.
const MAX_SEARCH_LENGTH: usize = 128;

/// Maximum number of structured filters per request.
const MAX_FILTERS: usize = 8;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Build the GraphQL schema.
///
/// Includes query depth and complexity limits for DoS protection.
pub fn build_schema<R: Repositories + 'static>(repositories: Arc<R>) -> WardenSchema {
    let repos: Arc<dyn Repositories> = repositories;
    Schema::build(WardenQuery, EmptyMutation, EmptySubscription)
        .data(repos)
        .data(ConnectionResolver::new())
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

// -----------------------------------------------------------------------------
// Query Root
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct WardenQuery;

#[Object]
impl WardenQuery {
    /// Organizations the caller is affiliated with (all of them for super
    /// admins).
    #[allow(clippy::too_many_arguments)]
    async fn find_my_organizations<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        order_by: Option<OrganizationOrder>,
        search: Option<String>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<OrganizationConnection> {
        let caller = Caller::from_context(ctx)?;
        let args: ConnectionArgs<OrganizationRecord> = ConnectionArgs {
            order_by: order_by
                .map(Into::into)
                .unwrap_or(OrderBy::asc(OrganizationSortField::Name)),
            filter: collection_filter(search, Vec::new(), &caller)?,
            pagination: pagination(first, after, last, before),
        };

        let connection = caller
            .resolver
            .resolve_connection(
                caller.repos.scopes(),
                caller.repos.organizations(),
                caller.principal,
                &caller.request,
                args,
            )
            .await
            .map_err(connection_error)?;

        Ok(connection.into())
    }

    /// Domains claimed by organizations the caller is affiliated with.
    #[allow(clippy::too_many_arguments)]
    async fn find_my_domains<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        order_by: Option<DomainOrder>,
        search: Option<String>,
        #[graphql(default)] filters: Vec<DomainFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<DomainConnection> {
        let caller = Caller::from_context(ctx)?;
        let conditions = filters.into_iter().map(FilterCondition::from).collect();
        let args: ConnectionArgs<Domain> = ConnectionArgs {
            order_by: order_by
                .map(Into::into)
                .unwrap_or(OrderBy::asc(DomainSortField::Domain)),
            filter: collection_filter(search, conditions, &caller)?,
            pagination: pagination(first, after, last, before),
        };

        let connection = caller
            .resolver
            .resolve_connection(
                caller.repos.scopes(),
                caller.repos.domains(),
                caller.principal,
                &caller.request,
                args,
            )
            .await
            .map_err(connection_error)?;

        Ok(connection.into())
    }

    /// Users sharing an organization with the caller.
    #[allow(clippy::too_many_arguments)]
    async fn find_my_users<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        order_by: Option<UserOrder>,
        search: Option<String>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<UserConnection> {
        let caller = Caller::from_context(ctx)?;
        let args: ConnectionArgs<User> = ConnectionArgs {
            order_by: order_by
                .map(Into::into)
                .unwrap_or(OrderBy::asc(UserSortField::UserName)),
            filter: collection_filter(search, Vec::new(), &caller)?,
            pagination: pagination(first, after, last, before),
        };

        let connection = caller
            .resolver
            .resolve_connection(
                caller.repos.scopes(),
                caller.repos.users(),
                caller.principal,
                &caller.request,
                args,
            )
            .await
            .map_err(connection_error)?;

        Ok(connection.into())
    }

    /// Audit logs of organizations the caller administers, newest first by
    /// default.
    #[allow(clippy::too_many_arguments)]
    async fn find_audit_logs<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        order_by: Option<AuditLogOrder>,
        search: Option<String>,
        #[graphql(default)] filters: Vec<AuditLogFilter>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
    ) -> Result<AuditLogConnection> {
        let caller = Caller::from_context(ctx)?;
        let conditions = filters.into_iter().map(FilterCondition::from).collect();
        let args: ConnectionArgs<AuditLog> = ConnectionArgs {
            order_by: order_by
                .map(Into::into)
                .unwrap_or(OrderBy::desc(AuditLogSortField::Timestamp)),
            filter: collection_filter(search, conditions, &caller)?,
            pagination: pagination(first, after, last, before),
        };

        let connection = caller
            .resolver
            .resolve_connection(
                caller.repos.scopes(),
                caller.repos.audit_logs(),
                caller.principal,
                &caller.request,
                args,
            )
            .await
            .map_err(connection_error)?;

        Ok(connection.into())
    }
}

// -----------------------------------------------------------------------------
// Helpers & Validation
// -----------------------------------------------------------------------------

/// Request-scoped collaborators shared by every connection field.
struct Caller<'ctx> {
    repos: &'ctx Arc<dyn Repositories>,
    resolver: &'ctx ConnectionResolver,
    principal: &'ctx Principal,
    request: RequestContext,
}

impl<'ctx> Caller<'ctx> {
    fn from_context(ctx: &Context<'ctx>) -> Result<Self> {
        let principal = ctx.data_opt::<Principal>().ok_or_else(|| {
            async_graphql::Error::new("Authentication required")
                .extend_with(|_, e| e.set("code", "UNAUTHENTICATED"))
        })?;

        Ok(Self {
            repos: ctx.data::<Arc<dyn Repositories>>()?,
            resolver: ctx.data::<ConnectionResolver>()?,
            principal,
            request: ctx.data_opt::<RequestContext>().copied().unwrap_or_default(),
        })
    }
}

fn pagination(
    first: Option<i32>,
    after: Option<String>,
    last: Option<i32>,
    before: Option<String>,
) -> Pagination {
    Pagination {
        first,
        after: after.map(Cursor::from),
        last,
        before: before.map(Cursor::from),
    }
}

/// Assemble search and filters, searching in the request language.
fn collection_filter<F>(
    search: Option<String>,
    conditions: Vec<FilterCondition<F>>,
    caller: &Caller<'_>,
) -> Result<CollectionFilter<F>> {
    validate_search(&search)?;
    if conditions.len() > MAX_FILTERS {
        return Err(bad_input(format!(
            "filters too long: maximum {} filters allowed",
            MAX_FILTERS
        )));
    }

    Ok(CollectionFilter {
        search: search.filter(|s| !s.trim().is_empty()),
        conditions,
        language: caller.request.language,
    })
}

/// Validate a search term.
fn validate_search(search: &Option<String>) -> Result<()> {
    if let Some(value) = search
        && value.chars().count() > MAX_SEARCH_LENGTH
    {
        return Err(bad_input(format!(
            "search too long: maximum {} characters allowed",
            MAX_SEARCH_LENGTH
        )));
    }
    Ok(())
}

fn bad_input(message: String) -> async_graphql::Error {
    async_graphql::Error::new(message).extend_with(|_, e| e.set("code", "BAD_USER_INPUT"))
}

/// Map a resolver failure to a GraphQL error.
///
/// Store failures surface as one retryable message; caller mistakes keep
/// their specific description.
fn connection_error(err: ConnectionError) -> async_graphql::Error {
    let code = if err.is_retryable() {
        "UNAVAILABLE"
    } else {
        "BAD_USER_INPUT"
    };
    async_graphql::Error::new(err.public_message()).extend_with(|_, e| {
        e.set("code", code);
        e.set("kind", err.kind());
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_graphql::Request;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    use warden_core::error::{StorageError, StorageResult};
    use warden_core::models::{Language, OrganizationDetails, Record};
    use warden_core::ports::{
        CollectionStore, EligibleSet, PageDirection, Scope, ScopeResolver, WindowQuery,
    };

    /// Store returning its records in insertion order.
    struct VecStore<T> {
        records: Vec<T>,
        fail: bool,
    }

    impl<T> VecStore<T> {
        fn new(records: Vec<T>) -> Self {
            Self {
                records,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl<T: Record> CollectionStore<T> for VecStore<T> {
        async fn eligible_set(&self, _: &Principal, _: &str) -> StorageResult<EligibleSet> {
            Ok(EligibleSet::All)
        }

        async fn fetch_window(
            &self,
            _: &EligibleSet,
            query: &WindowQuery<T>,
        ) -> StorageResult<Vec<T>> {
            if self.fail {
                return Err(StorageError::ConnectionError("pool timed out".into()));
            }
            assert_eq!(query.direction, PageDirection::Forward);
            Ok(self.records.iter().take(query.limit).cloned().collect())
        }

        async fn count(
            &self,
            _: &EligibleSet,
            _: &CollectionFilter<T::FilterField>,
        ) -> StorageResult<u64> {
            Ok(self.records.len() as u64)
        }
    }

    struct Unrestricted;

    #[async_trait]
    impl ScopeResolver for Unrestricted {
        async fn scope_for(&self, _: &Principal) -> StorageResult<Scope> {
            Ok(Scope::Unrestricted)
        }
    }

    struct TestRepositories {
        organizations: VecStore<OrganizationRecord>,
        domains: VecStore<Domain>,
        users: VecStore<User>,
        audit_logs: VecStore<AuditLog>,
    }

    impl Repositories for TestRepositories {
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
            &Unrestricted
        }
    }

    fn org(i: u32) -> OrganizationRecord {
        OrganizationRecord {
            key: format!("org-{i}"),
            slug: format!("org-{i}"),
            en: OrganizationDetails {
                name: format!("Agency {i}"),
                acronym: format!("A{i}"),
                city: "Ottawa".into(),
            },
            fr: OrganizationDetails {
                name: format!("Agence {i}"),
                acronym: format!("AG{i}"),
                city: "Ottawa".into(),
            },
            domain_count: i,
            verified: true,
        }
    }

    fn schema(fail_domains: bool) -> WardenSchema {
        let mut domains = VecStore::new(Vec::new());
        domains.fail = fail_domains;
        build_schema(Arc::new(TestRepositories {
            organizations: VecStore::new((1..=3).map(org).collect()),
            domains,
            users: VecStore::new(Vec::new()),
            audit_logs: VecStore::new(Vec::new()),
        }))
    }

    async fn execute(schema: &WardenSchema, query: &str, principal: Option<&str>) -> Value {
        let mut request =
            Request::new(query).data(RequestContext::new(Language::French));
        if let Some(user) = principal {
            request = request.data(Principal::new(user));
        }
        serde_json::to_value(schema.execute(request).await).unwrap()
    }

    #[tokio::test]
    async fn test_organizations_page_is_localized() {
        let response = execute(
            &schema(false),
            "{ findMyOrganizations(first: 2) { totalCount edges { cursor node { name acronym } } pageInfo { hasNextPage hasPreviousPage endCursor } } }",
            Some("admin"),
        )
        .await;

        let conn = &response["data"]["findMyOrganizations"];
        assert_eq!(conn["totalCount"], 3);
        assert_eq!(conn["edges"][0]["node"], json!({ "name": "Agence 1", "acronym": "AG1" }));
        assert_eq!(conn["pageInfo"]["hasNextPage"], true);
        assert_eq!(conn["pageInfo"]["hasPreviousPage"], false);
        assert_eq!(conn["pageInfo"]["endCursor"], conn["edges"][1]["cursor"]);
    }

    #[tokio::test]
    async fn test_missing_principal_is_rejected() {
        let response = execute(&schema(false), "{ findMyUsers { totalCount } }", None).await;
        assert_eq!(response["errors"][0]["message"], "Authentication required");
        assert_eq!(response["errors"][0]["extensions"]["code"], "UNAUTHENTICATED");
    }

    // Test critique: first + last est une erreur client, jamais réessayée
    #[tokio::test]
    async fn test_first_and_last_is_bad_input() {
        let response = execute(
            &schema(false),
            "{ findMyOrganizations(first: 1, last: 1) { totalCount } }",
            Some("admin"),
        )
        .await;
        assert_eq!(response["errors"][0]["extensions"]["code"], "BAD_USER_INPUT");
        assert_eq!(
            response["errors"][0]["extensions"]["kind"],
            "conflicting_page_bounds"
        );
    }

    #[tokio::test]
    async fn test_store_failure_returns_generic_message() {
        let response = execute(
            &schema(true),
            "{ findMyDomains(filters: [{ filterCategory: HTTPS_STATUS, comparison: NOT_EQUAL, filterValue: PASS }]) { totalCount } }",
            Some("admin"),
        )
        .await;
        assert_eq!(
            response["errors"][0]["message"],
            "Unable to load collection. Please try again."
        );
        assert_eq!(response["errors"][0]["extensions"]["code"], "UNAVAILABLE");
        assert_eq!(response["data"], Value::Null);
    }

    // Tests de validation critiques - protègent contre les requêtes abusives
    #[test]
    fn test_validate_search_boundaries() {
        // Trop long = erreur (DoS prevention)
        assert!(validate_search(&Some("x".repeat(MAX_SEARCH_LENGTH + 1))).is_err());
        assert!(validate_search(&Some("x".repeat(MAX_SEARCH_LENGTH))).is_ok());
        // None = OK (optionnel)
        assert!(validate_search(&None).is_ok());
    }

    #[test]
    fn test_stale_cursor_is_not_retryable_input_error() {
        let err = connection_error(ConnectionError::StaleCursor { argument: "after" });
        assert!(err.message.contains("after"));
    }
}
