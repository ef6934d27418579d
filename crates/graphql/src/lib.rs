//! GraphQL API for the Warden dashboard.
//!
//! Exposes one Relay connection per collection (`findMyOrganizations`,
//! `findMyDomains`, `findMyUsers`, `findAuditLogs`), each scoped to the
//! principal named by the `x-principal` header and localized through
//! `Accept-Language`.
//!
//! ```ignore
//! use warden_graphql::{build_schema, serve_with_shutdown, ServerConfig};
//!
//! let schema = build_schema(repositories);
//! serve_with_shutdown(schema, ServerConfig::default(), shutdown_signal()).await?;
//! ```

mod schema;
mod server;
mod types;

pub use schema::{MAX_QUERY_COMPLEXITY, MAX_QUERY_DEPTH, WardenQuery, build_schema};
pub use server::{PRINCIPAL_HEADER, ServerConfig, router, serve_with_shutdown};
pub use types::WardenSchema;
