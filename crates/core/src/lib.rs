//! Core domain layer for the Warden dashboard API.
//!
//! This crate contains the collection models, port traits (interfaces), and
//! the connection resolver that turns a permission-scoped collection into
//! Relay-style pages. It follows hexagonal architecture principles - this is
//! the innermost layer with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      warden (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │      warden-graphql          │        warden-client         │
//! │          (API)               │   (paginated collections)    │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                     warden-storage                          │
//! │                      (PostgreSQL)                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      warden-core  ← YOU ARE HERE            │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Collection records (Organization, Domain, User, AuditLog)
//! - [`ports`] - Pagination contract, cursor codec and store traits
//! - [`services`] - Connection resolver
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! - [`ports::CollectionStore`] - Eligible set, windowed fetch and count for one collection
//! - [`ports::ScopeResolver`] - Decides whether a principal sees everything or only affiliations
//! - [`ports::CursorCodec`] - Opaque, collection-scoped cursors
//!
//! ## Resolving a page
//!
//! 1. Validate `first`/`last` and decode cursors
//! 2. Compute the eligible set for the principal
//! 3. Fetch one record more than requested to learn whether more exist
//! 4. Build edges, page info and the total count

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;
