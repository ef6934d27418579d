//! Storage layer for the Warden dashboard API.
//!
//! This crate provides PostgreSQL implementations of the store traits
//! defined in `warden-core`. It handles connection pooling, migrations and
//! the keyset-paginated reads behind every connection.
//!
//! # Architecture
//!
//! - [`postgres::Database`] - Connection pool management
//! - [`postgres::PgRepositories`] - Composite repository for all collections
//! - [`postgres::PgCollectionStore`] - One generic store per collection
//!
//! # Usage
//!
//! ```ignore
//! use warden_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_graphql(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Create repositories
//! let repositories = Arc::new(PgRepositories::new(&db));
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, PgRepositories};
