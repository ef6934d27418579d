//! Client-side paginated collections over Warden connections.
//!
//! A [`PaginatedCollection`] shows a connection one fixed-size page at a
//! time. Pages already fetched are served from an append-only cache; going
//! past the cache fetches the next records after the last cursor. Changing
//! the query variables discards the cache and restarts at page 1.
//!
//! ```ignore
//! use warden_client::{ControllerConfig, GraphqlPageFetcher, PaginatedCollection, Variables};
//!
//! let fetcher = GraphqlPageFetcher::<DomainNode>::new(url, DOMAINS_QUERY, "findMyDomains")
//!     .with_principal("user-1");
//! let domains = PaginatedCollection::new(fetcher, Variables::new(), ControllerConfig::default());
//!
//! domains.load().await?;
//! domains.next().await?;
//! let page = domains.snapshot().await;
//! ```
//!
//! The paging logic lives in the sans-IO [`CollectionController`], which can
//! be driven by any transport.

mod collection;
mod controller;
mod error;
mod fetcher;

pub use collection::{PageSnapshot, PaginatedCollection};
pub use controller::{CollectionController, ControllerConfig, FetchKind, FetchTicket, NextStep};
pub use error::{ClientError, ControllerError};
pub use fetcher::{GraphqlPageFetcher, PageArgs, PageFetcher, Variables, extract_connection};
