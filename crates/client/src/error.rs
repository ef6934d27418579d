//! Error types for the collection client.

use std::sync::Arc;

use thiserror::Error;

/// Failure fetching one page from the API.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network/request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    HttpError(String),

    #[error("GraphQL errors: {0}")]
    GraphQLErrors(String),

    #[error("No connection found at `{0}` in the response data")]
    MissingRelayRoot(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a collection controller operation.
#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    /// `next()` was called while a fetch for more records was outstanding.
    #[error("A request for more records is already in progress")]
    FetchInProgress,

    /// A response arrived for variables that have since been replaced.
    #[error("Response discarded: collection variables changed while it was in flight")]
    StaleGeneration,

    /// The page fetch failed; the cache is unchanged and the call may be retried.
    #[error("Unable to load collection: {0}")]
    Fetch(Arc<ClientError>),
}

impl From<ClientError> for ControllerError {
    fn from(err: ClientError) -> Self {
        Self::Fetch(Arc::new(err))
    }
}
