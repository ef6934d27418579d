//! Page fetching port and its GraphQL-over-HTTP implementation.

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue, json};
use tracing::debug;

use warden_core::ports::Connection;

use crate::error::ClientError;

/// GraphQL variables of a collection query (search, filters, ordering...).
pub type Variables = Map<String, JsonValue>;

/// Paging arguments of one request, merged into the query variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

impl PageArgs {
    pub fn forward(first: i32, after: Option<String>) -> Self {
        Self {
            first: Some(first),
            after,
            ..Default::default()
        }
    }

    /// `variables` with the paging arguments added, replacing any stale ones.
    pub fn merge_into(&self, variables: &Variables) -> Variables {
        let mut merged = variables.clone();
        for key in ["first", "after", "last", "before"] {
            merged.remove(key);
        }
        if let Ok(JsonValue::Object(page)) = serde_json::to_value(self) {
            merged.extend(page);
        }
        merged
    }
}

/// Fetches one connection page for a collection.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Node: Clone + Send + Sync + 'static;

    async fn fetch(
        &self,
        variables: &Variables,
        page: &PageArgs,
    ) -> Result<Connection<Self::Node>, ClientError>;
}

/// [`PageFetcher`] posting a GraphQL query over HTTP.
///
/// `relay_root` is the dotted path of the connection under `data`, e.g.
/// `findMyDomains` or `findOrganizationBySlug.affiliations`.
pub struct GraphqlPageFetcher<N> {
    client: Client,
    url: String,
    query: String,
    relay_root: String,
    principal: Option<String>,
    language: Option<String>,
    _node: PhantomData<fn() -> N>,
}

impl<N> GraphqlPageFetcher<N> {
    pub fn new(
        url: impl Into<String>,
        query: impl Into<String>,
        relay_root: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            query: query.into(),
            relay_root: relay_root.into(),
            principal: None,
            language: None,
            _node: PhantomData,
        }
    }

    /// Send requests on behalf of `user_key` (`x-principal` header).
    pub fn with_principal(mut self, user_key: impl Into<String>) -> Self {
        self.principal = Some(user_key.into());
        self
    }

    /// Request localized nodes (`Accept-Language` header).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

#[async_trait]
impl<N> PageFetcher for GraphqlPageFetcher<N>
where
    N: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Node = N;

    async fn fetch(
        &self,
        variables: &Variables,
        page: &PageArgs,
    ) -> Result<Connection<N>, ClientError> {
        let request_body = json!({
            "query": self.query,
            "variables": page.merge_into(variables),
        });

        let mut request = self.client.post(&self.url).json(&request_body);
        if let Some(principal) = &self.principal {
            request = request.header("x-principal", principal);
        }
        if let Some(language) = &self.language {
            request = request.header(reqwest::header::ACCEPT_LANGUAGE, language);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::HttpError(format!(
                "HTTP error: status {status}, body: {text}"
            )));
        }

        let body: JsonValue = response.json().await?;
        let connection = extract_connection(body, &self.relay_root)?;

        debug!(
            relay_root = %self.relay_root,
            edges = connection.edges.len(),
            has_next = connection.page_info.has_next_page,
            "Page fetched"
        );

        Ok(connection)
    }
}

/// Pull the connection at `relay_root` out of a GraphQL response body.
pub fn extract_connection<N: DeserializeOwned>(
    mut body: JsonValue,
    relay_root: &str,
) -> Result<Connection<N>, ClientError> {
    if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
        let message = match errors {
            JsonValue::Array(errors) => errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(JsonValue::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        };
        return Err(ClientError::GraphQLErrors(message));
    }

    let mut node = body
        .get_mut("data")
        .map(JsonValue::take)
        .ok_or_else(|| ClientError::MissingRelayRoot(relay_root.to_string()))?;
    for segment in relay_root.split('.') {
        node = match node {
            JsonValue::Object(mut fields) => fields
                .remove(segment)
                .ok_or_else(|| ClientError::MissingRelayRoot(relay_root.to_string()))?,
            _ => return Err(ClientError::MissingRelayRoot(relay_root.to_string())),
        };
    }

    if node.is_null() {
        return Err(ClientError::MissingRelayRoot(relay_root.to_string()));
    }

    Ok(serde_json::from_value(node)?)
}
