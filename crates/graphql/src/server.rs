//! GraphQL HTTP server.

use std::future::Future;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, header::ACCEPT_LANGUAGE},
    response::{Html, IntoResponse},
    routing::get,
};
use tracing::{debug, info};

use warden_core::models::{Language, Principal, RequestContext};

use crate::types::WardenSchema;

/// Header carrying the authenticated user key, set by the upstream gateway.
pub const PRINCIPAL_HEADER: &str = "x-principal";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_playground: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            enable_playground: true,
        }
    }
}

/// Build the HTTP router serving `schema`.
pub fn router(schema: WardenSchema, config: &ServerConfig) -> Router {
    let mut app = Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .route("/health", get(health_check))
        .with_state(schema);

    if config.enable_playground {
        app = app.route("/", get(graphql_playground));
    }

    app
}

/// Start the GraphQL server with graceful shutdown support.
pub async fn serve_with_shutdown<F>(
    schema: WardenSchema,
    config: ServerConfig,
    shutdown_signal: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(schema, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("⚡ GraphQL server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

/// GraphQL query handler.
///
/// Attaches the caller's principal (when present) and language to the
/// request data.
async fn graphql_handler(
    State(schema): State<WardenSchema>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let request_context = request_context(&headers);
    let mut request = req.into_inner().data(request_context);

    match principal(&headers) {
        Some(principal) => {
            debug!(principal = %principal.user_key, language = request_context.language.code(), "GraphQL request");
            request = request.data(principal);
        }
        None => debug!("Anonymous GraphQL request"),
    }

    schema.execute(request).await.into()
}

fn principal(headers: &HeaderMap) -> Option<Principal> {
    headers
        .get(PRINCIPAL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(Principal::new)
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    let language = headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(Language::from_accept_language)
        .unwrap_or_default();
    RequestContext::new(language)
}

/// GraphQL Playground UI.
async fn graphql_playground() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
