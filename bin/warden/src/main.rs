//! Warden - dashboard query server.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config
//! warden
//!
//! # Start with environment overrides
//! DATABASE_URL=postgres://localhost/warden GRAPHQL_PORT=4000 warden
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use warden_core::metrics::init_metrics;
use warden_graphql::{ServerConfig, build_schema, serve_with_shutdown};
use warden_storage::{Database, DatabaseConfig, PgRepositories};

/// Warden CLI - paginated dashboard collections over GraphQL.
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Warden - dashboard query server")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/warden"
    )]
    database_url: String,

    /// GraphQL server bind address.
    #[arg(long, env = "GRAPHQL_HOST", default_value = "0.0.0.0")]
    graphql_host: String,

    /// GraphQL server port.
    #[arg(long, env = "GRAPHQL_PORT", default_value = "4000")]
    graphql_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Disable the GraphiQL playground on `/`.
    #[arg(long, env = "DISABLE_PLAYGROUND")]
    disable_playground: bool,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled =
        match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
            Ok(metrics_addr) => {
                match PrometheusBuilder::new()
                    .with_http_listener(metrics_addr)
                    .install()
                {
                    Ok(()) => {
                        init_metrics();
                        true
                    }
                    Err(e) => {
                        warn!(
                            "⚠️  Failed to start metrics exporter: {}. Continuing without metrics.",
                            e
                        );
                        false
                    }
                }
            }
            Err(e) => {
                warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
                false
            }
        };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Warden");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    info!("🗄️  Running migrations...");
    let migration_db = Database::connect(&DatabaseConfig::for_migrations(&cli.database_url))
        .await
        .context("Failed to connect to database")?;
    migration_db
        .migrate()
        .await
        .context("Failed to run migrations")?;
    migration_db.close().await;
    info!("🗄️  Database ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    let db = Database::connect(&DatabaseConfig::for_graphql(&cli.database_url))
        .await
        .context("Failed to create GraphQL database pool")?;

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVER
    // ─────────────────────────────────────────────────────────────────────────
    let repositories = Arc::new(PgRepositories::new(&db));
    let schema = build_schema(repositories);

    let graphql_config = ServerConfig {
        host: cli.graphql_host.clone(),
        port: cli.graphql_port,
        enable_playground: !cli.disable_playground,
    };

    info!("✅ Warden ready");
    info!(
        "   ⚡ GraphQL:  http://localhost:{}/graphql",
        cli.graphql_port
    );
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    serve_with_shutdown(schema, graphql_config, shutdown_signal())
        .await
        .context("GraphQL server error")?;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    db.close().await;

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "⚠️  Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "⚠️  Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://warden:secret@db:5432/warden"),
            "postgres://warden:****@db:5432/warden"
        );
        assert_eq!(
            mask_password("postgres://localhost/warden"),
            "postgres://localhost/warden"
        );
        assert_eq!(mask_password("not a url"), "not a url");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["warden"]);
        assert_eq!(cli.graphql_port, 4000);
        assert!(!cli.migrate_only);
        assert!(!cli.disable_playground);
    }
}
