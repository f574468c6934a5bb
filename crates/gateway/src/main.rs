//! QuickOnboard API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Authentication and workspace authorization
//! - Rate limiting
//! - Request routing to the ingestion and chat pipelines
//! - Observability (logging, metrics)

mod handlers;
mod middleware;
mod state;

#[cfg(test)]
mod tests;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use quickonboard_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{schema::create_schema, DbPool},
    metrics::{register_metrics, upstream_histograms, LATENCY_BUCKETS, UPSTREAM_BUCKETS},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimit};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Configuration comes first so logging can follow it
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    let config = Arc::new(config);

    init_tracing(&config.observability);

    info!("Starting QuickOnboard API Gateway v{}", quickonboard_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        prometheus_builder(config.observability.metrics_port)?.install()?;
        info!(port = config.observability.metrics_port, "Metrics exporter listening");
    }
    register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        create_schema(db.write()).await?;
        info!("Database schema ready");
    }

    // Create app state
    let state = AppState::from_config(config.clone(), db)?;

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Exporter with request buckets by default and wider buckets for model calls
fn prometheus_builder(port: u16) -> anyhow::Result<PrometheusBuilder> {
    let mut builder = PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets(LATENCY_BUCKETS)?;
    for name in upstream_histograms() {
        builder = builder.set_buckets_for_metric(Matcher::Full(name), UPSTREAM_BUCKETS)?;
    }
    Ok(builder)
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = if config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Health endpoints (no auth, not rate limited)
    let health_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready));

    let mut api_routes = Router::new()
        // Profile
        .route(
            "/me",
            get(handlers::profile::get_profile).patch(handlers::profile::update_profile),
        )
        // Workspaces
        .route(
            "/workspaces",
            get(handlers::workspaces::list_workspaces).post(handlers::workspaces::create_workspace),
        )
        .route(
            "/workspaces/{workspace_id}",
            get(handlers::workspaces::get_workspace)
                .put(handlers::workspaces::update_workspace)
                .delete(handlers::workspaces::delete_workspace),
        )
        .route("/workspaces/{workspace_id}/welcome", get(handlers::chat::welcome))
        .route("/workspaces/{workspace_id}/chat", post(handlers::chat::chat))
        .route(
            "/workspaces/{workspace_id}/stats/queries",
            get(handlers::stats::query_stats),
        )
        // Documents
        .route(
            "/workspaces/{workspace_id}/documents",
            get(handlers::documents::list_documents).post(handlers::documents::upload_document),
        )
        .route(
            "/workspaces/{workspace_id}/documents/status",
            get(handlers::documents::document_status),
        )
        .route(
            "/workspaces/{workspace_id}/documents/reprocess",
            post(handlers::documents::reprocess_all),
        )
        .route(
            "/workspaces/{workspace_id}/documents/{document_id}",
            delete(handlers::documents::delete_document),
        )
        .route(
            "/workspaces/{workspace_id}/documents/{document_id}/process",
            post(handlers::documents::process_document),
        )
        .route(
            "/workspaces/{workspace_id}/documents/{document_id}/reprocess",
            post(handlers::documents::reprocess_document),
        )
        // Invitations
        .route(
            "/workspaces/{workspace_id}/invites",
            get(handlers::invites::list_invites).post(handlers::invites::create_invite),
        )
        .route("/invites/{token}", get(handlers::invites::get_invite))
        .route("/invites/{token}/accept", post(handlers::invites::accept_invite))
        // Team
        .route(
            "/workspaces/{workspace_id}/members",
            get(handlers::members::list_members),
        )
        .route(
            "/workspaces/{workspace_id}/members/{member_id}",
            put(handlers::members::update_member_role).delete(handlers::members::remove_member),
        )
        // Notifications
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications)
                .post(handlers::notifications::create_notification),
        )
        .route(
            "/notifications/read-all",
            put(handlers::notifications::mark_all_read),
        )
        .route(
            "/notifications/{notification_id}/read",
            put(handlers::notifications::mark_read),
        );

    if config.rate_limit.enabled {
        let rate_limit = RateLimit::new(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        api_routes = api_routes.layer(from_fn_with_state(rate_limit, rate_limit_middleware));
    }

    // Compose the app
    Router::new()
        .nest("/v1", health_routes.merge(api_routes))
        .layer(from_fn(middleware::metrics::track_metrics))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
