//! KCA Staff Portal API Gateway
//!
//! The main entry point for all portal API requests.
//! Handles:
//! - Authentication of staff sessions
//! - Rate limiting of the chat assistant
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;
mod state;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use kca_portal_common::{
    config::{AppConfig, ObservabilityConfig},
    metrics::{self, COMPLETION_BUCKETS, LATENCY_BUCKETS, METRICS_PREFIX},
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::middleware::{metrics::track_metrics, rate_limit::rate_limit_middleware};
pub use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting KCA portal gateway v{}",
        kca_portal_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        init_metrics(config.observability.metrics_port)?;
        metrics::register_metrics();
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create app state
    let state = AppState::build(config).await.map_err(|e| {
        error!(error = %e, "Failed to initialize application state");
        e
    })?;

    // Build the router
    let app = create_router(state);

    // Start the server
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logging {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn init_metrics(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
            LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_chat_completion_duration_seconds", METRICS_PREFIX)),
            COMPLETION_BUCKETS,
        )?
        .install()?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Chat is the only route that reaches a paid upstream
    let mut chat_routes = Router::new().route("/chat", post(handlers::chat::chat));
    if state.rate_limit.is_some() {
        chat_routes =
            chat_routes.route_layer(from_fn_with_state(state.clone(), rate_limit_middleware));
    }

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Login (no auth)
        .route("/auth/login", post(handlers::auth::login))

        // Chat assistant
        .merge(chat_routes)
        .route("/chat/sessions", post(handlers::chat::create_session))
        .route(
            "/chat/sessions/{id}",
            get(handlers::chat::get_session).delete(handlers::chat::delete_session),
        )

        // Reference sources
        .route("/sources", get(handlers::sources::list_sources))
        .route("/sources/search", get(handlers::sources::search_sources))

        // Contact directory
        .route(
            "/contacts",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route("/contacts/departments", get(handlers::contacts::list_departments))
        .route(
            "/contacts/{id}",
            get(handlers::contacts::get_contact)
                .put(handlers::contacts::update_contact)
                .delete(handlers::contacts::delete_contact),
        )

        // Notice board
        .route(
            "/notices",
            get(handlers::notices::list_notices).post(handlers::notices::create_notice),
        )
        .route("/notices/recent", get(handlers::notices::recent_notices))
        .route("/notices/ticker", get(handlers::notices::ticker))
        .route(
            "/notices/{id}",
            get(handlers::notices::get_notice)
                .put(handlers::notices::update_notice)
                .delete(handlers::notices::delete_notice),
        )
        .route("/notices/{id}/publish", post(handlers::notices::toggle_publish))

        // Eligibility
        .route("/eligibility/questions", get(handlers::eligibility::questions))
        .route("/eligibility/assess", post(handlers::eligibility::assess_answers))
        .route("/eligibility/diagnose", post(handlers::eligibility::diagnose_history))
        .route_layer(from_fn(track_metrics));

    let timeout = state.config.request_timeout();

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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
