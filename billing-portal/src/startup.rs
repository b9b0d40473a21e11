//! Application startup and lifecycle management.

use crate::config::PortalConfig;
use crate::handlers::{
    adjustment::post_bill_adjustment,
    health::{health_check, metrics_handler, readiness_check},
    pages::{bill_adjustment_page, bill_payment_page, bill_retrieval_page, index},
    payment::post_bill_payment,
    retrieval::post_bill_retrieval,
};
use crate::services::{init_metrics, Database};
use axum::{
    http::{HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: PortalConfig,
    pub db: Arc<Database>,
}

/// Build the HTTP router with all routes and layers.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let cors = cors_layer(&state.config.cors.allowed_origins);

    Router::new()
        .route("/", get(index))
        .route("/bill-payment", get(bill_payment_page).post(post_bill_payment))
        .route(
            "/bill-retrieval",
            get(bill_retrieval_page).post(post_bill_retrieval),
        )
        .route("/bill-adjustments", get(bill_adjustment_page))
        .route("/bill-adjustment", post(post_bill_adjustment))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// An empty list allows any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = if allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: PortalConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
            Duration::from_secs(config.database.acquire_timeout_secs),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        let state = AppState {
            config: config.clone(),
            db: Arc::new(db),
        };

        let address = config.common.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, addr = %address, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Billing portal listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(
            service = "billing-portal",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
