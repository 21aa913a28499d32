//! SIGET API Gateway
//!
//! The HTTP entry point for the clinical record service.
//! Handles:
//! - Professional authentication (JWT)
//! - Patient, record and session routing
//! - PDF report generation
//! - Observability (logging, request tracing)

mod handlers;
mod reports;

use axum::{
    extract::FromRef,
    routing::{get, post, put},
    Router,
};
use siget_common::{
    auth::JwtManager,
    config::AppConfig,
    db::DbPool,
    errors::AppError,
    pdf::{create_renderer, PdfRenderer},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: JwtManager,
    pub pdf: Arc<dyn PdfRenderer>,
    /// Optional RUT format check, compiled once at startup
    pub rut_pattern: Option<Arc<regex_lite::Regex>>,
}

impl FromRef<AppState> for JwtManager {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration before tracing so the log format is configurable
    let config = AppConfig::load()?;

    init_tracing(&config);

    info!("Starting SIGET API Gateway v{}", siget_common::VERSION);

    let jwt_secret = config
        .auth
        .jwt_secret
        .clone()
        .ok_or_else(|| AppError::Configuration {
            message: "auth.jwt_secret is required".to_string(),
        })?;
    let jwt = JwtManager::new(&jwt_secret, config.auth.jwt_expiration_secs);

    let rut_pattern = match &config.auth.rut_pattern {
        Some(pattern) => Some(Arc::new(regex_lite::Regex::new(pattern).map_err(|e| {
            AppError::Configuration {
                message: format!("Invalid auth.rut_pattern: {}", e),
            }
        })?)),
        None => None,
    };

    let pdf = create_renderer(&config.pdf)?;

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;
    if config.database.run_schema_init {
        db.init_schema().await?;
    }

    let config = Arc::new(config);

    let state = AppState {
        config: config.clone(),
        db,
        jwt,
        pdf,
        rut_pattern,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.observability.log_level)
                }),
        )
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
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

    // API routes
    let api_routes = Router::new()
        // Auth endpoints (no token required)
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        // Professional profile
        .route(
            "/professionals/profile",
            get(handlers::professionals::get_profile).put(handlers::professionals::update_profile),
        )
        // Patient endpoints
        .route(
            "/patients",
            post(handlers::patients::create_patient).get(handlers::patients::list_patients),
        )
        .route(
            "/patients/{id}",
            get(handlers::patients::get_patient)
                .put(handlers::patients::update_patient)
                .delete(handlers::patients::delete_patient),
        )
        .route("/patients/{id}/records", post(handlers::records::add_record))
        // Academic record endpoints
        .route(
            "/records/{id}",
            put(handlers::records::update_record).delete(handlers::records::delete_record),
        )
        .route(
            "/records/{id}/sessions",
            get(handlers::sessions::list_sessions).post(handlers::sessions::create_session),
        )
        .route("/records/{id}/pdf", get(handlers::sessions::record_pdf))
        // Session endpoints
        .route(
            "/sessions/{id}",
            put(handlers::sessions::update_session).delete(handlers::sessions::delete_session),
        )
        .route("/sessions/{id}/pdf", get(handlers::sessions::session_pdf));

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
