use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{ScormError, StoreError, ValueError};
pub use services::scorm_service::{ReductionReport, ScormService};
pub use services::store::{MemoryScormStore, MongoScormStore, ScormStore};
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1/scorm", scorm_routes())
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn scorm_routes() -> Router<Arc<AppState>> {
    // SCOs post from the learner's browser, usually from another origin
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to the LMS origins from config

    Router::new()
        .route("/events", post(handlers::scorm::ingest_events))
        .route(
            "/state",
            get(handlers::scorm::get_activity_state).delete(handlers::scorm::delete_activity_state),
        )
        .layer(cors)
}
