//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend selection and service construction
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use shelfkeeper_infra::AppConfig;
use shelfkeeper_infra::store::StoreError;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration (entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, StoreError> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(services))
}

/// Router over already constructed services.
pub fn router(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        resolver: Arc::new(services.sessions.resolver()),
    };

    // Protected routes: require a live session.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth", post(routes::auth::sign_in))
        .layer(Extension(services))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::request_log)))
}
