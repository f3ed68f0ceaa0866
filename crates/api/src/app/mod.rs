//! HTTP API application wiring (Axum router + service wiring).
//!
//! Folder layout:
//! - `services.rs`: infrastructure wiring (event store/bus, dispatcher, directory, tokens)
//! - `routes/`: HTTP routes + handlers (one file per surface area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Process configuration, read from the environment by `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password: String,
    /// Public base URL used when rendering password-reset links.
    pub base_url: String,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> Router {
    let services = Arc::new(services::build_services(config));
    let auth_state = middleware::AuthState {
        jwt: services.jwt_validator(),
    };

    // Protected routes: require a valid bearer token.
    let protected = Router::new()
        .nest("/account", routes::account::router())
        .nest("/admin", routes::admin::router())
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/authenticate", routes::authentication::router())
        .merge(protected)
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
