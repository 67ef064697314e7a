use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod auth;
pub mod books;
pub mod common;
pub mod loans;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/auth/exit", post(auth::sign_out))
        .nest("/books", books::router())
        .nest("/users", users::router())
        .nest("/loans", loans::router())
        .nest("/admin", admin::router())
}
