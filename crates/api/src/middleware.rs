use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{debug, info};

use shelfkeeper_auth::IdentityResolver;

use crate::app::errors::json_error;
use crate::context::CallerContext;

#[derive(Clone)]
pub struct AuthState {
    pub resolver: Arc<dyn IdentityResolver>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing bearer token"))?;

    let caller = state.resolver.resolve(token, Utc::now()).map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or expired session")
    })?;

    req.extensions_mut().insert(CallerContext::new(caller));

    Ok(next.run(req).await)
}

/// One `info` line per request with method, path, status and latency.
pub async fn request_log(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let res = next.run(req).await;

    info!(
        %method,
        %path,
        status = res.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    res
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
