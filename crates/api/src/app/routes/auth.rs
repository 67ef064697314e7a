use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app::routes::common::json_body;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub async fn sign_in(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::AuthRequest>, JsonRejection>,
) -> Result<Response, Response> {
    let body = json_body(payload)?;

    let issued = services
        .sessions
        .auth(&body.username)
        .await
        .map_err(errors::session_error_to_response)?;

    Ok(Json(dto::AuthResponse {
        token: issued.token,
        username: issued.claims.sub.to_string(),
        role: issued.claims.role.to_string(),
        expires_at: issued.claims.expires_at,
    })
    .into_response())
}

pub async fn sign_out(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> StatusCode {
    services.sessions.exit(caller.identity());
    StatusCode::NO_CONTENT
}
