use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use shelfkeeper_auth::permissions::permissions_for;

use crate::context::CallerContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(caller): Extension<CallerContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "username": caller.username().as_str(),
        "role": caller.role().as_str(),
        "session": caller.session().to_string(),
        "permissions": permissions_for(caller.role())
            .iter()
            .map(|p| p.as_str().to_string())
            .collect::<Vec<_>>(),
    }))
}
