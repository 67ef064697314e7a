//! Staff-initiated check-out/check-in and ledger lookups for other accounts.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use shelfkeeper_auth::Permission;
use shelfkeeper_core::Username;
use shelfkeeper_infra::LoanActor;
use shelfkeeper_lending::{LendingError, LoanRequest};

use crate::app::routes::common::{json_body, require};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/loans", post(submit_for_user))
        .route("/loans/:username", get(user_holdings))
}

pub async fn submit_for_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<dto::StaffLoanRequestBody>, JsonRejection>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::LOANS_MANAGE])?;
    let body = json_body(payload)?;
    let target = Username::parse(&body.username)
        .map_err(|_| errors::lending_error_to_response(LendingError::MissingUsername))?;
    let request = LoanRequest::parse(&body.action, &body.books).map_err(errors::lending_error_to_response)?;

    let actor = LoanActor::Staff {
        operator: caller.username().clone(),
        target,
    };
    services
        .loans
        .execute(&actor, &request)
        .await
        .map_err(errors::loan_error_to_response)?;

    Ok(StatusCode::OK.into_response())
}

pub async fn user_holdings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(username): Path<String>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::LOANS_MANAGE])?;
    let username = Username::parse(&username).map_err(errors::domain_error_to_response)?;

    let holdings = services
        .loans
        .holdings(&username)
        .await
        .map_err(errors::loan_error_to_response)?;

    Ok(Json(dto::HoldingsResponse::new(username.as_str(), &holdings)).into_response())
}
