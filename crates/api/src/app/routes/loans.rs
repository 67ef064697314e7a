use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use shelfkeeper_auth::Permission;
use shelfkeeper_infra::LoanActor;
use shelfkeeper_infra::store::Pagination;
use shelfkeeper_lending::LoanRequest;

use crate::app::routes::common::{json_body, query_params, require};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(my_holdings).post(submit))
        .route("/history", get(my_history))
}

/// Self-service borrow or return; the acting user is the caller.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<dto::LoanRequestBody>, JsonRejection>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::LOANS_SELF])?;
    let body = json_body(payload)?;
    let request = LoanRequest::parse(&body.action, &body.books).map_err(errors::lending_error_to_response)?;

    let actor = LoanActor::SelfService(caller.username().clone());
    services
        .loans
        .execute(&actor, &request)
        .await
        .map_err(errors::loan_error_to_response)?;

    Ok(StatusCode::OK.into_response())
}

pub async fn my_holdings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Response, Response> {
    let holdings = services
        .loans
        .holdings(caller.username())
        .await
        .map_err(errors::loan_error_to_response)?;

    Ok(Json(dto::HoldingsResponse::new(caller.username().as_str(), &holdings)).into_response())
}

pub async fn my_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    params: Result<Query<dto::HistoryQuery>, QueryRejection>,
) -> Result<Response, Response> {
    let q = query_params(params)?;
    let page = services
        .loans
        .history(caller.username(), Pagination::new(q.limit, q.offset))
        .await
        .map_err(errors::loan_error_to_response)?;

    Ok(Json(dto::HistoryResponse {
        count: page.count,
        records: page.items,
    })
    .into_response())
}
