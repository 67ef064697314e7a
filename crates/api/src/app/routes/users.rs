use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{
        Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
};

use shelfkeeper_auth::{AccountChange, AccountState, NewAccount, Permission};
use shelfkeeper_core::Username;
use shelfkeeper_infra::store::PageRequest;

use crate::app::routes::common::{json_body, query_params, require};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(search_users).post(add_user))
        .route("/:username", put(change_user))
}

pub async fn add_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<NewAccount>, JsonRejection>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::ACCOUNTS_WRITE])?;
    let account = json_body(payload)?
        .validate()
        .map_err(errors::domain_error_to_response)?;

    services
        .accounts
        .add_account(&account)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(username = %account.username, operator = %caller.username(), "account added");
    Ok((StatusCode::CREATED, Json(account)).into_response())
}

pub async fn change_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(username): Path<String>,
    payload: Result<Json<AccountChange>, JsonRejection>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::ACCOUNTS_WRITE])?;
    let username = Username::parse(&username).map_err(errors::domain_error_to_response)?;
    let change = json_body(payload)?;

    let account = services
        .accounts
        .change_account(&username, &change)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(username = %account.username, operator = %caller.username(), "account changed");
    Ok(Json(account).into_response())
}

pub async fn search_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    params: Result<Query<dto::SearchQuery>, QueryRejection>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::ACCOUNTS_READ])?;
    let q = query_params(params)?;
    let page = PageRequest::new(q.page_start(), q.page_count()).map_err(errors::paging_error_to_response)?;
    let state = q
        .state
        .as_deref()
        .map(str::parse::<AccountState>)
        .transpose()
        .map_err(errors::domain_error_to_response)?;

    let found = services
        .accounts
        .search_accounts(&q.keyword, state, page)
        .await
        .map_err(errors::store_error_to_response)?;

    Ok(Json(dto::AccountSearchResponse {
        count: found.count,
        users: found.items,
    })
    .into_response())
}
