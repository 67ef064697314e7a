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

use shelfkeeper_auth::Permission;
use shelfkeeper_infra::store::PageRequest;
use shelfkeeper_lending::{BookCode, NewBook};

use crate::app::routes::common::{json_body, query_params, require};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(search_books).post(add_book))
        .route("/:code", put(change_book))
}

pub async fn add_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::CATALOG_WRITE])?;
    let book = json_body(payload)?
        .validate()
        .map_err(errors::domain_error_to_response)?;

    services
        .catalog
        .add_book(&book)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(code = %book.code, operator = %caller.username(), "book added");
    Ok((StatusCode::CREATED, Json(dto::BookResponse::from(book))).into_response())
}

pub async fn change_book(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    Path(code): Path<String>,
    payload: Result<Json<dto::ChangeBookRequest>, JsonRejection>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::CATALOG_WRITE])?;
    let code = BookCode::parse(&code).map_err(errors::domain_error_to_response)?;
    let change = json_body(payload)?
        .into_change()
        .map_err(errors::domain_error_to_response)?;

    let book = services
        .catalog
        .change_book(&code, &change)
        .await
        .map_err(errors::store_error_to_response)?;

    tracing::info!(code = %book.code, operator = %caller.username(), "book changed");
    Ok(Json(dto::BookResponse::from(book)).into_response())
}

pub async fn search_books(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<CallerContext>,
    params: Result<Query<dto::SearchQuery>, QueryRejection>,
) -> Result<Response, Response> {
    require(&caller, &[Permission::CATALOG_READ])?;
    let q = query_params(params)?;
    let page = PageRequest::new(q.page_start(), q.page_count()).map_err(errors::paging_error_to_response)?;

    let found = services
        .catalog
        .search_books(&q.keyword, page)
        .await
        .map_err(errors::store_error_to_response)?;

    Ok(Json(dto::BookSearchResponse {
        count: found.count,
        books: found.items.into_iter().map(dto::BookResponse::from).collect(),
    })
    .into_response())
}
