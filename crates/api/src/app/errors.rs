use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use shelfkeeper_auth::AuthzError;
use shelfkeeper_core::DomainError;
use shelfkeeper_infra::store::{PagingError, StoreError};
use shelfkeeper_infra::{LoanError, SessionError};
use shelfkeeper_lending::{ErrorKind, LendingError};

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_request(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", message)
}

/// Log the detail, answer with an opaque 500.
fn internal(err: &dyn std::error::Error) -> Response {
    error!(error = %err, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal server error")
}

pub fn lending_error_to_response(err: LendingError) -> Response {
    match err.kind() {
        ErrorKind::Input => invalid_request(err.to_string()),
        ErrorKind::BusinessRule => json_error(StatusCode::UNPROCESSABLE_ENTITY, "rejected", err.to_string()),
        ErrorKind::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => invalid_request(msg),
        DomainError::InvariantViolation(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "rejected", msg),
        DomainError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Domain(e) => domain_error_to_response(e),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        other => internal(&other),
    }
}

pub fn loan_error_to_response(err: LoanError) -> Response {
    match err {
        LoanError::Rejected(e) => lending_error_to_response(e),
        LoanError::Store(e) => store_error_to_response(e),
    }
}

pub fn session_error_to_response(err: SessionError) -> Response {
    match err {
        SessionError::InvalidUsername => invalid_request("invalid username"),
        SessionError::Store(e) => store_error_to_response(e),
        other @ SessionError::Token(_) => internal(&other),
    }
}

pub fn paging_error_to_response(err: PagingError) -> Response {
    invalid_request(err.to_string())
}

pub fn forbidden(err: AuthzError) -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

#[cfg(test)]
mod tests {
    use shelfkeeper_core::Username;
    use shelfkeeper_lending::BookCode;

    use super::*;

    #[test]
    fn lending_errors_map_by_kind() {
        let code = BookCode::parse("B1").unwrap();
        assert_eq!(
            lending_error_to_response(LendingError::EmptyBookList).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            lending_error_to_response(LendingError::StockUnavailable { code }).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            lending_error_to_response(LendingError::NoHoldings {
                username: Username::parse("a").unwrap()
            })
            .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn infrastructure_errors_are_opaque_500s() {
        let res = store_error_to_response(StoreError::Database("relation missing".to_string()));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = store_error_to_response(StoreError::Conflict("duplicate".to_string()));
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
