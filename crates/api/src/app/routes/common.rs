use axum::{
    Json,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Response,
};

use crate::app::errors;
use crate::authz::authorize_caller;
use crate::context::CallerContext;

/// Unwrap a JSON body, answering malformed input with a 400 in the API's error shape.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| errors::invalid_request(e.body_text()))
}

pub fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    params
        .map(|Query(q)| q)
        .map_err(|e| errors::invalid_request(e.body_text()))
}

pub fn require(caller: &CallerContext, required: &[&'static str]) -> Result<(), Response> {
    authorize_caller(caller, required).map_err(errors::forbidden)
}
