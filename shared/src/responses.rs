use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

use crate::error::{ErrorResponse, ServiceError};

pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

/// Render a service error. Internal failures are logged here with their detail
/// and reach the client only as a generic message.
pub fn error_response(err: &ServiceError) -> Result<Response<Body>, Error> {
    match err {
        ServiceError::Internal(detail) => tracing::error!("Internal error: {}", detail),
        other => tracing::info!("Request rejected ({}): {}", other.kind(), other),
    }
    json_response(err.status(), &err.to_response())
}

/// Turn a service outcome into a response, using `status` on success.
pub fn respond<T: Serialize>(
    status: StatusCode,
    result: Result<T, ServiceError>,
) -> Result<Response<Body>, Error> {
    match result {
        Ok(value) => json_response(status, &value),
        Err(err) => error_response(&err),
    }
}

pub fn preflight() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET,POST,PUT,DELETE,OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

pub fn not_found() -> Result<Response<Body>, Error> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: "NotFound".to_string(),
            message: "Not found".to_string(),
        },
    )
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "MethodNotAllowed".to_string(),
            message: "Method not allowed".to_string(),
        },
    )
}
