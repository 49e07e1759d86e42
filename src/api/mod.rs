//! Local REST API.
//!
//! The UI reaches holdings, the cached catalog, sync and backup only through these handlers.

mod backup;
mod catalog;
mod catalog_edit;
mod holdings;
mod sync;

pub use backup::*;
pub use catalog::*;
pub use catalog_edit::*;
pub use holdings::*;
pub use sync::*;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{AppError, FieldError};

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Unwrap a JSON body, turning axum's plain-text rejection into the error envelope.
///
/// A body that parses but has a wrongly typed field is a validation error on
/// that field; anything else (bad syntax, wrong content type) is a bad request.
pub fn extract_json<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::JsonDataError(e)) => {
            let text = e.body_text();
            let field = field_of(&text).to_string();
            Err(AppError::Validation(vec![FieldError::new(&field, text)]))
        }
        Err(e) => Err(AppError::BadRequest(e.body_text())),
    }
}

/// Field path from a serde_path_to_error message such as
/// `Failed to deserialize the JSON body into the target type: count: invalid type ...`.
fn field_of(text: &str) -> &str {
    text.split_once("target type: ")
        .and_then(|(_, rest)| rest.split_once(": "))
        .map(|(path, _)| path)
        .filter(|path| !path.is_empty() && *path != "." && !path.contains(' '))
        .unwrap_or("body")
}
