//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every workflow error variant maps to exactly one status code:
//!
//! | Variant         | Status |
//! |-----------------|--------|
//! | `Unauthorized`  | 401    |
//! | `Forbidden`     | 403    |
//! | `FormNotFound`  | 404    |
//! | `DuplicateForm` | 409 (body carries the existing id) |
//! | `InvalidState`  | 409    |
//! | `Validation`    | 422    |
//! | `Store`         | 500 (detail stays in the logs)     |

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Workflow(#[from] pcr_core::Error),

  #[error("bad request: {0}")]
  BadRequest(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use pcr_core::Error as E;

    let (status, body) = match &self {
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, json!({ "error": m }))
      }
      ApiError::Workflow(e) => match e {
        E::Unauthorized => {
          (StatusCode::UNAUTHORIZED, json!({ "error": e.to_string() }))
        }
        E::Forbidden(_) => {
          (StatusCode::FORBIDDEN, json!({ "error": e.to_string() }))
        }
        E::FormNotFound(_) => {
          (StatusCode::NOT_FOUND, json!({ "error": e.to_string() }))
        }
        E::DuplicateForm { existing } => (
          StatusCode::CONFLICT,
          json!({ "error": e.to_string(), "existing_form_id": existing }),
        ),
        E::InvalidState(_) => {
          (StatusCode::CONFLICT, json!({ "error": e.to_string() }))
        }
        E::Validation(_) => {
          (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": e.to_string() }))
        }
        E::Store(inner) => {
          tracing::error!(error = %inner, "store failure");
          (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "internal error" }),
          )
        }
      },
    };
    (status, Json(body)).into_response()
  }
}
