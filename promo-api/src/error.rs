use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use promo_core::CoreError;
use promo_offer::{RedemptionError, ValidationErrors};
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Admin access required")]
    Forbidden,
    #[error(transparent)]
    Validation(ValidationErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("Promo code already exists. Please use a different code.")]
    DuplicatePromoCode(String),
    #[error(transparent)]
    Redemption(RedemptionError),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(ValidationErrors::single(field, message))
    }
}

/// Internal failure detail carried on the response until
/// [`internal_error_detail`] decides whether the client may see it.
#[derive(Debug, Clone)]
pub struct InternalErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, code, fields) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", None),
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", Some(errors))
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            AppError::DuplicatePromoCode(_) => (StatusCode::CONFLICT, "DUPLICATE_PROMO_CODE", None),
            AppError::Redemption(err) => {
                let status = match err {
                    RedemptionError::NotFound => StatusCode::NOT_FOUND,
                    RedemptionError::RedemptionLimitReached | RedemptionError::Contended => {
                        StatusCode::CONFLICT
                    }
                    RedemptionError::Inactive
                    | RedemptionError::OutOfWindow
                    | RedemptionError::ProductNotEligible => StatusCode::BAD_REQUEST,
                };
                (status, err.code(), None)
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal Server Error: {}", detail);
                let mut response = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "INTERNAL_ERROR",
                        "message": "Internal Server Error",
                    })),
                )
                    .into_response();
                response.extensions_mut().insert(InternalErrorDetail(detail));
                return response;
            }
        };

        let mut body = json!({
            "success": false,
            "error": code,
            "message": message,
        });
        if let Some(fields) = fields {
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(errors) => AppError::Validation(errors),
            CoreError::DuplicatePromoCode(code) => AppError::DuplicatePromoCode(code),
            CoreError::NotFound(_) => AppError::NotFound("Special offer not found".to_string()),
            CoreError::Redemption(err) => AppError::Redemption(err),
            CoreError::Storage(_) | CoreError::Image(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::validation("body", rejection.body_text())
    }
}

/// Re-render 500 responses with their detail when the server runs in
/// development mode. Everywhere else the generic body stands.
pub async fn internal_error_detail(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let Some(InternalErrorDetail(detail)) =
        response.extensions_mut().remove::<InternalErrorDetail>()
    else {
        return response;
    };
    if !state.expose_internal_errors {
        return response;
    }

    let body = json!({
        "success": false,
        "error": "INTERNAL_ERROR",
        "message": "Internal Server Error",
        "detail": detail,
    });
    response.headers_mut().remove(header::CONTENT_LENGTH);
    *response.body_mut() = Body::from(body.to_string());
    response
}
