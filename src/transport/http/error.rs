//! Error → HTTP response mapping.

use crate::domain::error::ServiceError;
use crate::domain::validation::FieldErrors;
use crate::transport::http::types::ApiResponse;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("invalid or missing authentication token")]
    InvalidAuthToken,
    #[error("{0}")]
    InvalidBody(String),
    #[error("invalid query string: {0}")]
    InvalidQuery(String),
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        Self::Service(ServiceError::Validation(errors))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidAuthToken => StatusCode::UNAUTHORIZED,
            Self::InvalidBody(_) | Self::InvalidQuery(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Service(err) => match err {
                ServiceError::Validation(_) | ServiceError::BadRequest => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ServiceError::DuplicateEmail | ServiceError::DuplicateUsername => {
                    StatusCode::CONFLICT
                }
                ServiceError::NotFound => StatusCode::NOT_FOUND,
                ServiceError::Unauthorized | ServiceError::InvalidUserAge => {
                    StatusCode::UNAUTHORIZED
                }
                ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ApiResponse {
        let field_errors = |errors: &FieldErrors| Some(serde_json::json!({ "errors": errors }));
        match self {
            Self::InvalidAuthToken => ApiResponse::failed(self.to_string(), None),
            Self::InvalidBody(msg) => ApiResponse::failed(msg.as_str(), None),
            Self::InvalidQuery(_) => ApiResponse::failed(self.to_string(), None),
            Self::Service(err) => match err {
                ServiceError::Validation(errors) => {
                    ApiResponse::failed("validation failed", field_errors(errors))
                }
                ServiceError::DuplicateEmail => ApiResponse::failed(
                    err.to_string(),
                    field_errors(&FieldErrors::single("email", "this email is already in use")),
                ),
                ServiceError::DuplicateUsername => ApiResponse::failed(
                    err.to_string(),
                    field_errors(&FieldErrors::single(
                        "username",
                        "this username is already in use",
                    )),
                ),
                ServiceError::NotFound => ApiResponse::failed("requested resource not found", None),
                ServiceError::Unauthorized => {
                    ApiResponse::failed("invalid authentication credentials", None)
                }
                ServiceError::InvalidUserAge => ApiResponse::failed("invalid user age", None),
                ServiceError::BadRequest => ApiResponse::failed("unable to process request", None),
                // Detail stays in the log.
                ServiceError::Internal(_) => ApiResponse::failed("internal error", None),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Service(ServiceError::Internal(err)) = &self {
            tracing::error!(error = ?err, "request failed");
        }

        let mut response = (self.status(), Json(self.body())).into_response();
        if matches!(self, Self::InvalidAuthToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::InvalidAuthToken, StatusCode::UNAUTHORIZED),
            (ServiceError::InvalidUserAge.into(), StatusCode::UNAUTHORIZED),
            (ServiceError::Unauthorized.into(), StatusCode::UNAUTHORIZED),
            (ServiceError::BadRequest.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (ServiceError::DuplicateEmail.into(), StatusCode::CONFLICT),
            (ServiceError::NotFound.into(), StatusCode::NOT_FOUND),
            (
                ServiceError::internal(anyhow::anyhow!("db exploded")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
        }
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err: ApiError = ServiceError::internal(anyhow::anyhow!("password=hunter2")).into();
        let body = serde_json::to_string(&err.body()).unwrap();
        assert!(!body.contains("hunter2"));
        assert!(body.contains("internal error"));
    }

    #[test]
    fn invalid_token_sets_challenge_header() {
        let response = ApiError::InvalidAuthToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Token");
    }
}
