//! Mapping service errors onto HTTP responses.
//!
//! Bodies are `{"detail": "..."}`. Internal causes are logged, never echoed.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::error::{AuthError, DistributionError, IngestError};

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::bad_request("Incorrect username or password"),
            AuthError::MissingToken => Self::new(StatusCode::UNAUTHORIZED, "Not authenticated"),
            AuthError::InvalidToken | AuthError::Expired => {
                Self::new(StatusCode::FORBIDDEN, "Invalid token")
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        if err.is_format_rejection() {
            warn!(error = %err, "Upload rejected");
            return Self::bad_request("File must be a CSV");
        }
        error!(error = %err, "Error processing CSV");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process CSV")
    }
}

impl From<DistributionError> for ApiError {
    fn from(err: DistributionError) -> Self {
        error!(error = %err, "Distribution failed");
        match err {
            DistributionError::Render(_) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to export data",
            ),
            DistributionError::InvalidAddress { .. } => {
                Self::unprocessable("Invalid email address")
            }
            DistributionError::NotConfigured { sink } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{sink} is not configured"),
            ),
            DistributionError::Message(_)
            | DistributionError::Delivery(_)
            | DistributionError::Timeout(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "Failed to send email report")
            }
        }
    }
}

// Body extractor rejections keep axum's status and message but use our body shape.

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.detail }));
        if self.status == StatusCode::UNAUTHORIZED {
            (self.status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (self.status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_auth_statuses() {
        assert_eq!(ApiError::from(AuthError::InvalidCredentials).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(AuthError::MissingToken).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::InvalidToken).status, StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(AuthError::Expired).status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn parse_failures_do_not_leak_cause() {
        let err = ApiError::from(IngestError::RaggedRow {
            row: 7,
            expected: 2,
            found: 3,
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail, "Failed to process CSV");
    }

    #[test]
    fn delivery_failure_is_a_gateway_error() {
        let err = ApiError::from(DistributionError::Delivery("relay down".into()));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert!(!err.detail.contains("relay down"));
    }

    #[test]
    fn unauthorized_response_carries_challenge() {
        let resp = ApiError::from(AuthError::MissingToken).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
