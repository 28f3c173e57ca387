//! Request extractors: bearer-token identity and multipart uploads.

use axum::body::Bytes;
use axum::extract::{FromRequestParts, Multipart};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use super::{ApiError, AppState};
use crate::auth::Identity;
use crate::error::AuthError;

/// The authenticated caller.
///
/// Resolved from request headers only, so it always runs before a body
/// extractor touches the upload.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl CurrentUser {
    pub fn username(&self) -> &str {
        &self.0.username
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let identity = state.gate.validate(token).await?;
        debug!(user = %identity.username, "Token validated");
        Ok(Self(identity))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// The parts of a multipart upload the pipeline cares about.
#[derive(Debug, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Bytes,
    pub email: Option<String>,
}

impl Upload {
    /// Read the `file` part (required) and the `email` part (optional).
    /// Unknown parts are skipped.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut upload = Upload::default();
        let mut saw_file = false;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    upload.file_name = field.file_name().map(str::to_string);
                    upload.bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
                    saw_file = true;
                }
                Some("email") => {
                    let email = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read email: {e}")))?;
                    upload.email = Some(email.trim().to_string());
                }
                other => debug!(field = ?other, "Ignoring multipart field"),
            }
        }

        if !saw_file {
            return Err(ApiError::unprocessable("Missing file upload"));
        }
        Ok(upload)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("Bearer   abc123 ")), Some("abc123"));
    }

    #[test]
    fn rejects_other_schemes_and_blanks() {
        assert_eq!(bearer_token(&headers("Basic YWRtaW46YWRtaW4=")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer  ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
