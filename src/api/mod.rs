//! HTTP surface: login, the four distribution endpoints, and single-lead scoring.

pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AccessGate;
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::leads::{CrmSync, MailTransport, ReportMailer, SmtpMailer};

pub use error::ApiError;
pub use extract::CurrentUser;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
    /// Report mailer (None if no sender is configured).
    pub mailer: Option<Arc<ReportMailer>>,
    pub crm: Arc<CrmSync>,
}

impl AppState {
    /// Wire the shared services from configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let mailer = match &config.mail {
            Some(mail) => {
                let transport: Arc<dyn MailTransport> = Arc::new(SmtpMailer::new(mail.clone()));
                Some(Arc::new(ReportMailer::new(&mail.from_address, transport)?))
            }
            None => None,
        };

        Ok(Self {
            gate: Arc::new(AccessGate::new(config.auth.clone())),
            mailer,
            crm: Arc::new(CrmSync::new(config.crm.clone())?),
        })
    }
}

/// Build the Axum router with every route.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::health))
        .route("/api/token", post(handlers::login))
        .route("/api/upload_csv", post(handlers::upload_csv))
        .route("/api/export_excel", post(handlers::export_excel))
        .route("/api/email_report", post(handlers::email_report))
        .route("/api/send_to_crm", post(handlers::send_to_crm))
        .route("/api/score_lead", post(handlers::score_lead))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::auth::AuthConfig;
    use crate::error::DistributionError;
    use crate::leads::CrmConfig;

    fn state() -> AppState {
        AppState {
            gate: Arc::new(AccessGate::new(AuthConfig {
                username: "admin".into(),
                password: SecretString::from("admin123".to_string()),
                token_ttl: Duration::from_secs(60),
            })),
            mailer: None,
            crm: Arc::new(CrmSync::new(CrmConfig::default()).unwrap()),
        }
    }

    fn config(pairs: &[(&str, &str)]) -> ServiceConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    #[test]
    fn state_from_config_wires_optional_mailer() {
        let state = AppState::from_config(&config(&[("LEADS_ADMIN_PASSWORD", "x")])).unwrap();
        assert!(state.mailer.is_none());
        assert_eq!(state.crm.endpoint(), crate::leads::crm::DEFAULT_CRM_ENDPOINT);

        let state = AppState::from_config(&config(&[
            ("LEADS_ADMIN_PASSWORD", "x"),
            ("EMAIL_SENDER", "reports@leads.test"),
        ]))
        .unwrap();
        assert!(state.mailer.is_some());
    }

    #[test]
    fn bad_sender_address_fails_startup() {
        let err = AppState::from_config(&config(&[
            ("LEADS_ADMIN_PASSWORD", "x"),
            ("EMAIL_SENDER", "not an address"),
        ]))
        .err()
        .unwrap();
        assert!(matches!(
            err,
            crate::error::Error::Distribution(DistributionError::InvalidAddress { .. })
        ));
        assert!(err.to_string().starts_with("Distribution error: Invalid email address"));
    }

    #[tokio::test]
    async fn health_is_public() {
        let resp = router(state())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn scoring_requires_a_token() {
        let req = Request::post("/api/score_lead")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"Acme"}"#))
            .unwrap();
        let resp = router(state()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/upload_csv")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = router(state()).oneshot(req).await.unwrap();
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    }
}
