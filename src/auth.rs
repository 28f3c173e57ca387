//! Access gate: password login and opaque bearer tokens.
//!
//! Tokens are random identifiers held in an in-memory session table. They
//! carry no claims of their own; validity is whatever the table says.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AuthError;

/// Login settings for the single service account.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: SecretString,
    pub token_ttl: Duration,
}

/// Who a valid token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

/// Token response body, shaped like an OAuth2 password-grant reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
struct Session {
    identity: Identity,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Issues and validates bearer tokens.
pub struct AccessGate {
    config: AuthConfig,
    sessions: RwLock<HashMap<String, Session>>,
}

impl AccessGate {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Check a username/password pair and issue a fresh token.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedToken, AuthError> {
        let user_ok = constant_time_eq(username.as_bytes(), self.config.username.as_bytes());
        let pass_ok = constant_time_eq(
            password.as_bytes(),
            self.config.password.expose_secret().as_bytes(),
        );
        if !(user_ok && pass_ok) {
            warn!(username = %username, "Login failed: incorrect credentials");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.config.token_ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let token = Uuid::new_v4().simple().to_string();
        let session = Session {
            identity: Identity {
                username: username.to_string(),
            },
            expires_at: now + ttl,
        };

        {
            let mut sessions = self.sessions.write().await;
            sessions.retain(|_, s| !s.is_expired(now));
            sessions.insert(token.clone(), session);
        }

        info!(username = %username, "Login successful");
        Ok(IssuedToken {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: self.config.token_ttl.as_secs(),
        })
    }

    /// Resolve a bearer token to its identity.
    pub async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let now = Utc::now();
        let session = {
            let sessions = self.sessions.read().await;
            sessions.get(token).cloned()
        };

        match session {
            Some(s) if s.is_expired(now) => {
                self.sessions.write().await.remove(token);
                debug!(username = %s.identity.username, "Token expired");
                Err(AuthError::Expired)
            }
            Some(s) => Ok(s.identity),
            None => {
                warn!("Token validation failed: unknown token");
                Err(AuthError::InvalidToken)
            }
        }
    }

    pub async fn active_sessions(&self) -> usize {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| !s.is_expired(now))
            .count()
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(ttl: Duration) -> AccessGate {
        AccessGate::new(AuthConfig {
            username: "admin".into(),
            password: SecretString::from("admin123".to_string()),
            token_ttl: ttl,
        })
    }

    #[tokio::test]
    async fn login_then_validate() {
        let gate = gate(Duration::from_secs(60));
        let issued = gate.authenticate("admin", "admin123").await.unwrap();
        assert_eq!(issued.token_type, "bearer");
        assert_eq!(issued.expires_in, 60);

        let identity = gate.validate(&issued.access_token).await.unwrap();
        assert_eq!(identity.username, "admin");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let gate = gate(Duration::from_secs(60));
        let err = gate.authenticate("admin", "admin").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let err = gate.authenticate("root", "admin123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(gate.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn unknown_and_empty_tokens_are_rejected() {
        let gate = gate(Duration::from_secs(60));
        assert!(matches!(
            gate.validate("not-a-token").await.unwrap_err(),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            gate.validate("").await.unwrap_err(),
            AuthError::MissingToken
        ));
    }

    #[tokio::test]
    async fn expired_token_is_rejected_and_removed() {
        let gate = gate(Duration::from_millis(20));
        let issued = gate.authenticate("admin", "admin123").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(
            gate.validate(&issued.access_token).await.unwrap_err(),
            AuthError::Expired
        ));
        assert!(matches!(
            gate.validate(&issued.access_token).await.unwrap_err(),
            AuthError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn tokens_are_unique() {
        let gate = gate(Duration::from_secs(60));
        let a = gate.authenticate("admin", "admin123").await.unwrap();
        let b = gate.authenticate("admin", "admin123").await.unwrap();
        assert_ne!(a.access_token, b.access_token);
        assert_eq!(gate.active_sessions().await, 2);
        assert!(gate.validate(&a.access_token).await.is_ok());
        assert!(gate.validate(&b.access_token).await.is_ok());
    }

    #[test]
    fn constant_time_eq_matches_plain_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
