//! Configuration types, built from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::auth::AuthConfig;
use crate::error::ConfigError;
use crate::leads::crm::{CrmConfig, DEFAULT_CRM_ENDPOINT};
use crate::leads::mail::MailConfig;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
    /// `None` when no sender is configured (email reports disabled).
    pub mail: Option<MailConfig>,
    pub crm: CrmConfig,
}

impl ServiceConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or(&var, "LEADS_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?;

        let password = var("LEADS_ADMIN_PASSWORD")
            .ok_or_else(|| ConfigError::MissingEnvVar("LEADS_ADMIN_PASSWORD".into()))?;
        let auth = AuthConfig {
            username: var("LEADS_ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            password: SecretString::from(password),
            token_ttl: Duration::from_secs(60 * nonzero_or(&var, "LEADS_TOKEN_TTL_MINUTES", 60u64)?),
        };

        let mail = match var("EMAIL_SENDER") {
            Some(sender) => Some(MailConfig {
                smtp_host: var("EMAIL_SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                smtp_port: parse_or(&var, "EMAIL_SMTP_PORT", 465u16)?,
                username: sender.clone(),
                password: SecretString::from(var("EMAIL_PASSWORD").unwrap_or_default()),
                from_address: sender,
                timeout: Duration::from_secs(nonzero_or(&var, "EMAIL_TIMEOUT_SECS", 30u64)?),
            }),
            None => None,
        };

        let crm = CrmConfig {
            endpoint: var("CRM_ENDPOINT").unwrap_or_else(|| DEFAULT_CRM_ENDPOINT.to_string()),
            timeout: Duration::from_secs(nonzero_or(&var, "CRM_TIMEOUT_SECS", 10u64)?),
            max_concurrency: nonzero_or(&var, "CRM_MAX_CONCURRENCY", 8usize)?,
        };

        Ok(Self {
            bind_addr,
            auth,
            mail,
            crm,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Like [`parse_or`], but an explicit zero is rejected.
fn nonzero_or<T, F>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(var, key, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(value)
}
