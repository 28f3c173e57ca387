//! CRM synchronization: one POST per lead, per-lead success accounting.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::record::{Lead, RecordSet};
use crate::error::ConfigError;

pub const DEFAULT_CRM_ENDPOINT: &str = "https://saasquatchleads.com/api/leads";

/// Name reported for leads without a `name` field.
pub const UNKNOWN_NAME: &str = "Unknown";

/// CRM endpoint settings.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum number of requests in flight at once.
    pub max_concurrency: usize,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CRM_ENDPOINT.to_string(),
            timeout: Duration::from_secs(10),
            max_concurrency: 8,
        }
    }
}

/// Outcome of pushing one lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub name: String,
    pub success: bool,
}

/// Pushes leads to the external CRM.
#[derive(Clone)]
pub struct CrmSync {
    client: reqwest::Client,
    config: CrmConfig,
}

impl CrmSync {
    pub fn new(config: CrmConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Push every lead and report one outcome per lead, in input order.
    ///
    /// A failed lead never stops the others.
    pub async fn sync(&self, set: &RecordSet) -> Vec<SyncOutcome> {
        let limit = self.config.max_concurrency.max(1);
        debug!(records = set.len(), limit, endpoint = %self.config.endpoint, "Starting CRM sync");

        let pushes: Vec<_> = set
            .leads()
            .iter()
            .enumerate()
            .map(|(index, lead)| async move {
                let success = self.push_lead(index, lead).await;
                SyncOutcome {
                    name: lead.name().unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                    success,
                }
            })
            .collect();
        let outcomes: Vec<SyncOutcome> = stream::iter(pushes)
            .buffered(limit)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| !o.success).count();
        info!(records = outcomes.len(), failed, "CRM sync completed");
        outcomes
    }

    async fn push_lead(&self, index: usize, lead: &Lead) -> bool {
        match self
            .client
            .post(&self.config.endpoint)
            .json(lead)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                debug!(index, status = %resp.status(), "Lead accepted by CRM");
                true
            }
            Ok(resp) => {
                warn!(index, status = %resp.status(), "CRM rejected lead");
                false
            }
            Err(e) => {
                warn!(index, error = %e, timeout = e.is_timeout(), "Failed to send lead to CRM");
                false
            }
        }
    }
}
