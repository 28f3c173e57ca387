//! Lead scoring and priority banding.
//!
//! The model is a single rule: leads whose industry mentions `Finance` score 90,
//! everyone else 50. Priority comes from half-open score bands, so the banding
//! works for any score even though the rule only ever yields two values.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::record::{Lead, PRIORITY, Priority, RecordSet, SCORE};

/// Case-sensitive substring that marks a finance lead.
const FINANCE_MARKER: &str = "Finance";

pub const FINANCE_SCORE: i64 = 90;
pub const DEFAULT_SCORE: i64 = 50;

/// Upper bounds (inclusive) of each band; each band's lower bound is exclusive
/// and equals the previous band's upper bound, starting at 0.
const BANDS: [(i64, Priority); 3] = [
    (60, Priority::Low),
    (80, Priority::Medium),
    (100, Priority::High),
];

/// Score a lead from its industry text.
pub fn score_for_industry(industry: &str) -> i64 {
    if industry.contains(FINANCE_MARKER) {
        FINANCE_SCORE
    } else {
        DEFAULT_SCORE
    }
}

/// Map a score onto its priority band.
///
/// `(0, 60]` → Low, `(60, 80]` → Medium, `(80, 100]` → High. Scores outside
/// `(0, 100]`, zero included, are `Unscored`.
pub fn priority_for(score: i64) -> Priority {
    let mut lower = 0;
    for (upper, priority) in BANDS {
        if score > lower && score <= upper {
            return priority;
        }
        lower = upper;
    }
    Priority::Unscored
}

/// Attach `score` and `priority` to one lead.
pub fn score_lead(lead: &mut Lead) {
    let score = score_for_industry(&lead.industry_text());
    lead.set(SCORE, score);
    lead.set(PRIORITY, priority_for(score).as_str());
}

/// Score every lead in the set.
///
/// `score` and `priority` become trailing columns; if the input already had
/// columns by those names they are overwritten in place.
pub fn score_records(mut set: RecordSet) -> RecordSet {
    set.declare_column(SCORE);
    set.declare_column(PRIORITY);
    for lead in set.leads_mut() {
        score_lead(lead);
    }

    let high = set
        .leads()
        .iter()
        .filter(|l| l.priority() == Some(Priority::High))
        .count();
    info!(records = set.len(), high_priority = high, "Scored leads");
    set
}

/// A single lead submitted as JSON for scoring.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// Score outcome for a single lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub name: String,
    pub score: i64,
    pub priority: Priority,
}

impl LeadRequest {
    pub fn score(&self) -> LeadScore {
        let score = score_for_industry(self.industry.as_deref().unwrap_or(""));
        let priority = priority_for(score);
        debug!(name = %self.name, score, %priority, "Scored single lead");
        LeadScore {
            name: self.name.clone(),
            score,
            priority,
        }
    }
}
