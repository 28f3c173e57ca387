//! Lead pipeline: ingestion, scoring, and the output sinks.
//!
//! A request's upload flows through [`prepare`] (file-name gate, CSV parse,
//! scoring) and the resulting [`RecordSet`] is handed to exactly one sink:
//! inline JSON, [`export::render_workbook`], [`mail::ReportMailer`], or
//! [`crm::CrmSync`].

pub mod crm;
pub mod export;
pub mod ingest;
pub mod mail;
pub mod record;
pub mod scoring;

pub use crm::{CrmConfig, CrmSync, SyncOutcome};
pub use mail::{MailConfig, MailTransport, ReportMailer, SmtpMailer};
pub use record::{ColumnKind, FieldValue, Lead, Priority, RecordSet};
pub use scoring::{LeadRequest, LeadScore};

use crate::error::IngestError;

/// Validate the file name, parse the bytes, and score every lead.
pub fn prepare(file_name: Option<&str>, bytes: &[u8]) -> Result<RecordSet, IngestError> {
    ingest::ensure_tabular_file(file_name)?;
    let set = ingest::parse_csv(bytes)?;
    Ok(scoring::score_records(set))
}
