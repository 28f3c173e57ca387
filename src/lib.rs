//! Lead Scoring: upload leads, score them, and ship them to a spreadsheet,
//! an inbox, or a CRM.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod leads;
