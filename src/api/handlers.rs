//! Route handlers.
//!
//! Every pipeline handler takes [`CurrentUser`] as its first extractor so the
//! token is checked before the upload is read.

use axum::Form;
use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{info, instrument};

use super::extract::Upload;
use super::{ApiError, AppState, CurrentUser};
use crate::auth::IssuedToken;
use crate::error::DistributionError;
use crate::leads::export::{REPORT_FILE_NAME, XLSX_MIME, render_workbook};
use crate::leads::{LeadRequest, LeadScore, RecordSet, SyncOutcome, prepare};

/// GET /
pub async fn health() -> impl IntoResponse {
    info!("Health check");
    Json(serde_json::json!({ "message": "API is running." }))
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// POST /api/token
///
/// OAuth2 password-grant style login; extra form fields are ignored.
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<IssuedToken>, ApiError> {
    let Form(form) = form?;
    info!(username = %form.username, "Login attempt");
    let token = state.gate.authenticate(&form.username, &form.password).await?;
    Ok(Json(token))
}

/// POST /api/upload_csv
///
/// Returns the scored leads inline.
#[instrument(skip_all, fields(op = "upload_csv", user = %user.username()))]
pub async fn upload_csv(
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecordSet>, ApiError> {
    let upload = Upload::read(multipart?).await?;
    info!(file = ?upload.file_name, "Uploading CSV");

    let set = prepare(upload.file_name.as_deref(), &upload.bytes)?;
    info!(records = set.len(), "Processed records");
    Ok(Json(set))
}

/// POST /api/export_excel
#[instrument(skip_all, fields(op = "export_excel", user = %user.username()))]
pub async fn export_excel(
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let upload = Upload::read(multipart?).await?;
    info!(file = ?upload.file_name, "Excel export requested");

    let set = prepare(upload.file_name.as_deref(), &upload.bytes)?;
    info!(records = set.len(), "Exporting records to Excel");
    let workbook = render_workbook(&set)?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={REPORT_FILE_NAME}"),
            ),
        ],
        workbook,
    )
        .into_response())
}

/// POST /api/email_report
///
/// Multipart `file` plus `email` (the recipient).
#[instrument(skip_all, fields(op = "email_report", user = %user.username()))]
pub async fn email_report(
    user: CurrentUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mailer = state
        .mailer
        .clone()
        .ok_or_else(|| DistributionError::NotConfigured {
            sink: "email".into(),
        })?;

    let upload = Upload::read(multipart?).await?;
    let recipient = upload
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::unprocessable("Missing email field"))?;
    info!(to = %recipient, file = ?upload.file_name, "Sending report by email");

    let set = prepare(upload.file_name.as_deref(), &upload.bytes)?;
    info!(records = set.len(), "Processed records");
    mailer.dispatch(&recipient, &set).await?;

    Ok(Json(serde_json::json!({
        "message": format!("Report sent to {recipient}")
    })))
}

/// POST /api/send_to_crm
///
/// Always answers 200 once the file parses; per-lead failures live in the body.
#[instrument(skip_all, fields(op = "send_to_crm", user = %user.username()))]
pub async fn send_to_crm(
    user: CurrentUser,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<SyncOutcome>>, ApiError> {
    let upload = Upload::read(multipart?).await?;
    info!(file = ?upload.file_name, endpoint = %state.crm.endpoint(), "Sending leads to CRM");

    let set = prepare(upload.file_name.as_deref(), &upload.bytes)?;
    let outcomes = state.crm.sync(&set).await;
    info!(records = outcomes.len(), "CRM sync finished");
    Ok(Json(outcomes))
}

/// POST /api/score_lead
#[instrument(skip_all, fields(op = "score_lead", user = %user.username()))]
pub async fn score_lead(
    user: CurrentUser,
    lead: Result<Json<LeadRequest>, JsonRejection>,
) -> Result<Json<LeadScore>, ApiError> {
    let Json(lead) = lead?;
    Ok(Json(lead.score()))
}
