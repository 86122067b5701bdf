//! HTTP handlers for ledger-service.

pub mod bookings;
pub mod invoices;

use axum::{http::StatusCode, response::IntoResponse, Json};
use mongodb::bson::DateTime;
use serde_json::json;
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::{money, Invoice};
use crate::services::ledger::LedgerError;
use crate::services::metrics::{ERRORS_TOTAL, LEDGER_OPERATIONS_TOTAL};
use crate::services::get_metrics;
use crate::AppState;

/// Health check endpoint for liveness probes.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "ledger-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint.
pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

pub(crate) fn parse_amount(field: &str, value: &str) -> Result<i64, AppError> {
    money::parse_amount(value)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("{}: {}", field, e)))
}

pub(crate) fn parse_date(field: &str, value: &str) -> Result<DateTime, AppError> {
    DateTime::parse_rfc3339_str(value).map_err(|_| {
        AppError::BadRequest(anyhow::anyhow!("{}: expected an RFC 3339 timestamp", field))
    })
}

pub(crate) async fn load_invoice(state: &AppState, invoice_id: Uuid) -> Result<Invoice, AppError> {
    state
        .invoices
        .find(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("invoice {} not found", invoice_id)))
}

/// Guard an optional caller-supplied version against the loaded document.
pub(crate) fn check_version(invoice: &Invoice, expected: Option<i64>) -> Result<(), AppError> {
    if let Some(expected) = expected {
        if expected != invoice.version {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "invoice version is {} but the request expected {}; refetch and retry",
                invoice.version,
                expected
            )));
        }
    }
    Ok(())
}

/// Bump the version stamp and persist with the optimistic replace guard.
pub(crate) async fn persist_invoice(
    state: &AppState,
    mut invoice: Invoice,
) -> Result<Invoice, AppError> {
    let expected = invoice.version;
    invoice.version = expected + 1;
    invoice.updated_at = DateTime::now();
    state.invoices.replace(&invoice, expected).await?;
    Ok(invoice)
}

/// Run a ledger operation, recording outcome metrics either way.
pub(crate) fn ledger_op<T>(
    operation: &str,
    result: Result<T, LedgerError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            LEDGER_OPERATIONS_TOTAL
                .with_label_values(&[operation, "ok"])
                .inc();
            Ok(value)
        }
        Err(err) => {
            let error_type = match &err {
                LedgerError::Validation(_) => "validation",
                LedgerError::InvalidState(_) => "invalid_state",
                LedgerError::MilestoneNotFound(_) => "not_found",
            };
            LEDGER_OPERATIONS_TOTAL
                .with_label_values(&[operation, "rejected"])
                .inc();
            ERRORS_TOTAL.with_label_values(&[error_type]).inc();
            Err(err.into())
        }
    }
}
