//! Invoice handlers: creation, reads, and every ledger mutation.
//!
//! Handlers are thin command clients: load the aggregate, run the ledger
//! operation, persist with the optimistic version guard. Derived totals are
//! never computed here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use service_core::error::AppError;
use service_core::utils::ValidatedJson;

use crate::dtos::{
    CreateInvoiceRequest, InvoiceListResponse, InvoiceResponse, InvoiceStatsResponse,
    MilestoneRequest, RecordPaymentRequest, StatusChangeRequest, ToggleMilestoneRequest,
    UpdateMilestoneStatusRequest,
};
use crate::models::InvoiceStatus;
use crate::services::ledger::{self, NewInvoice, NewMilestone, NewPayment};
use crate::services::metrics::{INVOICES_TOTAL, PAYMENT_AMOUNT_TOTAL};
use crate::services::store::InvoiceFilter;
use crate::AppState;

use super::{check_version, ledger_op, load_invoice, parse_amount, parse_date, persist_invoice};

pub(crate) fn parse_milestones(
    requests: Vec<MilestoneRequest>,
) -> Result<Vec<NewMilestone>, AppError> {
    requests
        .into_iter()
        .map(|req| {
            let amount = parse_amount("milestones.amount", &req.amount)?;
            Ok(NewMilestone {
                name: req.name,
                description: req.description,
                amount,
                paid: req.paid,
            })
        })
        .collect()
}

/// Create an invoice, optionally linked to an existing booking.
pub async fn create_invoice(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let total_amount = parse_amount("total_amount", &payload.total_amount)?;
    let package_price = parse_amount("package_price", &payload.package_price)?;
    let due_date = payload
        .due_date
        .as_deref()
        .map(|s| parse_date("due_date", s))
        .transpose()?;
    let milestones = parse_milestones(payload.milestones)?;

    let booking = match payload.booking_id {
        Some(booking_id) => {
            let booking = state.bookings.find(booking_id).await?.ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("booking {} not found", booking_id))
            })?;
            if booking.invoice_id.is_some() {
                return Err(AppError::InvalidState(anyhow::anyhow!(
                    "booking {} already has an invoice",
                    booking_id
                )));
            }
            Some(booking)
        }
        None => None,
    };

    let invoice = ledger_op(
        "create_invoice",
        ledger::build_invoice(NewInvoice {
            booking_id: payload.booking_id,
            client_name: payload.client_name,
            client_email: payload.client_email,
            client_phone: payload.client_phone,
            client_company: payload.client_company,
            service_name: payload.service_name,
            package_name: payload.package_name,
            package_price,
            currency: payload.currency,
            total_amount,
            payment_type: payload.payment_type,
            milestones,
            payment_methods: payload.payment_methods,
            due_date,
            terms_and_conditions: payload.terms_and_conditions,
        }),
    )?;

    state.invoices.insert(&invoice).await?;

    if let Some(mut booking) = booking {
        booking.invoice_id = Some(invoice.id);
        booking.updated_at = mongodb::bson::DateTime::now();
        state.bookings.replace(&booking).await?;
    }

    INVOICES_TOTAL
        .with_label_values(&[invoice.status.as_str()])
        .inc();
    tracing::info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        "Created invoice"
    );

    Ok((StatusCode::CREATED, Json(invoice.into())))
}

#[derive(Debug, Deserialize)]
pub struct ListInvoicesParams {
    pub status: Option<InvoiceStatus>,
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

/// List invoices, newest first, with an optional status filter.
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<ListInvoicesParams>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let filter = InvoiceFilter {
        status: params.status,
        limit: params.limit.unwrap_or(50).clamp(1, 200),
        offset: params.offset.unwrap_or(0),
    };

    let (invoices, total_count) = state.invoices.list(filter).await?;

    Ok(Json(InvoiceListResponse {
        invoices: invoices.into_iter().map(Into::into).collect(),
        total_count,
    }))
}

/// Dashboard aggregates: counts per status plus money totals per currency.
pub async fn invoice_stats(
    State(state): State<AppState>,
) -> Result<Json<InvoiceStatsResponse>, AppError> {
    let stats = state.invoices.stats().await?;
    Ok(Json(stats.into()))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = load_invoice(&state, invoice_id).await?;
    Ok(Json(invoice.into()))
}

/// Client-portal lookup by the human-readable invoice number.
pub async fn get_invoice_by_number(
    State(state): State<AppState>,
    Path(invoice_number): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .invoices
        .find_by_number(&invoice_number)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("invoice {} not found", invoice_number))
        })?;
    Ok(Json(invoice.into()))
}

/// Record a payment against the invoice.
pub async fn record_payment(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RecordPaymentRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let amount = parse_amount("amount", &payload.amount)?;
    let payment_date = payload
        .payment_date
        .as_deref()
        .map(|s| parse_date("payment_date", s))
        .transpose()?;

    let mut invoice = load_invoice(&state, invoice_id).await?;
    check_version(&invoice, payload.expected_version)?;
    let currency = invoice.currency.clone();

    let payment_id = ledger_op(
        "record_payment",
        ledger::record_payment(
            &mut invoice,
            NewPayment {
                amount,
                method: payload.method,
                milestone_id: payload.milestone_id,
                transaction_id: payload.transaction_id,
                payment_date,
                notes: payload.notes,
                verified_by: payload.verified_by,
            },
        ),
    )?;

    let invoice = persist_invoice(&state, invoice).await?;

    PAYMENT_AMOUNT_TOTAL
        .with_label_values(&[&currency])
        .inc_by(amount as f64);
    tracing::info!(
        invoice_id = %invoice_id,
        payment_id = %payment_id,
        amount = amount,
        status = invoice.status.as_str(),
        "Recorded payment"
    );

    Ok(Json(invoice.into()))
}

/// Flip one milestone between paid and unpaid (out-of-band settlement).
pub async fn toggle_milestone_payment(
    State(state): State<AppState>,
    Path((invoice_id, milestone_id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<ToggleMilestoneRequest>>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let mut invoice = load_invoice(&state, invoice_id).await?;
    check_version(&invoice, payload.expected_version)?;

    let new_status = ledger_op(
        "toggle_milestone_payment",
        ledger::toggle_milestone_payment(&mut invoice, milestone_id),
    )?;

    let invoice = persist_invoice(&state, invoice).await?;

    tracing::info!(
        invoice_id = %invoice_id,
        milestone_id = %milestone_id,
        payment_status = ?new_status,
        status = invoice.status.as_str(),
        "Toggled milestone payment"
    );

    Ok(Json(invoice.into()))
}

/// Update a milestone's delivery-workflow status.
pub async fn update_milestone_status(
    State(state): State<AppState>,
    Path((invoice_id, milestone_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMilestoneStatusRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let mut invoice = load_invoice(&state, invoice_id).await?;
    check_version(&invoice, payload.expected_version)?;

    ledger_op(
        "update_milestone_workflow",
        ledger::update_milestone_workflow(&mut invoice, milestone_id, payload.status),
    )?;

    let invoice = persist_invoice(&state, invoice).await?;
    Ok(Json(invoice.into()))
}

/// Administrator override: flag the invoice overdue.
pub async fn mark_overdue(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<StatusChangeRequest>>,
) -> Result<Json<InvoiceResponse>, AppError> {
    run_status_override(state, invoice_id, payload, "mark_overdue", ledger::mark_overdue).await
}

/// Administrator override: clear the overdue flag.
pub async fn clear_overdue(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<StatusChangeRequest>>,
) -> Result<Json<InvoiceResponse>, AppError> {
    run_status_override(state, invoice_id, payload, "clear_overdue", ledger::clear_overdue).await
}

/// Administrator override: cancel the invoice.
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<StatusChangeRequest>>,
) -> Result<Json<InvoiceResponse>, AppError> {
    run_status_override(state, invoice_id, payload, "cancel", ledger::cancel).await
}

/// Administrator override: reinstate a cancelled invoice.
pub async fn reinstate_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    payload: Option<Json<StatusChangeRequest>>,
) -> Result<Json<InvoiceResponse>, AppError> {
    run_status_override(state, invoice_id, payload, "reinstate", ledger::reinstate).await
}

async fn run_status_override(
    state: AppState,
    invoice_id: Uuid,
    payload: Option<Json<StatusChangeRequest>>,
    operation: &str,
    op: fn(&mut crate::models::Invoice) -> Result<(), ledger::LedgerError>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let mut invoice = load_invoice(&state, invoice_id).await?;
    check_version(&invoice, payload.expected_version)?;

    ledger_op(operation, op(&mut invoice))?;

    let invoice = persist_invoice(&state, invoice).await?;

    tracing::info!(
        invoice_id = %invoice_id,
        operation = operation,
        status = invoice.status.as_str(),
        "Applied status override"
    );

    Ok(Json(invoice.into()))
}
