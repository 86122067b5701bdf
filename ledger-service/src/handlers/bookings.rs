//! Booking handlers.
//!
//! Booking status, progress and timeline are admin-owned and edited here
//! independently of the invoice ledger; paying an invoice never writes back
//! to its booking.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use serde::Deserialize;
use uuid::Uuid;

use service_core::error::AppError;
use service_core::utils::ValidatedJson;

use crate::dtos::{
    BookingListResponse, BookingResponse, CreateBookingInvoiceRequest, CreateBookingRequest,
    InvoiceResponse, TimelinePhaseRequest, UpdateBookingRequest,
};
use crate::models::{BookingStatus, ServiceBooking, TimelinePhase};
use crate::services::ledger::{self, NewInvoice};
use crate::services::metrics::INVOICES_TOTAL;
use crate::AppState;

use super::{ledger_op, parse_amount, parse_date};

use super::invoices::parse_milestones;

async fn load_booking(state: &AppState, booking_id: Uuid) -> Result<ServiceBooking, AppError> {
    state
        .bookings
        .find(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("booking {} not found", booking_id)))
}

fn timeline_phases(requests: Vec<TimelinePhaseRequest>) -> Result<Vec<TimelinePhase>, AppError> {
    requests
        .into_iter()
        .map(|req| {
            let date = req
                .date
                .as_deref()
                .map(|s| parse_date("timeline.date", s))
                .transpose()?;
            Ok(TimelinePhase {
                name: req.name,
                description: req.description,
                status: req.status,
                date,
            })
        })
        .collect()
}

pub async fn create_booking(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let package_price = parse_amount("package_price", &payload.package_price)?;

    let now = DateTime::now();
    let booking = ServiceBooking {
        id: Uuid::new_v4(),
        client_name: payload.client_name,
        client_email: payload.client_email,
        client_phone: payload.client_phone,
        client_company: payload.client_company,
        service_name: payload.service_name,
        package_name: payload.package_name,
        package_price,
        currency: payload.currency,
        status: BookingStatus::Inquired,
        progress: 0,
        timeline: Vec::new(),
        invoice_id: None,
        notes: payload.notes,
        created_at: now,
        updated_at: now,
    };

    state.bookings.insert(&booking).await?;

    tracing::info!(booking_id = %booking.id, "Created booking");

    Ok((StatusCode::CREATED, Json(booking.into())))
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsParams {
    pub limit: Option<i64>,
    pub offset: Option<u64>,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<ListBookingsParams>,
) -> Result<Json<BookingListResponse>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let offset = params.offset.unwrap_or(0);

    let (bookings, total_count) = state.bookings.list(limit, offset).await?;

    Ok(Json(BookingListResponse {
        bookings: bookings.into_iter().map(Into::into).collect(),
        total_count,
    }))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = load_booking(&state, booking_id).await?;
    Ok(Json(booking.into()))
}

/// Apply an admin edit to status, progress and/or timeline.
pub async fn update_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let mut booking = load_booking(&state, booking_id).await?;

    if let Some(status) = payload.status {
        booking.status = status;
    }
    if let Some(progress) = payload.progress {
        booking.progress = progress;
    }
    if let Some(timeline) = payload.timeline {
        booking.timeline = timeline_phases(timeline)?;
    }
    if let Some(notes) = payload.notes {
        booking.notes = Some(notes);
    }
    booking.updated_at = DateTime::now();

    state.bookings.replace(&booking).await?;

    tracing::info!(
        booking_id = %booking_id,
        status = booking.status.as_str(),
        progress = booking.progress,
        "Updated booking"
    );

    Ok(Json(booking.into()))
}

/// Create the invoice for a booking; the client and package snapshot is
/// copied from the booking at this moment.
pub async fn create_booking_invoice(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateBookingInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let mut booking = load_booking(&state, booking_id).await?;
    if booking.invoice_id.is_some() {
        return Err(AppError::InvalidState(anyhow::anyhow!(
            "booking {} already has an invoice",
            booking_id
        )));
    }

    let total_amount = parse_amount("total_amount", &payload.total_amount)?;
    let due_date = payload
        .due_date
        .as_deref()
        .map(|s| parse_date("due_date", s))
        .transpose()?;
    let milestones = parse_milestones(payload.milestones)?;

    let invoice = ledger_op(
        "create_invoice",
        ledger::build_invoice(NewInvoice {
            booking_id: Some(booking.id),
            client_name: booking.client_name.clone(),
            client_email: booking.client_email.clone(),
            client_phone: booking.client_phone.clone(),
            client_company: booking.client_company.clone(),
            service_name: booking.service_name.clone(),
            package_name: booking.package_name.clone(),
            package_price: booking.package_price,
            currency: booking.currency.clone(),
            total_amount,
            payment_type: payload.payment_type,
            milestones,
            payment_methods: payload.payment_methods,
            due_date,
            terms_and_conditions: payload.terms_and_conditions,
        }),
    )?;

    state.invoices.insert(&invoice).await?;

    booking.invoice_id = Some(invoice.id);
    booking.updated_at = DateTime::now();
    state.bookings.replace(&booking).await?;

    INVOICES_TOTAL
        .with_label_values(&[invoice.status.as_str()])
        .inc();
    tracing::info!(
        booking_id = %booking_id,
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        "Created invoice for booking"
    );

    Ok((StatusCode::CREATED, Json(invoice.into())))
}
