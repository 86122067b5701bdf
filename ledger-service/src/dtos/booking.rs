use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::money::format_amount;
use crate::models::{BookingStatus, ServiceBooking, TimelinePhase, WorkflowStatus};

use super::{fmt_date, fmt_date_opt};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1))]
    pub client_name: String,
    #[validate(email)]
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    #[validate(length(min = 1))]
    pub service_name: String,
    #[validate(length(min = 1))]
    pub package_name: String,
    pub package_price: String,
    #[validate(length(min = 1))]
    pub currency: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimelinePhaseRequest {
    pub name: String,
    pub description: Option<String>,
    pub status: WorkflowStatus,
    pub date: Option<String>,
}

/// Partial update of the admin-owned booking fields. Absent fields are left
/// untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookingRequest {
    pub status: Option<BookingStatus>,
    #[validate(range(max = 100))]
    pub progress: Option<u8>,
    pub timeline: Option<Vec<TimelinePhaseRequest>>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TimelinePhaseResponse {
    pub name: String,
    pub description: Option<String>,
    pub status: WorkflowStatus,
    pub date: Option<String>,
}

impl From<TimelinePhase> for TimelinePhaseResponse {
    fn from(phase: TimelinePhase) -> Self {
        Self {
            name: phase.name,
            description: phase.description,
            status: phase.status,
            date: fmt_date_opt(phase.date),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub service_name: String,
    pub package_name: String,
    pub package_price: String,
    pub package_price_minor: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub progress: u8,
    pub timeline: Vec<TimelinePhaseResponse>,
    pub invoice_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ServiceBooking> for BookingResponse {
    fn from(booking: ServiceBooking) -> Self {
        Self {
            id: booking.id,
            client_name: booking.client_name,
            client_email: booking.client_email,
            client_phone: booking.client_phone,
            client_company: booking.client_company,
            service_name: booking.service_name,
            package_name: booking.package_name,
            package_price: format_amount(booking.package_price),
            package_price_minor: booking.package_price,
            currency: booking.currency,
            status: booking.status,
            progress: booking.progress,
            timeline: booking.timeline.into_iter().map(Into::into).collect(),
            invoice_id: booking.invoice_id,
            notes: booking.notes,
            created_at: fmt_date(booking.created_at),
            updated_at: fmt_date(booking.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingResponse>,
    pub total_count: u64,
}
