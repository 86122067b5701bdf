//! Request/response types for the HTTP surface.
//!
//! Amounts cross the wire as decimal strings (`"1000.00"`) with the minor-unit
//! integer alongside; dates are RFC 3339 strings.

pub mod booking;
pub mod invoice;

use mongodb::bson::DateTime;

pub use booking::{
    BookingListResponse, BookingResponse, CreateBookingRequest, TimelinePhaseRequest,
    UpdateBookingRequest,
};
pub use invoice::{
    CreateBookingInvoiceRequest, CreateInvoiceRequest, InvoiceListResponse, InvoiceResponse,
    InvoiceStatsResponse, MilestoneRequest, MilestoneResponse, PaymentResponse,
    RecordPaymentRequest, StatusChangeRequest, ToggleMilestoneRequest,
    UpdateMilestoneStatusRequest,
};

pub(crate) fn fmt_date(date: DateTime) -> String {
    date.try_to_rfc3339_string().unwrap_or_default()
}

pub(crate) fn fmt_date_opt(date: Option<DateTime>) -> Option<String> {
    date.map(fmt_date)
}
