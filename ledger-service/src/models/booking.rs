//! Service booking: the external collaborator the ledger links invoices to.
//!
//! Status, progress and timeline are edited independently by the admin
//! console; the ledger never derives them from invoice state.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::invoice::WorkflowStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Inquired,
    Pending,
    Paid,
    Started,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Inquired => "inquired",
            BookingStatus::Pending => "pending",
            BookingStatus::Paid => "paid",
            BookingStatus::Started => "started",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

/// One phase of the delivery timeline shown to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePhase {
    pub name: String,
    pub description: Option<String>,
    pub status: WorkflowStatus,
    pub date: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceBooking {
    #[serde(rename = "_id")]
    pub id: Uuid,

    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,

    pub service_name: String,
    pub package_name: String,
    pub package_price: i64,
    pub currency: String,

    pub status: BookingStatus,
    /// 0–100, admin-maintained; not derived from the invoice.
    pub progress: u8,
    pub timeline: Vec<TimelinePhase>,

    /// At most one invoice per booking.
    pub invoice_id: Option<Uuid>,
    pub notes: Option<String>,

    pub created_at: DateTime,
    pub updated_at: DateTime,
}
