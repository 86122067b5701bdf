//! Invoice aggregate: milestones, payments and derived totals.
//!
//! Amounts are integer minor units throughout (see [`crate::models::money`]).
//! `paid_amount`, `remaining_amount` and `status` are derived fields owned by
//! the ledger recomputation in `services::ledger` and are never accepted as
//! independent input.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice settlement status.
///
/// `Overdue` and `Cancelled` are administrator-set exceptions; the other
/// three are a pure function of `paid_amount` vs `total_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "partial" => InvoiceStatus::Partial,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            "cancelled" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Unpaid,
        }
    }
}

/// Milestone payment state. Binary: there is no partial at this granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestonePaymentStatus {
    Paid,
    Unpaid,
}

/// Delivery-workflow state, decoupled from payment state. Shared by
/// milestones and booking timeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    InProgress,
    Completed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Completed => "completed",
        }
    }
}

/// Payment channel tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "bkash")]
    Bkash,
    #[serde(rename = "nagad")]
    Nagad,
    #[serde(rename = "bank")]
    Bank,
    #[serde(rename = "other")]
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Bkash => "bkash",
            PaymentMethod::Nagad => "nagad",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Other => "other",
        }
    }
}

/// One deliverable/payment step of an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Fixed at creation; contributes to the invoice total.
    pub amount: i64,
    pub payment_status: MilestonePaymentStatus,
    /// Equals `amount` when paid, `0` when unpaid.
    pub paid_amount: i64,
    pub paid_date: Option<DateTime>,
    /// Delivery progress; a milestone can be completed and unpaid, or paid
    /// and still pending delivery.
    pub status: WorkflowStatus,
    pub completed_date: Option<DateTime>,
}

impl Milestone {
    pub fn is_paid(&self) -> bool {
        self.payment_status == MilestonePaymentStatus::Paid
    }
}

/// Append-only record of money received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub amount: i64,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub milestone_id: Option<Uuid>,
    pub payment_date: DateTime,
    pub notes: Option<String>,
    pub verified_by: String,
}

/// Static account-detail display record rendered on the client invoice view.
/// Not part of reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodInfo {
    pub label: String,
    pub method: PaymentMethod,
    pub account_name: Option<String>,
    pub account_number: String,
    pub instructions: Option<String>,
}

/// The billing aggregate for one service booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub invoice_number: String,
    pub booking_id: Option<Uuid>,

    // Client snapshot at invoice-creation time, not a live reference.
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,

    // Package snapshot.
    pub service_name: String,
    pub package_name: String,
    pub package_price: i64,

    pub currency: String,
    pub total_amount: i64,
    /// Informational classification ("Full", "Milestone"); does not change
    /// reconciliation rules.
    pub payment_type: String,

    /// Ordered, non-empty. A single milestone represents a pay-in-full
    /// invoice.
    pub milestones: Vec<Milestone>,
    /// Append-only history.
    pub payments: Vec<Payment>,

    // Derived; recomputed on every mutation.
    pub paid_amount: i64,
    pub remaining_amount: i64,
    pub status: InvoiceStatus,

    pub issue_date: DateTime,
    pub due_date: Option<DateTime>,
    /// Set once, the first time the invoice transitions into `Paid`.
    pub paid_date: Option<DateTime>,

    pub payment_methods: Vec<PaymentMethodInfo>,
    pub terms_and_conditions: Option<String>,

    /// Optimistic-concurrency counter; stale replacements are rejected.
    pub version: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Invoice {
    pub fn milestone(&self, milestone_id: Uuid) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == milestone_id)
    }

    pub fn milestone_mut(&mut self, milestone_id: Uuid) -> Option<&mut Milestone> {
        self.milestones.iter_mut().find(|m| m.id == milestone_id)
    }
}
