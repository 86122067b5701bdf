use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::money::{format_amount, percentage};
use crate::models::{
    Invoice, InvoiceStatus, Milestone, MilestonePaymentStatus, Payment, PaymentMethod,
    PaymentMethodInfo, WorkflowStatus,
};
use crate::services::store::InvoiceStats;

use super::{fmt_date, fmt_date_opt};

#[derive(Debug, Deserialize, Validate)]
pub struct MilestoneRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    /// Decimal string, e.g. `"300.00"`.
    pub amount: String,
    /// Supports migrated records arriving already settled.
    #[serde(default)]
    pub paid: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub booking_id: Option<Uuid>,
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
    pub total_amount: String,
    #[serde(default = "default_payment_type")]
    pub payment_type: String,
    #[validate(nested)]
    pub milestones: Vec<MilestoneRequest>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethodInfo>,
    pub due_date: Option<String>,
    pub terms_and_conditions: Option<String>,
}

fn default_payment_type() -> String {
    "Milestone".to_string()
}

/// Body for `POST /bookings/:id/invoice`; the client and package snapshot is
/// copied from the booking.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingInvoiceRequest {
    pub total_amount: String,
    #[serde(default = "default_payment_type")]
    pub payment_type: String,
    #[validate(nested)]
    pub milestones: Vec<MilestoneRequest>,
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethodInfo>,
    pub due_date: Option<String>,
    pub terms_and_conditions: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: String,
    pub method: PaymentMethod,
    pub milestone_id: Option<Uuid>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub verified_by: String,
    /// When present, the write is rejected unless the invoice still carries
    /// this version.
    pub expected_version: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleMilestoneRequest {
    pub expected_version: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMilestoneStatusRequest {
    pub status: WorkflowStatus,
    pub expected_version: Option<i64>,
}

/// Body for the administrator status overrides (overdue/cancel/reinstate).
#[derive(Debug, Default, Deserialize)]
pub struct StatusChangeRequest {
    pub expected_version: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MilestoneResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub amount: String,
    pub amount_minor: i64,
    /// Computed from `amount / total_amount`; never stored.
    pub percentage: f64,
    pub payment_status: MilestonePaymentStatus,
    pub paid_amount: String,
    pub paid_amount_minor: i64,
    pub paid_date: Option<String>,
    pub status: WorkflowStatus,
    pub completed_date: Option<String>,
}

impl MilestoneResponse {
    fn from_model(milestone: Milestone, total_amount: i64) -> Self {
        Self {
            id: milestone.id,
            name: milestone.name,
            description: milestone.description,
            amount: format_amount(milestone.amount),
            amount_minor: milestone.amount,
            percentage: percentage(milestone.amount, total_amount),
            payment_status: milestone.payment_status,
            paid_amount: format_amount(milestone.paid_amount),
            paid_amount_minor: milestone.paid_amount,
            paid_date: fmt_date_opt(milestone.paid_date),
            status: milestone.status,
            completed_date: fmt_date_opt(milestone.completed_date),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub amount: String,
    pub amount_minor: i64,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub milestone_id: Option<Uuid>,
    pub payment_date: String,
    pub notes: Option<String>,
    pub verified_by: String,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            amount: format_amount(payment.amount),
            amount_minor: payment.amount,
            method: payment.method,
            transaction_id: payment.transaction_id,
            milestone_id: payment.milestone_id,
            payment_date: fmt_date(payment.payment_date),
            notes: payment.notes,
            verified_by: payment.verified_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub booking_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub service_name: String,
    pub package_name: String,
    pub package_price: String,
    pub package_price_minor: i64,
    pub currency: String,
    pub total_amount: String,
    pub total_amount_minor: i64,
    pub payment_type: String,
    pub milestones: Vec<MilestoneResponse>,
    pub payments: Vec<PaymentResponse>,
    pub paid_amount: String,
    pub paid_amount_minor: i64,
    pub remaining_amount: String,
    pub remaining_amount_minor: i64,
    pub status: InvoiceStatus,
    pub issue_date: String,
    pub due_date: Option<String>,
    pub paid_date: Option<String>,
    pub payment_methods: Vec<PaymentMethodInfo>,
    pub terms_and_conditions: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        let total_amount = invoice.total_amount;
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            booking_id: invoice.booking_id,
            client_name: invoice.client_name,
            client_email: invoice.client_email,
            client_phone: invoice.client_phone,
            client_company: invoice.client_company,
            service_name: invoice.service_name,
            package_name: invoice.package_name,
            package_price: format_amount(invoice.package_price),
            package_price_minor: invoice.package_price,
            currency: invoice.currency,
            total_amount: format_amount(total_amount),
            total_amount_minor: total_amount,
            payment_type: invoice.payment_type,
            milestones: invoice
                .milestones
                .into_iter()
                .map(|m| MilestoneResponse::from_model(m, total_amount))
                .collect(),
            payments: invoice.payments.into_iter().map(Into::into).collect(),
            paid_amount: format_amount(invoice.paid_amount),
            paid_amount_minor: invoice.paid_amount,
            remaining_amount: format_amount(invoice.remaining_amount),
            remaining_amount_minor: invoice.remaining_amount,
            status: invoice.status,
            issue_date: fmt_date(invoice.issue_date),
            due_date: fmt_date_opt(invoice.due_date),
            paid_date: fmt_date_opt(invoice.paid_date),
            payment_methods: invoice.payment_methods,
            terms_and_conditions: invoice.terms_and_conditions,
            version: invoice.version,
            created_at: fmt_date(invoice.created_at),
            updated_at: fmt_date(invoice.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<InvoiceResponse>,
    pub total_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CurrencyTotalsResponse {
    pub outstanding: String,
    pub outstanding_minor: i64,
    pub collected: String,
    pub collected_minor: i64,
}

#[derive(Debug, Serialize)]
pub struct InvoiceStatsResponse {
    pub total: u64,
    pub unpaid: u64,
    pub partial: u64,
    pub paid: u64,
    pub overdue: u64,
    pub cancelled: u64,
    pub by_currency: BTreeMap<String, CurrencyTotalsResponse>,
}

impl From<InvoiceStats> for InvoiceStatsResponse {
    fn from(stats: InvoiceStats) -> Self {
        Self {
            total: stats.total,
            unpaid: stats.unpaid,
            partial: stats.partial,
            paid: stats.paid,
            overdue: stats.overdue,
            cancelled: stats.cancelled,
            by_currency: stats
                .by_currency
                .into_iter()
                .map(|(currency, totals)| {
                    (
                        currency,
                        CurrencyTotalsResponse {
                            outstanding: format_amount(totals.outstanding),
                            outstanding_minor: totals.outstanding,
                            collected: format_amount(totals.collected),
                            collected_minor: totals.collected,
                        },
                    )
                })
                .collect(),
        }
    }
}
