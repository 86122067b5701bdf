//! The invoice ledger: every mutation of the Invoice aggregate goes through
//! this module, which owns the reconciliation rules.
//!
//! Invariants maintained across all operations:
//! - milestone amounts sum to the invoice total
//! - `paid_amount` equals the sum of milestone `paid_amount`s
//! - `remaining_amount = total_amount - paid_amount`, never negative
//! - a milestone's `paid_amount` is its `amount` when paid, zero otherwise
//! - the payment list is append-only
//!
//! UI layers are pure read/command clients; they never compute derived
//! totals themselves.

use mongodb::bson::DateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::models::money::format_amount;
use crate::models::{
    Invoice, InvoiceStatus, Milestone, MilestonePaymentStatus, Payment, PaymentMethod,
    PaymentMethodInfo, WorkflowStatus,
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("milestone {0} not found on invoice")]
    MilestoneNotFound(Uuid),
}

impl From<LedgerError> for service_core::error::AppError {
    fn from(err: LedgerError) -> Self {
        use service_core::error::AppError;
        match err {
            LedgerError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            LedgerError::InvalidState(msg) => AppError::InvalidState(anyhow::anyhow!(msg)),
            LedgerError::MilestoneNotFound(id) => {
                AppError::NotFound(anyhow::anyhow!("milestone {} not found on invoice", id))
            }
        }
    }
}

/// Milestone input at invoice creation. `paid` supports migrated records
/// that arrive with settlement history already applied.
#[derive(Debug, Clone)]
pub struct NewMilestone {
    pub name: String,
    pub description: Option<String>,
    pub amount: i64,
    pub paid: bool,
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub booking_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub service_name: String,
    pub package_name: String,
    pub package_price: i64,
    pub currency: String,
    pub total_amount: i64,
    pub payment_type: String,
    pub milestones: Vec<NewMilestone>,
    pub payment_methods: Vec<PaymentMethodInfo>,
    pub due_date: Option<DateTime>,
    pub terms_and_conditions: Option<String>,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: i64,
    pub method: PaymentMethod,
    pub milestone_id: Option<Uuid>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<DateTime>,
    pub notes: Option<String>,
    pub verified_by: String,
}

/// Validate the milestone set and assemble a fresh invoice aggregate.
pub fn build_invoice(input: NewInvoice) -> Result<Invoice, LedgerError> {
    if input.total_amount <= 0 {
        return Err(LedgerError::Validation(
            "total amount must be positive".to_string(),
        ));
    }
    if input.milestones.is_empty() {
        return Err(LedgerError::Validation(
            "an invoice needs at least one milestone".to_string(),
        ));
    }
    if let Some(bad) = input.milestones.iter().find(|m| m.amount <= 0) {
        return Err(LedgerError::Validation(format!(
            "milestone '{}' amount must be positive",
            bad.name
        )));
    }
    let milestone_sum: i64 = input.milestones.iter().map(|m| m.amount).sum();
    if milestone_sum != input.total_amount {
        return Err(LedgerError::Validation(format!(
            "milestone amounts sum to {} but the invoice total is {}",
            format_amount(milestone_sum),
            format_amount(input.total_amount)
        )));
    }

    let now = DateTime::now();
    let milestones = input
        .milestones
        .into_iter()
        .map(|m| Milestone {
            id: Uuid::new_v4(),
            name: m.name,
            description: m.description,
            amount: m.amount,
            payment_status: if m.paid {
                MilestonePaymentStatus::Paid
            } else {
                MilestonePaymentStatus::Unpaid
            },
            paid_amount: if m.paid { m.amount } else { 0 },
            paid_date: if m.paid { Some(now) } else { None },
            status: WorkflowStatus::Pending,
            completed_date: None,
        })
        .collect();

    let mut invoice = Invoice {
        id: Uuid::new_v4(),
        invoice_number: next_invoice_number(),
        booking_id: input.booking_id,
        client_name: input.client_name,
        client_email: input.client_email,
        client_phone: input.client_phone,
        client_company: input.client_company,
        service_name: input.service_name,
        package_name: input.package_name,
        package_price: input.package_price,
        currency: input.currency,
        total_amount: input.total_amount,
        payment_type: input.payment_type,
        milestones,
        payments: Vec::new(),
        paid_amount: 0,
        remaining_amount: 0,
        status: InvoiceStatus::Unpaid,
        issue_date: now,
        due_date: input.due_date,
        paid_date: None,
        payment_methods: input.payment_methods,
        terms_and_conditions: input.terms_and_conditions,
        version: 0,
        created_at: now,
        updated_at: now,
    };
    recompute(&mut invoice);
    Ok(invoice)
}

fn next_invoice_number() -> String {
    let stamp = chrono::Utc::now().format("%Y%m");
    let id = Uuid::new_v4().simple().to_string();
    format!("INV-{}-{}", stamp, id[..6].to_uppercase())
}

/// Recompute `paid_amount`, `remaining_amount` and `status` from the
/// milestone array. Idempotent: a second call yields identical results.
pub fn recompute(invoice: &mut Invoice) {
    let paid: i64 = invoice.milestones.iter().map(|m| m.paid_amount).sum();
    invoice.paid_amount = paid.min(invoice.total_amount);
    invoice.remaining_amount = invoice.total_amount - invoice.paid_amount;

    invoice.status = match invoice.status {
        InvoiceStatus::Cancelled => InvoiceStatus::Cancelled,
        // Overdue is a soft flag: only full payment clears it.
        InvoiceStatus::Overdue if invoice.paid_amount < invoice.total_amount => {
            InvoiceStatus::Overdue
        }
        _ => amount_status(invoice.paid_amount, invoice.total_amount),
    };

    if invoice.status == InvoiceStatus::Paid && invoice.paid_date.is_none() {
        invoice.paid_date = Some(DateTime::now());
    }
}

fn amount_status(paid: i64, total: i64) -> InvoiceStatus {
    if paid == 0 {
        InvoiceStatus::Unpaid
    } else if paid < total {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Paid
    }
}

/// Append a payment record and settle the attributed milestone.
///
/// A payment must target exactly one unpaid milestone and match its amount;
/// on a single-milestone invoice the attribution is implicit. Out-of-band or
/// irregular settlements go through [`toggle_milestone_payment`] instead.
///
/// Returns the id of the recorded payment.
pub fn record_payment(invoice: &mut Invoice, input: NewPayment) -> Result<Uuid, LedgerError> {
    match invoice.status {
        InvoiceStatus::Cancelled => {
            return Err(LedgerError::InvalidState(
                "no payments can be recorded on a cancelled invoice".to_string(),
            ))
        }
        InvoiceStatus::Paid => {
            return Err(LedgerError::InvalidState(
                "invoice is already fully paid".to_string(),
            ))
        }
        _ => {}
    }
    if input.amount <= 0 {
        return Err(LedgerError::Validation(
            "payment amount must be positive".to_string(),
        ));
    }
    if input.amount > invoice.remaining_amount {
        return Err(LedgerError::Validation(
            "amount exceeds remaining balance".to_string(),
        ));
    }

    let milestone_id = match input.milestone_id {
        Some(id) => id,
        None if invoice.milestones.len() == 1 => invoice.milestones[0].id,
        None => {
            return Err(LedgerError::Validation(
                "milestone_id is required when the invoice has more than one milestone".to_string(),
            ))
        }
    };

    let index = invoice
        .milestones
        .iter()
        .position(|m| m.id == milestone_id)
        .ok_or(LedgerError::MilestoneNotFound(milestone_id))?;

    let milestone = &invoice.milestones[index];
    if milestone.is_paid() {
        return Err(LedgerError::InvalidState(format!(
            "milestone '{}' is already paid",
            milestone.name
        )));
    }
    if input.amount != milestone.amount {
        return Err(LedgerError::Validation(format!(
            "payment amount {} does not match the milestone amount {}",
            format_amount(input.amount),
            format_amount(milestone.amount)
        )));
    }

    // All validation passed; apply the mutation as one unit.
    let payment_date = input.payment_date.unwrap_or_else(DateTime::now);
    let payment = Payment {
        id: Uuid::new_v4(),
        amount: input.amount,
        method: input.method,
        transaction_id: input.transaction_id,
        milestone_id: Some(milestone_id),
        payment_date,
        notes: input.notes,
        verified_by: input.verified_by,
    };
    let payment_id = payment.id;
    invoice.payments.push(payment);
    mark_paid(&mut invoice.milestones[index], payment_date);
    recompute(invoice);
    Ok(payment_id)
}

/// Flip one milestone between paid and unpaid without a payment record.
///
/// The manual-correction path for money settled out-of-band. Un-marking a
/// milestone decreases `paid_amount` and can move the invoice backward
/// (`Paid -> Partial -> Unpaid`).
pub fn toggle_milestone_payment(
    invoice: &mut Invoice,
    milestone_id: Uuid,
) -> Result<MilestonePaymentStatus, LedgerError> {
    if invoice.status == InvoiceStatus::Cancelled {
        return Err(LedgerError::InvalidState(
            "milestone payments cannot be edited on a cancelled invoice".to_string(),
        ));
    }

    let index = invoice
        .milestones
        .iter()
        .position(|m| m.id == milestone_id)
        .ok_or(LedgerError::MilestoneNotFound(milestone_id))?;

    let milestone = &mut invoice.milestones[index];
    let new_status = if milestone.is_paid() {
        mark_unpaid(milestone);
        MilestonePaymentStatus::Unpaid
    } else {
        mark_paid(milestone, DateTime::now());
        MilestonePaymentStatus::Paid
    };
    recompute(invoice);
    Ok(new_status)
}

fn mark_paid(milestone: &mut Milestone, when: DateTime) {
    milestone.payment_status = MilestonePaymentStatus::Paid;
    milestone.paid_amount = milestone.amount;
    milestone.paid_date = Some(when);
}

fn mark_unpaid(milestone: &mut Milestone) {
    milestone.payment_status = MilestonePaymentStatus::Unpaid;
    milestone.paid_amount = 0;
    milestone.paid_date = None;
}

/// Update a milestone's delivery-workflow status. Pure metadata: payment
/// state and invoice totals are untouched, so this is permitted even on a
/// cancelled invoice.
pub fn update_milestone_workflow(
    invoice: &mut Invoice,
    milestone_id: Uuid,
    status: WorkflowStatus,
) -> Result<(), LedgerError> {
    let milestone = invoice
        .milestone_mut(milestone_id)
        .ok_or(LedgerError::MilestoneNotFound(milestone_id))?;

    if status == WorkflowStatus::Completed {
        if milestone.status != WorkflowStatus::Completed {
            milestone.completed_date = Some(DateTime::now());
        }
    } else {
        milestone.completed_date = None;
    }
    milestone.status = status;
    Ok(())
}

/// Administrator override: flag the invoice overdue. Re-marking an already
/// overdue invoice is a no-op.
pub fn mark_overdue(invoice: &mut Invoice) -> Result<(), LedgerError> {
    match invoice.status {
        InvoiceStatus::Cancelled => Err(LedgerError::InvalidState(
            "a cancelled invoice cannot be marked overdue".to_string(),
        )),
        InvoiceStatus::Paid => Err(LedgerError::InvalidState(
            "a fully paid invoice cannot be marked overdue".to_string(),
        )),
        _ => {
            invoice.status = InvoiceStatus::Overdue;
            Ok(())
        }
    }
}

/// Administrator override: clear the overdue flag and fall back to the
/// amount-derived status.
pub fn clear_overdue(invoice: &mut Invoice) -> Result<(), LedgerError> {
    if invoice.status != InvoiceStatus::Overdue {
        return Err(LedgerError::InvalidState(
            "invoice is not overdue".to_string(),
        ));
    }
    invoice.status = amount_status(invoice.paid_amount, invoice.total_amount);
    Ok(())
}

/// Administrator override: cancel the invoice. Cancellation is a status, not
/// a delete; payment operations are rejected until reinstated.
pub fn cancel(invoice: &mut Invoice) -> Result<(), LedgerError> {
    if invoice.status == InvoiceStatus::Cancelled {
        return Err(LedgerError::InvalidState(
            "invoice is already cancelled".to_string(),
        ));
    }
    invoice.status = InvoiceStatus::Cancelled;
    Ok(())
}

/// Administrator override: leave the cancelled state, restoring the
/// amount-derived status.
pub fn reinstate(invoice: &mut Invoice) -> Result<(), LedgerError> {
    if invoice.status != InvoiceStatus::Cancelled {
        return Err(LedgerError::InvalidState(
            "invoice is not cancelled".to_string(),
        ));
    }
    invoice.status = amount_status(invoice.paid_amount, invoice.total_amount);
    Ok(())
}
