pub mod booking;
pub mod invoice;
pub mod money;

pub use booking::{BookingStatus, ServiceBooking, TimelinePhase};
pub use invoice::{
    Invoice, InvoiceStatus, Milestone, MilestonePaymentStatus, Payment, PaymentMethod,
    PaymentMethodInfo, WorkflowStatus,
};
