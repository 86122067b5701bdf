pub mod ledger;
pub mod metrics;
pub mod store;

pub use metrics::{get_metrics, init_metrics};
pub use store::{
    BookingStore, InvoiceFilter, InvoiceStats, InvoiceStore, MongoBookingStore, MongoInvoiceStore,
    StoreError,
};
