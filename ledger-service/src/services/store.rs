//! Persistence for the ledger: trait-based document stores with MongoDB
//! implementations.
//!
//! Every mutating operation is one `find` + one versioned `replace` against a
//! single document; the replace filter carries the version the caller loaded,
//! so a stale write surfaces as [`StoreError::Conflict`] and the caller
//! refetches and retries.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{bson::doc, Collection, Database, IndexModel};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::{Invoice, InvoiceStatus, ServiceBooking};
use crate::services::metrics::DB_QUERY_DURATION;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document version conflict")]
    Conflict,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Database(anyhow::Error::new(err))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AppError::Conflict(anyhow::anyhow!(
                "invoice was modified concurrently; refetch and retry"
            )),
            StoreError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub limit: i64,
    pub offset: u64,
}

impl Default for InvoiceFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Minor-unit money totals per currency tag.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CurrencyTotals {
    pub outstanding: i64,
    pub collected: i64,
}

/// Dashboard aggregates over the invoice collection.
#[derive(Debug, Clone, Default)]
pub struct InvoiceStats {
    pub total: u64,
    pub unpaid: u64,
    pub partial: u64,
    pub paid: u64,
    pub overdue: u64,
    pub cancelled: u64,
    pub by_currency: BTreeMap<String, CurrencyTotals>,
}

impl InvoiceStats {
    /// Fold one invoice into the aggregates.
    pub fn absorb(&mut self, invoice: &Invoice) {
        self.total += 1;
        match invoice.status {
            InvoiceStatus::Unpaid => self.unpaid += 1,
            InvoiceStatus::Partial => self.partial += 1,
            InvoiceStatus::Paid => self.paid += 1,
            InvoiceStatus::Overdue => self.overdue += 1,
            InvoiceStatus::Cancelled => self.cancelled += 1,
        }
        let totals = self.by_currency.entry(invoice.currency.clone()).or_default();
        totals.collected += invoice.paid_amount;
        // a cancelled invoice's balance is not collectable
        if invoice.status != InvoiceStatus::Cancelled {
            totals.outstanding += invoice.remaining_amount;
        }
    }
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert(&self, invoice: &Invoice) -> Result<(), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Invoice>, StoreError>;

    async fn find_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, StoreError>;

    /// Returns the matching page plus the total match count.
    async fn list(&self, filter: InvoiceFilter) -> Result<(Vec<Invoice>, u64), StoreError>;

    /// Full-document replace guarded by the version the caller loaded.
    async fn replace(&self, invoice: &Invoice, expected_version: i64) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<InvoiceStats, StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &ServiceBooking) -> Result<(), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<ServiceBooking>, StoreError>;

    async fn list(&self, limit: i64, offset: u64)
        -> Result<(Vec<ServiceBooking>, u64), StoreError>;

    /// Last-write-wins replace; bookings carry no version counter.
    async fn replace(&self, booking: &ServiceBooking) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct MongoInvoiceStore {
    collection: Collection<Invoice>,
}

impl MongoInvoiceStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("invoices"),
        }
    }

    /// Initialize collection indexes.
    pub async fn init_indexes(&self) -> Result<(), StoreError> {
        let number_index = IndexModel::builder()
            .keys(doc! { "invoice_number": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_number_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_status_idx".to_string())
                    .build(),
            )
            .build();

        let booking_index = IndexModel::builder()
            .keys(doc! { "booking_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_booking_idx".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([number_index, status_index, booking_index], None)
            .await?;

        tracing::info!("Invoice collection indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for MongoInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let start = Instant::now();
        self.collection.insert_one(invoice, None).await?;
        DB_QUERY_DURATION
            .with_label_values(&["invoice_insert"])
            .observe(start.elapsed().as_secs_f64());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Invoice>, StoreError> {
        let start = Instant::now();
        let invoice = self
            .collection
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        DB_QUERY_DURATION
            .with_label_values(&["invoice_find"])
            .observe(start.elapsed().as_secs_f64());
        Ok(invoice)
    }

    async fn find_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, StoreError> {
        let invoice = self
            .collection
            .find_one(doc! { "invoice_number": invoice_number }, None)
            .await?;
        Ok(invoice)
    }

    async fn list(&self, filter: InvoiceFilter) -> Result<(Vec<Invoice>, u64), StoreError> {
        let mut query = doc! {};
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }

        let total_count = self.collection.count_documents(query.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(filter.offset)
            .limit(filter.limit)
            .build();

        let cursor = self.collection.find(query, Some(options)).await?;
        let invoices: Vec<Invoice> = cursor.try_collect().await?;

        Ok((invoices, total_count))
    }

    async fn replace(&self, invoice: &Invoice, expected_version: i64) -> Result<(), StoreError> {
        let start = Instant::now();
        let filter = doc! {
            "_id": invoice.id.to_string(),
            "version": expected_version,
        };
        let result = self.collection.replace_one(filter, invoice, None).await?;
        DB_QUERY_DURATION
            .with_label_values(&["invoice_replace"])
            .observe(start.elapsed().as_secs_f64());

        // The caller loaded the document, so a zero match means the version
        // moved underneath it.
        if result.matched_count == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<InvoiceStats, StoreError> {
        let mut stats = InvoiceStats::default();
        let mut cursor = self.collection.find(doc! {}, None).await?;
        while let Some(invoice) = cursor.try_next().await? {
            stats.absorb(&invoice);
        }
        Ok(stats)
    }
}

#[derive(Clone)]
pub struct MongoBookingStore {
    collection: Collection<ServiceBooking>,
}

impl MongoBookingStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("bookings"),
        }
    }

    pub async fn init_indexes(&self) -> Result<(), StoreError> {
        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("booking_status_idx".to_string())
                    .build(),
            )
            .build();

        self.collection.create_indexes([status_index], None).await?;

        tracing::info!("Booking collection indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MongoBookingStore {
    async fn insert(&self, booking: &ServiceBooking) -> Result<(), StoreError> {
        self.collection.insert_one(booking, None).await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<ServiceBooking>, StoreError> {
        let booking = self
            .collection
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(booking)
    }

    async fn list(
        &self,
        limit: i64,
        offset: u64,
    ) -> Result<(Vec<ServiceBooking>, u64), StoreError> {
        let total_count = self.collection.count_documents(doc! {}, None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(offset)
            .limit(limit)
            .build();

        let cursor = self.collection.find(doc! {}, Some(options)).await?;
        let bookings: Vec<ServiceBooking> = cursor.try_collect().await?;

        Ok((bookings, total_count))
    }

    async fn replace(&self, booking: &ServiceBooking) -> Result<(), StoreError> {
        self.collection
            .replace_one(doc! { "_id": booking.id.to_string() }, booking, None)
            .await?;
        Ok(())
    }
}
