//! Shared test harness: in-memory store implementations standing in for
//! MongoDB, plus helpers for spawning the application and driving its API.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use ledger_service::models::{Invoice, ServiceBooking};
use ledger_service::services::store::{
    BookingStore, InvoiceFilter, InvoiceStats, InvoiceStore, StoreError,
};
use ledger_service::{app_router, AppState};

#[derive(Default)]
pub struct MemoryInvoiceStore {
    invoices: Mutex<HashMap<Uuid, Invoice>>,
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn insert(&self, invoice: &Invoice) -> Result<(), StoreError> {
        self.invoices
            .lock()
            .unwrap()
            .insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Invoice>, StoreError> {
        Ok(self.invoices.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_number(&self, invoice_number: &str) -> Result<Option<Invoice>, StoreError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .values()
            .find(|i| i.invoice_number == invoice_number)
            .cloned())
    }

    async fn list(&self, filter: InvoiceFilter) -> Result<(Vec<Invoice>, u64), StoreError> {
        let guard = self.invoices.lock().unwrap();
        let mut matching: Vec<Invoice> = guard
            .values()
            .filter(|i| filter.status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn replace(&self, invoice: &Invoice, expected_version: i64) -> Result<(), StoreError> {
        let mut guard = self.invoices.lock().unwrap();
        match guard.get_mut(&invoice.id) {
            Some(existing) if existing.version == expected_version => {
                *existing = invoice.clone();
                Ok(())
            }
            _ => Err(StoreError::Conflict),
        }
    }

    async fn stats(&self) -> Result<InvoiceStats, StoreError> {
        let guard = self.invoices.lock().unwrap();
        let mut stats = InvoiceStats::default();
        for invoice in guard.values() {
            stats.absorb(invoice);
        }
        Ok(stats)
    }
}

#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: Mutex<HashMap<Uuid, ServiceBooking>>,
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert(&self, booking: &ServiceBooking) -> Result<(), StoreError> {
        self.bookings
            .lock()
            .unwrap()
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<ServiceBooking>, StoreError> {
        Ok(self.bookings.lock().unwrap().get(&id).cloned())
    }

    async fn list(
        &self,
        limit: i64,
        offset: u64,
    ) -> Result<(Vec<ServiceBooking>, u64), StoreError> {
        let guard = self.bookings.lock().unwrap();
        let mut all: Vec<ServiceBooking> = guard.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = all.len() as u64;
        let page = all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn replace(&self, booking: &ServiceBooking) -> Result<(), StoreError> {
        self.bookings
            .lock()
            .unwrap()
            .insert(booking.id, booking.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let state = AppState {
            invoices: Arc::new(MemoryInvoiceStore::default()),
            bookings: Arc::new(MemoryBookingStore::default()),
        };
        let router = app_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        let address = format!("http://127.0.0.1:{}", port);
        let client = reqwest::Client::new();

        // Wait for the server to come up.
        for _ in 0..50 {
            if client
                .get(format!("{}/health", address))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        TestApp { address, client }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post_empty(&self, path: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn patch(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .patch(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Request failed")
    }
}

/// Request body for a milestone-split invoice.
pub fn invoice_body(total: &str, milestones: &[(&str, &str)]) -> Value {
    json!({
        "client_name": "Farhan Ahmed",
        "client_email": "farhan@example.com",
        "client_company": "Acme Traders Ltd",
        "service_name": "Mobile App Development",
        "package_name": "Standard",
        "package_price": total,
        "currency": "BDT",
        "total_amount": total,
        "milestones": milestones
            .iter()
            .map(|(name, amount)| json!({ "name": name, "amount": amount }))
            .collect::<Vec<_>>(),
        "payment_methods": [{
            "label": "bKash Merchant",
            "method": "bkash",
            "account_name": "Pqrix",
            "account_number": "01700000000",
            "instructions": "Send money, keep the TrxID"
        }]
    })
}

/// Create an invoice via the API and return its JSON representation.
pub async fn create_invoice(app: &TestApp, total: &str, milestones: &[(&str, &str)]) -> Value {
    let response = app.post("/invoices", &invoice_body(total, milestones)).await;
    assert_eq!(response.status(), 201, "invoice creation should succeed");
    response.json().await.expect("invalid invoice json")
}

pub fn invoice_id(invoice: &Value) -> String {
    invoice["id"].as_str().expect("invoice id").to_string()
}

pub fn milestone_id(invoice: &Value, index: usize) -> String {
    invoice["milestones"][index]["id"]
        .as_str()
        .expect("milestone id")
        .to_string()
}

/// Record a payment; returns the raw response.
pub async fn record_payment(
    app: &TestApp,
    invoice_id: &str,
    amount: &str,
    milestone_id: Option<&str>,
) -> reqwest::Response {
    let mut body = json!({
        "amount": amount,
        "method": "bkash",
        "transaction_id": "TRX-8842",
        "verified_by": "admin@pqrix.com"
    });
    if let Some(id) = milestone_id {
        body["milestone_id"] = json!(id);
    }
    app.post(&format!("/invoices/{}/payments", invoice_id), &body)
        .await
}

/// Toggle a milestone's payment flag; returns the updated invoice.
pub async fn toggle_milestone(app: &TestApp, invoice_id: &str, milestone_id: &str) -> Value {
    let response = app
        .post_empty(&format!(
            "/invoices/{}/milestones/{}/toggle-payment",
            invoice_id, milestone_id
        ))
        .await;
    assert_eq!(response.status(), 200, "toggle should succeed");
    response.json().await.expect("invalid invoice json")
}
