pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware::from_fn;
use axum::{
    routing::{get, patch, post},
    Router,
};
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;

use config::Config;
use services::{BookingStore, InvoiceStore, MongoBookingStore, MongoInvoiceStore};

#[derive(Clone)]
pub struct AppState {
    pub invoices: Arc<dyn InvoiceStore>,
    pub bookings: Arc<dyn BookingStore>,
}

/// Build the HTTP router over the given state.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Invoice ledger
        .route(
            "/invoices",
            post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
        )
        .route("/invoices/stats", get(handlers::invoices::invoice_stats))
        .route(
            "/invoices/number/:invoice_number",
            get(handlers::invoices::get_invoice_by_number),
        )
        .route("/invoices/:id", get(handlers::invoices::get_invoice))
        .route(
            "/invoices/:id/payments",
            post(handlers::invoices::record_payment),
        )
        .route(
            "/invoices/:id/milestones/:milestone_id/toggle-payment",
            post(handlers::invoices::toggle_milestone_payment),
        )
        .route(
            "/invoices/:id/milestones/:milestone_id/status",
            patch(handlers::invoices::update_milestone_status),
        )
        .route(
            "/invoices/:id/overdue",
            post(handlers::invoices::mark_overdue).delete(handlers::invoices::clear_overdue),
        )
        .route("/invoices/:id/cancel", post(handlers::invoices::cancel_invoice))
        .route(
            "/invoices/:id/reinstate",
            post(handlers::invoices::reinstate_invoice),
        )
        // Bookings (admin-owned, not derived from the ledger)
        .route(
            "/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route(
            "/bookings/:id",
            get(handlers::bookings::get_booking).patch(handlers::bookings::update_booking),
        )
        .route(
            "/bookings/:id/invoice",
            post(handlers::bookings::create_booking_invoice),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to MongoDB, initialize indexes and metrics, and bind the
    /// listener (port 0 picks a random port).
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret()).await?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options)?;
        let db = client.database(&config.database.db_name);

        let invoices = MongoInvoiceStore::new(&db);
        invoices.init_indexes().await?;
        let bookings = MongoBookingStore::new(&db);
        bookings.init_indexes().await?;

        services::init_metrics();

        let state = AppState {
            invoices: Arc::new(invoices),
            bookings: Arc::new(bookings),
        };
        let router = app_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        tracing::info!("Listening on port {}", self.port);
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}
