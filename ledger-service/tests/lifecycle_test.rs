mod common;

use common::{create_invoice, invoice_id, milestone_id, record_payment, TestApp};
use serde_json::Value;

#[tokio::test]
async fn overdue_survives_partial_payment_and_clears_on_full_payment() {
    let app = TestApp::spawn().await;
    let invoice = create_invoice(&app, "1000.00", &[("Design", "300.00"), ("Delivery", "700.00")])
        .await;
    let id = invoice_id(&invoice);

    let response = app.post_empty(&format!("/invoices/{}/overdue", id)).await;
    assert_eq!(response.status(), 200);
    let flagged: Value = response.json().await.unwrap();
    assert_eq!(flagged["status"], "overdue");

    // a partial payment does not clear the flag
    let response = record_payment(&app, &id, "300.00", Some(&milestone_id(&invoice, 0))).await;
    let partial: Value = response.json().await.unwrap();
    assert_eq!(partial["status"], "overdue");
    assert_eq!(partial["paid_amount"], "300.00");

    // full reconciliation does
    let response = record_payment(&app, &id, "700.00", Some(&milestone_id(&invoice, 1))).await;
    let paid: Value = response.json().await.unwrap();
    assert_eq!(paid["status"], "paid");
    assert!(paid["paid_date"].is_string());
}

#[tokio::test]
async fn clearing_overdue_restores_the_amount_derived_status() {
    let app = TestApp::spawn().await;
    let invoice = create_invoice(&app, "1000.00", &[("Design", "300.00"), ("Delivery", "700.00")])
        .await;
    let id = invoice_id(&invoice);
    record_payment(&app, &id, "300.00", Some(&milestone_id(&invoice, 0))).await;
    app.post_empty(&format!("/invoices/{}/overdue", id)).await;

    let response = app.delete(&format!("/invoices/{}/overdue", id)).await;
    assert_eq!(response.status(), 200);
    let cleared: Value = response.json().await.unwrap();
    assert_eq!(cleared["status"], "partial");

    // clearing a non-overdue invoice is an invalid state transition
    let response = app.delete(&format!("/invoices/{}/overdue", id)).await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn paid_and_cancelled_invoices_cannot_be_marked_overdue() {
    let app = TestApp::spawn().await;

    let paid = create_invoice(&app, "500.00", &[("Full amount", "500.00")]).await;
    let paid_id = invoice_id(&paid);
    record_payment(&app, &paid_id, "500.00", None).await;
    let response = app.post_empty(&format!("/invoices/{}/overdue", paid_id)).await;
    assert_eq!(response.status(), 409);

    let cancelled = create_invoice(&app, "500.00", &[("Full amount", "500.00")]).await;
    let cancelled_id = invoice_id(&cancelled);
    app.post_empty(&format!("/invoices/{}/cancel", cancelled_id))
        .await;
    let response = app
        .post_empty(&format!("/invoices/{}/overdue", cancelled_id))
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn cancel_and_reinstate_round_trip() {
    let app = TestApp::spawn().await;
    let invoice = create_invoice(&app, "1000.00", &[("Design", "300.00"), ("Delivery", "700.00")])
        .await;
    let id = invoice_id(&invoice);
    record_payment(&app, &id, "300.00", Some(&milestone_id(&invoice, 0))).await;

    let response = app.post_empty(&format!("/invoices/{}/cancel", id)).await;
    assert_eq!(response.status(), 200);
    let cancelled: Value = response.json().await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");
    // cancellation is a status, not a delete: history stays
    assert_eq!(cancelled["payments"].as_array().unwrap().len(), 1);

    let response = app.post_empty(&format!("/invoices/{}/cancel", id)).await;
    assert_eq!(response.status(), 409);

    let response = app.post_empty(&format!("/invoices/{}/reinstate", id)).await;
    assert_eq!(response.status(), 200);
    let reinstated: Value = response.json().await.unwrap();
    assert_eq!(reinstated["status"], "partial");

    let response = app.post_empty(&format!("/invoices/{}/reinstate", id)).await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn status_overrides_on_an_unknown_invoice_return_not_found() {
    let app = TestApp::spawn().await;
    let bogus = uuid::Uuid::new_v4();

    for path in [
        format!("/invoices/{}/overdue", bogus),
        format!("/invoices/{}/cancel", bogus),
        format!("/invoices/{}/reinstate", bogus),
    ] {
        let response = app.post_empty(&path).await;
        assert_eq!(response.status(), 404, "POST {}", path);
    }
}
