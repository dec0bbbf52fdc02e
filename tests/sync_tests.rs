mod common;

use common::{credit_note, dec, invoice, payment, FakeSource};
use customer_statement::error::SyncError;
use customer_statement::models::{EntryDetail, LineItem, RecordDetail, RecordType};
use customer_statement::service::{ExportSource, OverlayEdit, StatementService, Workspace};
use customer_statement::AmountFormat;
use std::sync::Arc;

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn service(source: Arc<FakeSource>, workspace: Arc<Workspace>, concurrency: usize) -> StatementService {
    StatementService::new(source, workspace, AmountFormat::default(), concurrency)
}

#[tokio::test]
async fn fetches_run_in_order_per_customer() {
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "0")
            .with_customer("c2", "Globex", "0")
            .with_records("c1", RecordType::Invoice, vec![invoice("i1", "2024-01-01", "10")])
            .with_records("c1", RecordType::CreditNote, vec![credit_note("cn1", "2024-01-02", "5")])
            .with_records("c2", RecordType::Payment, vec![payment("p1", "2024-01-01", "3", &[])]),
    );
    let workspace = Arc::new(Workspace::new(Some("org".into())));
    let service = service(source.clone(), workspace, 1);

    let report = service.sync(&ids(&["c1", "c2"])).await.unwrap();
    assert_eq!(report.customers.len(), 2);
    assert_eq!(report.customers[0].records, 2);
    assert_eq!(report.customers[0].details_fetched, 2);
    assert!(!report.superseded);

    assert_eq!(
        source.calls(),
        vec![
            "customer:c1",
            "invoices:c1",
            "customerpayments:c1",
            "creditnotes:c1",
            "detail:i1",
            "detail:cn1",
            "customer:c2",
            "invoices:c2",
            "customerpayments:c2",
            "creditnotes:c2",
        ]
    );
}

#[tokio::test]
async fn failed_module_is_left_empty_and_others_continue() {
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "100")
            .with_records("c1", RecordType::Invoice, vec![invoice("i1", "2024-01-01", "10")])
            .with_records("c1", RecordType::Payment, vec![payment("p1", "2024-01-02", "40", &[])])
            .with_records("c1", RecordType::CreditNote, vec![credit_note("cn1", "2024-01-03", "5")])
            .failing("c1", RecordType::Payment)
            .failing_detail("cn1"),
    );
    let workspace = Arc::new(Workspace::new(Some("org".into())));
    let service = service(source, workspace, 1);

    let report = service.sync(&ids(&["c1", "missing"])).await.unwrap();
    let outcome = &report.customers[0];
    assert_eq!(outcome.failed_modules, vec![RecordType::Payment]);
    assert_eq!(outcome.detail_failures, 1);
    assert!(report.customers[1].skipped);

    let statement = service.statement("c1").await.unwrap();
    assert_eq!(statement.entries.len(), 2);
    assert_eq!(statement.balance_due, dec("105"));
    assert_eq!(statement.entries[1].detail, EntryDetail::None);
    assert!(service.statement("missing").await.is_none());
}

#[tokio::test]
async fn session_failure_aborts_the_sync() {
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "0")
            .with_customer("c2", "Globex", "0")
            .session_failure("c1", RecordType::Payment),
    );
    let workspace = Arc::new(Workspace::new(Some("org".into())));
    let service = service(source.clone(), workspace, 1);

    let err = service.sync(&ids(&["c1", "c2"])).await.unwrap_err();
    match err {
        SyncError::Session { customer_id, record_type, status } => {
            assert_eq!(customer_id, "c1");
            assert_eq!(record_type, Some(RecordType::Payment));
            assert_eq!(status, 401);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!source.calls().contains(&"customer:c2".to_string()));
}

#[tokio::test]
async fn sync_without_organization_is_rejected() {
    let workspace = Arc::new(Workspace::new(None));
    let service = service(Arc::new(FakeSource::new()), workspace, 1);
    assert!(matches!(
        service.sync(&ids(&["c1"])).await,
        Err(SyncError::NoOrganization)
    ));
}

#[tokio::test]
async fn detail_is_fetched_once_per_organization() {
    let detail = RecordDetail {
        line_items: vec![LineItem {
            name: "Support".into(),
            quantity: dec("1"),
            rate: dec("10"),
            line_total: dec("10"),
        }],
    };
    let shared = invoice("shared", "2024-01-01", "10");
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "0")
            .with_customer("c2", "Globex", "0")
            .with_records("c1", RecordType::Invoice, vec![shared.clone()])
            .with_records("c2", RecordType::Invoice, vec![shared])
            .with_detail(RecordType::Invoice, "shared", detail.clone()),
    );
    let workspace = Arc::new(Workspace::new(Some("org".into())));
    let service = service(source.clone(), workspace, 1);

    service.sync(&ids(&["c1", "c2"])).await.unwrap();
    service.sync(&ids(&["c1"])).await.unwrap();

    let detail_calls = source.calls().iter().filter(|c| c.starts_with("detail:")).count();
    assert_eq!(detail_calls, 1);
    let statement = service.statement("c2").await.unwrap();
    assert_eq!(statement.entries[0].detail, EntryDetail::LineItems(detail.line_items));
}

#[tokio::test]
async fn organization_switch_discards_in_flight_results() {
    let workspace = Arc::new(Workspace::new(Some("org-a".into())));
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "0")
            .with_records("c1", RecordType::Invoice, vec![invoice("i1", "2024-01-01", "10")])
            .switch_during(workspace.clone(), "c1", RecordType::Payment, "org-b"),
    );
    let service = service(source.clone(), workspace.clone(), 1);

    let report = service.sync(&ids(&["c1"])).await.unwrap();
    assert!(report.superseded);
    assert_eq!(report.org_id, "org-a");

    let current = workspace.current().await;
    assert_eq!(current.org_id.as_deref(), Some("org-b"));
    assert!(service.statement("c1").await.is_none());
    assert!(current.details.is_empty());
    assert!(!source.calls().contains(&"creditnotes:c1".to_string()));
}

#[tokio::test]
async fn bounded_concurrency_keeps_report_order() {
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "1")
            .with_customer("c2", "Globex", "2")
            .with_customer("c3", "Initech", "3"),
    );
    let workspace = Arc::new(Workspace::new(Some("org".into())));
    let service = service(source, workspace, 3);

    let report = service.sync(&ids(&["c3", "c1", "c2"])).await.unwrap();
    let order: Vec<&str> = report.customers.iter().map(|c| c.customer_id.as_str()).collect();
    assert_eq!(order, vec!["c3", "c1", "c2"]);
    assert_eq!(service.customer_ids().await, ids(&["c1", "c2", "c3"]));
}

#[tokio::test]
async fn resync_rebuilds_the_overlay_from_fresh_records() {
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "0")
            .with_records("c1", RecordType::Invoice, vec![invoice("i1", "2024-01-01", "500")]),
    );
    let workspace = Arc::new(Workspace::new(Some("org".into())));
    let service = service(source.clone(), workspace, 1);

    service.sync(&ids(&["c1"])).await.unwrap();
    let edit = OverlayEdit::SetDebit { index: 0, text: "450".into() };
    let (edited, _) = service.apply_edits("c1", &[edit]).await.unwrap();
    assert_eq!(edited.rows[0].balance_text, "450.00");

    source.set_records(
        "c1",
        RecordType::Invoice,
        vec![invoice("i1", "2024-01-01", "500"), invoice("i2", "2024-01-05", "200")],
    );
    service.sync(&ids(&["c1"])).await.unwrap();

    let overlay = service.overlay("c1").await.unwrap();
    assert_eq!(overlay.rows.len(), 2);
    assert_eq!(overlay.rows[0].debit_text, "500.00");
    assert_eq!(overlay.rows[1].balance_text, "700.00");
    let rows = service.export_rows("c1", ExportSource::Edited).await.unwrap();
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn customer_that_cannot_be_refetched_is_cleared() {
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "0")
            .with_records("c1", RecordType::Invoice, vec![invoice("i1", "2024-01-01", "500")]),
    );
    let workspace = Arc::new(Workspace::new(Some("org".into())));
    let service = service(source.clone(), workspace, 1);

    service.sync(&ids(&["c1"])).await.unwrap();
    assert!(service.statement("c1").await.is_some());
    assert!(service.overlay("c1").await.is_some());

    source.remove_customer("c1");
    let report = service.sync(&ids(&["c1"])).await.unwrap();
    assert!(report.customers[0].skipped);
    assert!(service.statement("c1").await.is_none());
    assert!(service.overlay("c1").await.is_none());
    assert!(service.customer_ids().await.is_empty());
}

#[tokio::test]
async fn concurrent_edits_on_one_customer_are_all_kept() {
    let records = (1..=4)
        .map(|i| invoice(&format!("i{i}"), &format!("2024-01-0{i}"), "10"))
        .collect();
    let source = Arc::new(
        FakeSource::new()
            .with_customer("c1", "Acme", "0")
            .with_records("c1", RecordType::Invoice, records),
    );
    let workspace = Arc::new(Workspace::new(Some("org".into())));
    let service = Arc::new(service(source, workspace, 1));
    service.sync(&ids(&["c1"])).await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let service = service.clone();
            tokio::spawn(async move {
                let edit = OverlayEdit::SetCredit { index, text: "1.00".into() };
                service.apply_edits("c1", &[edit]).await.unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let overlay = service.overlay("c1").await.unwrap();
    assert!(overlay.rows.iter().all(|row| row.credit_text == "1.00"));
    assert_eq!(overlay.rows[3].balance_text, "36.00");
}
