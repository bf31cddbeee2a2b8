use rfm_core::{
    config::{AnalysisConfig, IngestSettings},
    ingest::{load_raw_records, process_records},
    pipeline::AnalysisPipeline,
    report::LogReport,
    store::AnalysisStore,
    types::CustomerId,
    AnalysisError,
};
use std::io::Write;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A raw export row in the spreadsheet layout.
fn row(invoice: &str, code: &str, qty: i64, date: &str, price: f64, customer: Option<f64>) -> serde_json::Value {
    serde_json::json!({
        "InvoiceNo": invoice,
        "StockCode": code,
        "Description": "LUNCH BAG RED RETROSPOT",
        "Quantity": qty,
        "InvoiceDate": date,
        "UnitPrice": price,
        "CustomerID": customer,
        "Country": "United Kingdom",
    })
}

/// Six customers, one cancelled invoice, one anonymous row and one
/// zero-price adjustment.
fn raw_export() -> serde_json::Value {
    let mut rows = Vec::new();
    for c in 0..6 {
        let customer = 12340.0 + c as f64;
        for i in 0..=c {
            rows.push(row(
                &format!("5{c}{i}00"),
                &format!("2072{c}"),
                2 + i,
                &format!("2011-0{}-1{} 09:3{c}:00", 1 + c % 3, i),
                1.25 * (c + 1) as f64,
                Some(customer),
            ));
        }
    }
    rows.push(row("C59999", "20725", -2, "2011-03-02 10:00:00", 1.25, Some(12340.0)));
    rows.push(row("560000", "22423", 1, "2011-03-02 10:00:00", 12.75, None));
    rows.push(row("560001", "M", 1, "2011-03-02 10:00:00", 0.0, Some(12341.0)));
    serde_json::Value::Array(rows)
}

fn write_export(value: &serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{value}").unwrap();
    file
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Raw export splits into sales, returns and a calendar covering the sales range.
#[test]
fn raw_export_splits_and_validates() {
    init_logging();
    let file = write_export(&raw_export());
    let raw = load_raw_records(file.path().to_str().unwrap()).unwrap();
    assert_eq!(raw.len(), 24);

    let output = process_records(&raw, &IngestSettings::default()).unwrap();
    assert_eq!(output.sales.len(), 21);
    assert_eq!(output.returns.len(), 1);
    assert_eq!(output.returns[0].customer_id, Some(CustomerId(12340)));
    assert!(output.sales.iter().all(|t| t.quantity > 0 && t.unit_price > 0.0));
    assert!(output
        .sales
        .iter()
        .all(|t| (t.total_revenue - t.quantity as f64 * t.unit_price).abs() < 1e-9));

    let first = output.calendar.first().unwrap().date;
    let last = output.calendar.last().unwrap().date;
    assert_eq!(first, output.sales.iter().map(|t| t.invoice_date).min().unwrap());
    assert_eq!(last, output.sales.iter().map(|t| t.invoice_date).max().unwrap());
}

/// Ingested data feeds straight into an analysis run.
#[test]
fn ingested_store_supports_a_full_run() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("retail.db");
    let db = db.to_str().unwrap();

    let file = write_export(&raw_export());
    let raw = load_raw_records(file.path().to_str().unwrap()).unwrap();
    let output = process_records(&raw, &IngestSettings::default()).unwrap();

    let store = AnalysisStore::open(db).unwrap();
    store.migrate().unwrap();
    store.replace_sales(&output.sales).unwrap();
    store.replace_returns(&output.returns).unwrap();
    store.replace_calendar(&output.calendar).unwrap();

    let outcome = AnalysisPipeline::new(AnalysisConfig::default(), &store)
        .run(&mut LogReport)
        .unwrap();
    assert_eq!(outcome.rfm.len(), 6);
    assert!(outcome.returns.returns_available);
    assert_eq!(outcome.returns.return_records, 1);
}

/// Bad rows are all reported together.
#[test]
fn every_bad_row_is_reported() {
    init_logging();
    let export = serde_json::json!([
        row("536365", "85123A", 6, "2010-12-01 08:26:00", 2.55, Some(17850.0)),
        row("536366", "71053", 6, "not a date", 3.39, Some(17850.0)),
        row("536367", "84406B", 8, "2010-12-01 08:34:00", 2.75, Some(13047.5)),
    ]);
    let file = write_export(&export);
    let raw = load_raw_records(file.path().to_str().unwrap()).unwrap();

    match process_records(&raw, &IngestSettings::default()) {
        Err(AnalysisError::SchemaViolation { violations, .. }) => {
            let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
            assert_eq!(fields, ["InvoiceDate", "CustomerID"]);
            assert_eq!(violations[0].row, 1);
            assert_eq!(violations[1].invoice_no, "536367");
        }
        other => panic!("expected schema violations, got {other:?}"),
    }
}

#[test]
fn missing_export_is_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("online_retail.json");
    assert!(matches!(
        load_raw_records(path.to_str().unwrap()),
        Err(AnalysisError::MissingInput { .. })
    ));
}
