//! Raw CSV ingestion and cleaning.
//!
//! The loader owns the first gate of the pipeline: column lookup by name,
//! guest-checkout and return filtering, and timestamp parsing across every
//! export format the source system produces.

use chrono::NaiveDate;
use nextbuy_core::error::PipelineError;
use nextbuy_core::loader::{load_transactions, Transaction};
use std::io::Write;
use tempfile::NamedTempFile;

// ── Helpers ──────────────────────────────────────────────────────────────────

const HEADER: &str = "Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Customer ID,Country";

fn write_csv(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp csv");
    file.write_all(content.as_bytes()).expect("write temp csv");
    file.flush().expect("flush temp csv");
    file
}

fn load(file: &NamedTempFile) -> Vec<Transaction> {
    load_transactions(file.path().to_str().expect("utf8 temp path")).expect("load csv")
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Guest checkouts (no customer id) and returns (quantity <= 0) are dropped;
/// everything else survives with its revenue derived.
#[test]
fn guest_checkouts_and_returns_are_dropped() {
    let content = format!(
        "{HEADER}\n\
         536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2009-12-01 07:45:00,2.55,13085,United Kingdom\n\
         536366,71053,WHITE METAL LANTERN,4,2009-12-01 07:50:00,3.39,,United Kingdom\n\
         C536379,21730,GLASS STAR FROSTED T-LIGHT HOLDER,-6,2009-12-01 09:41:00,4.25,14527,United Kingdom\n\
         536370,22728,ALARM CLOCK BAKELIKE GREEN,0,2009-12-01 10:00:00,3.75,12583,France\n"
    );
    let file = write_csv(&content);

    let transactions = load(&file);

    assert_eq!(
        transactions.len(),
        1,
        "only the first row should survive cleaning; got {transactions:?}"
    );
    let t = &transactions[0];
    assert_eq!(t.customer_id, "13085");
    assert_eq!(t.invoice_id, "536365");
    assert_eq!(t.quantity, 6);
    assert!(
        (t.line_revenue - 15.30).abs() < 1e-9,
        "line_revenue should be quantity * unit_price; got {}",
        t.line_revenue
    );
}

/// Columns are found by header name, so a reordered export still loads.
#[test]
fn columns_are_matched_by_name_not_position() {
    let content = "Customer ID,Price,Invoice,InvoiceDate,Quantity\n\
                   14688,1.25,537020,2010-06-15 11:20:00,12\n";
    let file = write_csv(content);

    let transactions = load(&file);

    assert_eq!(transactions.len(), 1);
    let t = &transactions[0];
    assert_eq!(t.customer_id, "14688");
    assert_eq!(t.invoice_id, "537020");
    assert_eq!(t.quantity, 12);
    assert!((t.unit_price - 1.25).abs() < 1e-9);
}

/// Product descriptions carry embedded commas in the real export. A quoted
/// field must not shift the columns to its right.
#[test]
fn quoted_descriptions_keep_their_commas() {
    let content = format!(
        "{HEADER}\n\
         536365,84029G,\"KNITTED UNION FLAG, HOT WATER BOTTLE\",3,2009-12-01 07:45:00,3.39,13085,United Kingdom\n"
    );
    let file = write_csv(&content);

    let transactions = load(&file);

    assert_eq!(transactions.len(), 1, "the quoted comma must not add a field");
    let t = &transactions[0];
    assert_eq!(t.customer_id, "13085");
    assert_eq!(t.quantity, 3);
    assert!((t.unit_price - 3.39).abs() < 1e-9);
}

/// All documented InvoiceDate shapes parse to the same instant; a date-only
/// value lands at midnight.
#[test]
fn every_documented_timestamp_format_parses() {
    let content = format!(
        "{HEADER}\n\
         A1,X,desc,1,2010-01-05 13:30:00,1.00,15000,UK\n\
         A2,X,desc,1,2010-01-05 13:30,1.00,15000,UK\n\
         A3,X,desc,1,01/05/2010 13:30,1.00,15000,UK\n\
         A4,X,desc,1,2010-01-05,1.00,15000,UK\n"
    );
    let file = write_csv(&content);

    let transactions = load(&file);
    assert_eq!(transactions.len(), 4);

    let day = NaiveDate::from_ymd_opt(2010, 1, 5).expect("valid date");
    let half_past_one = day.and_hms_opt(13, 30, 0).expect("valid time");
    let midnight = day.and_hms_opt(0, 0, 0).expect("valid time");
    assert_eq!(transactions[0].invoiced_at, half_past_one);
    assert_eq!(transactions[1].invoiced_at, half_past_one);
    assert_eq!(transactions[2].invoiced_at, half_past_one);
    assert_eq!(
        transactions[3].invoiced_at, midnight,
        "date-only values must land at midnight"
    );
}

/// A path that does not resolve is reported as such, with the path included.
#[test]
fn missing_source_file_is_reported_with_its_path() {
    let err = load_transactions("/no/such/dir/online_retail.csv")
        .expect_err("a missing file must not load");

    match err {
        PipelineError::DataSourceNotFound { path } => {
            assert!(path.contains("online_retail.csv"), "path was {path}");
        }
        other => panic!("expected DataSourceNotFound, got {other:?}"),
    }
}

/// A header without one of the five required columns is a schema error
/// naming the missing column.
#[test]
fn header_missing_a_required_column_is_a_schema_error() {
    let content = "Invoice,StockCode,Description,Quantity,InvoiceDate,Price,Country\n\
                   536365,85123A,desc,6,2009-12-01 07:45:00,2.55,United Kingdom\n";
    let file = write_csv(content);

    let err = load_transactions(file.path().to_str().expect("utf8 temp path"))
        .expect_err("a column-less header must not load");

    match err {
        PipelineError::SchemaMismatch { expected, .. } => {
            assert_eq!(expected, "Customer ID");
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
}

/// A retained row with an unparseable timestamp aborts the load and names
/// the offending line.
#[test]
fn unparseable_timestamp_names_the_line() {
    let content = format!(
        "{HEADER}\n\
         536365,85123A,desc,6,2009-12-01 07:45:00,2.55,13085,UK\n\
         536366,71053,desc,4,yesterday,3.39,13086,UK\n"
    );
    let file = write_csv(&content);

    let err = load_transactions(file.path().to_str().expect("utf8 temp path"))
        .expect_err("a bad timestamp must not load");

    match err {
        PipelineError::MalformedSource { line, reason } => {
            assert_eq!(line, 3, "the bad row is the third line of the file");
            assert!(reason.contains("InvoiceDate"), "reason was '{reason}'");
        }
        other => panic!("expected MalformedSource, got {other:?}"),
    }
}

/// Blank lines around the header and between records are ignored, and an
/// entirely empty file is a malformed source, not a panic.
#[test]
fn blank_lines_are_skipped_and_empty_files_are_rejected() {
    let content = format!(
        "\n{HEADER}\n\
         \n\
         536365,85123A,desc,6,2009-12-01 07:45:00,2.55,13085,UK\n\
         \n\
         536366,71053,desc,4,2009-12-01 07:50:00,3.39,13086,UK\n"
    );
    let file = write_csv(&content);
    assert_eq!(load(&file).len(), 2, "blank lines must not eat records");

    let empty = write_csv("");
    let err = load_transactions(empty.path().to_str().expect("utf8 temp path"))
        .expect_err("an empty file has no header");
    match err {
        PipelineError::MalformedSource { line, reason } => {
            assert_eq!(line, 0);
            assert!(reason.contains("header"), "reason was '{reason}'");
        }
        other => panic!("expected MalformedSource, got {other:?}"),
    }
}
