//! Raw transaction ingestion.
//!
//! Reads the invoice-level CSV export of the retail transaction log and
//! produces cleaned [`Transaction`] records:
//!   1. Rows without a customer id are dropped (guest checkouts).
//!   2. Rows with quantity <= 0 are dropped (returns and cancellations).
//!   3. InvoiceDate is parsed into a comparable timestamp.
//!   4. line_revenue = quantity * unit_price is derived per row.
//!
//! Header columns are matched by name, never by position. Columns beyond
//! the required five (StockCode, Description, Country) are ignored.
//!
//! Quoted fields may contain commas; doubled quotes unescape to one.
//! Product descriptions in the source data need both.

use crate::error::{PipelineError, PipelineResult};
use crate::types::CustomerId;
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const COL_CUSTOMER_ID: &str = "Customer ID";
pub const COL_INVOICE: &str = "Invoice";
pub const COL_QUANTITY: &str = "Quantity";
pub const COL_PRICE: &str = "Price";
pub const COL_INVOICE_DATE: &str = "InvoiceDate";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%m/%d/%Y %H:%M"];

/// One invoice line, cleaned and revenue-derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_id:  CustomerId,
    pub invoice_id:   String,
    pub quantity:     i64,
    pub unit_price:   f64,
    pub invoiced_at:  NaiveDateTime,
    pub line_revenue: f64,
}

/// Positions of the required columns in this particular file.
struct ColumnIndex {
    customer_id:  usize,
    invoice:      usize,
    quantity:     usize,
    price:        usize,
    invoice_date: usize,
}

impl ColumnIndex {
    fn from_header(fields: &[String]) -> PipelineResult<Self> {
        Ok(Self {
            customer_id:  Self::position(fields, COL_CUSTOMER_ID)?,
            invoice:      Self::position(fields, COL_INVOICE)?,
            quantity:     Self::position(fields, COL_QUANTITY)?,
            price:        Self::position(fields, COL_PRICE)?,
            invoice_date: Self::position(fields, COL_INVOICE_DATE)?,
        })
    }

    fn position(fields: &[String], name: &str) -> PipelineResult<usize> {
        fields
            .iter()
            .position(|f| f.trim() == name)
            .ok_or_else(|| PipelineError::SchemaMismatch {
                expected: name.to_string(),
                found:    fields.join(", "),
            })
    }
}

/// Load and clean every transaction in the file.
///
/// Fails with [`PipelineError::DataSourceNotFound`] if the path does not
/// resolve, and with [`PipelineError::MalformedSource`] if a retained row
/// carries an unparseable quantity, price, or timestamp. Dropped-row
/// counts are logged, not returned.
pub fn load_transactions(path: &str) -> PipelineResult<Vec<Transaction>> {
    if !Path::new(path).exists() {
        return Err(PipelineError::DataSourceNotFound {
            path: path.to_string(),
        });
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().enumerate();

    // First non-empty line is the header.
    let columns = loop {
        match lines.next() {
            Some((_, line_res)) => {
                let line = line_res?;
                if line.trim().is_empty() {
                    continue;
                }
                break ColumnIndex::from_header(&split_fields(&line))?;
            }
            None => {
                return Err(PipelineError::MalformedSource {
                    line:   0,
                    reason: "missing header row".to_string(),
                })
            }
        }
    };

    let mut transactions = Vec::new();
    let mut raw_rows = 0_usize;
    let mut dropped_no_customer = 0_usize;
    let mut dropped_bad_quantity = 0_usize;

    for (idx, line_res) in lines {
        let line = line_res?;
        if line.trim().is_empty() {
            continue;
        }
        raw_rows += 1;
        let line_no = idx + 1;
        let fields = split_fields(&line);

        let customer_id = field(&fields, columns.customer_id);
        if customer_id.is_empty() {
            dropped_no_customer += 1;
            continue;
        }

        let quantity = parse_int(field(&fields, columns.quantity), line_no, COL_QUANTITY)?;
        if quantity <= 0 {
            dropped_bad_quantity += 1;
            continue;
        }

        let raw_date = field(&fields, columns.invoice_date);
        let invoiced_at =
            parse_invoice_date(raw_date).ok_or_else(|| PipelineError::MalformedSource {
                line:   line_no,
                reason: format!("unparseable {COL_INVOICE_DATE} '{raw_date}'"),
            })?;

        let unit_price = parse_float(field(&fields, columns.price), line_no, COL_PRICE)?;

        transactions.push(Transaction {
            customer_id: customer_id.to_string(),
            invoice_id: field(&fields, columns.invoice).to_string(),
            quantity,
            unit_price,
            invoiced_at,
            line_revenue: quantity as f64 * unit_price,
        });
    }

    log::info!(
        "loader: kept {} of {raw_rows} rows ({dropped_no_customer} without customer id, \
         {dropped_bad_quantity} with non-positive quantity)",
        transactions.len()
    );
    Ok(transactions)
}

fn field<'a>(fields: &'a [String], index: usize) -> &'a str {
    fields.get(index).map(String::as_str).unwrap_or("").trim()
}

fn parse_int(raw: &str, line: usize, column: &str) -> PipelineResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| PipelineError::MalformedSource {
            line,
            reason: format!("{column} '{raw}' is not an integer"),
        })
}

fn parse_float(raw: &str, line: usize, column: &str) -> PipelineResult<f64> {
    raw.parse::<f64>()
        .map_err(|_| PipelineError::MalformedSource {
            line,
            reason: format!("{column} '{raw}' is not a number"),
        })
}

fn parse_invoice_date(raw: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(parsed);
        }
    }
    // Date-only exports come through at midnight.
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Split one delimited record into its fields, honoring quoting.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches(&['\r', '\n'][..]).chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
