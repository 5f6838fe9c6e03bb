//! Spreadsheet import.
//!
//! Rows arrive already parsed, as header → cell maps. Spreadsheet exports are
//! messy: headers vary in case and spacing, dates come as serial day numbers
//! or as `DD/MM/YY` text, amounts carry digit-group separators. This module
//! turns such rows into [`Transaction`]s and counts the ones it has to drop.

use std::io;

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, Transaction, TxMeta};

/// One parsed spreadsheet row: header → cell.
pub type ImportRow = Map<String, Value>;

/// Days between the spreadsheet epoch (1899-12-30) and the Unix epoch.
const SERIAL_UNIX_OFFSET: i64 = 25_569;
const SECONDS_PER_DAY: i64 = 86_400;

const DEFAULT_TYPE_TAG: &str = "expense";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Canonical form of a header: lowercase, without whitespace, `_` or `-`.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Read a date cell. Falls back to `today` when the cell is missing or
/// cannot be read.
pub fn parse_import_date(value: Option<&Value>, today: NaiveDate) -> NaiveDate {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().and_then(from_serial),
        Some(Value::String(s)) => parse_date_text(s.trim()),
        _ => None,
    };
    parsed.unwrap_or(today)
}

fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = (serial.floor() as i64).checked_sub(SERIAL_UNIX_OFFSET)?;
    let seconds = days.checked_mul(SECONDS_PER_DAY)?;
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.date_naive())
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    // CSV cells are always text; a bare number there is still a serial.
    if let Ok(serial) = text.parse::<f64>() {
        return from_serial(serial);
    }
    if let Some(date) = parse_day_month_year(text) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// `DD/MM/YY` (two-digit years are 20yy) or `DD/MM/YYYY`.
fn parse_day_month_year(text: &str) -> Option<NaiveDate> {
    let mut parts = text.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || day.len() > 2 || month.len() > 2 {
        return None;
    }
    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year: i32 = match year.len() {
        2 => 2000 + year.parse::<i32>().ok()?,
        4 => year.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Read an amount cell. The sign is dropped: direction comes from the type
/// tag. Missing, zero and unreadable amounts are `None`.
pub fn parse_import_amount(value: Option<&Value>) -> Option<Money> {
    let amount = match value? {
        Value::String(s) => {
            let s = s.trim();
            s.parse::<Money>().ok().or_else(|| {
                s.replace(',', "")
                    .parse::<f64>()
                    .ok()
                    .and_then(Money::from_major_f64)
            })?
        }
        other => Money::from_json(other)?,
    };
    Some(amount.abs()).filter(|a| a.is_positive())
}

fn text(row: &Map<String, Value>, header: &str) -> Option<String> {
    match row.get(header)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Convert rows into transactions for `account_id`. Returns the transactions
/// and the number of rows skipped.
pub fn transactions_from_rows(
    account_id: Uuid,
    rows: &[ImportRow],
    today: NaiveDate,
) -> (Vec<Transaction>, usize) {
    let mut transactions = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for (index, raw) in rows.iter().enumerate() {
        let row: Map<String, Value> = raw
            .iter()
            .map(|(header, value)| (normalize_header(header), value.clone()))
            .collect();

        let Some(amount) = parse_import_amount(row.get("amount")) else {
            tracing::debug!("import row {index} skipped: no usable amount");
            skipped += 1;
            continue;
        };

        let kind = text(&row, "type")
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TYPE_TAG.to_string());
        let meta = TxMeta {
            category: text(&row, "category"),
            sub_category: text(&row, "subcategory"),
            merchant: text(&row, "merchant"),
            description: text(&row, "description"),
            payment_mode: None,
        };
        let date = parse_import_date(row.get("date"), today);

        match Transaction::new(account_id, &kind, amount, date, meta, None) {
            Ok(tx) => transactions.push(tx),
            Err(err) => {
                tracing::debug!("import row {index} skipped: {err}");
                skipped += 1;
            }
        }
    }

    (transactions, skipped)
}

/// Read CSV with a header line into import rows. Every cell is kept as text.
pub fn read_csv_rows<R: io::Read>(reader: R) -> ResultEngine<Vec<ImportRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|err| EngineError::InvalidImport(err.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|err| EngineError::InvalidImport(err.to_string()))?;
        let row: ImportRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        if !row.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}
