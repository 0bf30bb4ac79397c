//! Date resolution for heterogeneous spreadsheet cells.
//!
//! Policy, first hit wins:
//! 1. blank -> `None`;
//! 2. number -> whole days since the serial epoch 1899-12-30 (fraction truncated);
//!    date/time cells keep their time of day;
//! 3. text -> the explicit formats in [`TUP_DATE_FORMATS_EXPLICIT`];
//! 4. text -> lenient day-first formats, then RFC 3339.
//!
//! Unparseable input yields `None`; nothing here returns an error.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use letterkit_io_xlsx::EnumRawCell;

use crate::conf::{
    C_DATE_DISPLAY_FORMAT, TUP_DATE_FORMATS_EXPLICIT, TUP_DATE_FORMATS_LENIENT,
    TUP_DATETIME_FORMATS_LENIENT, TUP_SERIAL_EPOCH_YMD,
};

fn derive_serial_epoch() -> Option<NaiveDateTime> {
    let (n_year, n_month, n_day) = TUP_SERIAL_EPOCH_YMD;
    NaiveDate::from_ymd_opt(n_year, n_month, n_day).map(|date| date.and_time(NaiveTime::MIN))
}

/// `%Y` accepts short years; a two-digit year must fall through to `%y`.
fn is_full_year(date: NaiveDate) -> bool {
    date.year() >= 1000
}

/// Resolve a cell to a timestamp.
pub fn parse_date(cell: &EnumRawCell) -> Option<NaiveDateTime> {
    match cell {
        EnumRawCell::Empty | EnumRawCell::Bool(_) => None,
        EnumRawCell::Number(n) => parse_serial_days(*n),
        EnumRawCell::DateTime(n) => parse_serial_datetime(*n),
        EnumRawCell::Text(c) => parse_date_text(c),
    }
}

/// Serial number -> date at midnight; the fractional part is dropped.
pub fn parse_serial_days(n_serial: f64) -> Option<NaiveDateTime> {
    if !n_serial.is_finite() {
        return None;
    }
    let n_days = n_serial.trunc();
    if n_days.abs() > 3_000_000.0 {
        return None;
    }
    derive_serial_epoch()?.checked_add_signed(Duration::try_days(n_days as i64)?)
}

/// Serial number -> timestamp, keeping the time of day to the second.
fn parse_serial_datetime(n_serial: f64) -> Option<NaiveDateTime> {
    if !n_serial.is_finite() || n_serial.abs() > 3_000_000.0 {
        return None;
    }
    let n_secs = (n_serial * 86_400.0).round() as i64;
    derive_serial_epoch()?.checked_add_signed(Duration::try_seconds(n_secs)?)
}

/// Parse a date string: explicit formats first, then lenient day-first ones.
pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let c_text = text.trim();
    if c_text.is_empty() {
        return None;
    }

    for c_fmt in TUP_DATE_FORMATS_EXPLICIT {
        if let Ok(date) = NaiveDate::parse_from_str(c_text, c_fmt)
            && is_full_year(date)
        {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    for c_fmt in TUP_DATETIME_FORMATS_LENIENT {
        if let Ok(dt) = NaiveDateTime::parse_from_str(c_text, c_fmt)
            && is_full_year(dt.date())
        {
            return Some(dt);
        }
    }
    for c_fmt in TUP_DATE_FORMATS_LENIENT {
        if let Ok(date) = NaiveDate::parse_from_str(c_text, c_fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(c_text) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(c_text) {
        return Some(dt.naive_local());
    }
    None
}

/// `DD/MM/YYYY`, or empty for `None`.
pub fn format_display(ts: Option<NaiveDateTime>) -> String {
    match ts {
        Some(dt) => dt.format(C_DATE_DISPLAY_FORMAT).to_string(),
        None => String::new(),
    }
}

/// ISO rendering of a date/time cell, used where the cell is shown as text.
pub fn format_iso(ts: NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
