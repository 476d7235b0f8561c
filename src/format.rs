//! Number and date formatting shared by the clients

use chrono::{DateTime, NaiveDate, TimeZone};

pub const DATE_FORMAT: &str = "%d.%m.%Y";
pub const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Shortest decimal form, but always with a fractional part (`2.0`, `212.49`).
pub fn decimal(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

pub fn date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

pub fn date_time<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format(DATE_TIME_FORMAT).to_string()
}
