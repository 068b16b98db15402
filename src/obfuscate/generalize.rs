//! Precision-reduction transforms
//!
//! Generalization maps a value to a coarser one: an exact date to its year,
//! a coordinate pair to a region, a numeric value to a bucket. Output
//! precision never exceeds input precision. Values with no applicable
//! reduction return `None` and the caller falls back to redaction.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Generalize a value, or `None` when no reduction applies
pub(crate) fn generalize(
    value: &Value,
    bucket_width: u64,
    coordinate_decimals: u32,
) -> Option<Value> {
    match value {
        Value::Number(n) => bucket_label(n.as_f64()?, bucket_width).map(Value::String),
        Value::String(s) => generalize_str(s, coordinate_decimals),
        _ => None,
    }
}

fn generalize_str(s: &str, coordinate_decimals: u32) -> Option<Value> {
    let trimmed = s.trim();

    if let Some(year) = parse_year(trimmed) {
        return Some(Value::String(year.to_string()));
    }

    if let Some(region) = coordinate_region(trimmed, coordinate_decimals) {
        return Some(Value::String(region));
    }

    None
}

fn parse_year(s: &str) -> Option<i32> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.year());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Some(datetime.year());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime.year());
    }
    None
}

/// Reduce a `lat,lon` pair to a coarser grid cell.
///
/// Each component is rounded to at most `decimals` fractional digits, never
/// adding precision the input did not have.
fn coordinate_region(s: &str, decimals: u32) -> Option<String> {
    let (lat_str, lon_str) = s.split_once(',')?;
    let lat_str = lat_str.trim();
    let lon_str = lon_str.trim();

    let lat: f64 = lat_str.parse().ok()?;
    let lon: f64 = lon_str.parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    let lat_decimals = decimals.min(fraction_digits(lat_str));
    let lon_decimals = decimals.min(fraction_digits(lon_str));

    Some(format!(
        "{:.lat$},{:.lon$}",
        round_to(lat, lat_decimals),
        round_to(lon, lon_decimals),
        lat = lat_decimals as usize,
        lon = lon_decimals as usize,
    ))
}

fn fraction_digits(s: &str) -> u32 {
    s.split_once('.')
        .map(|(_, fraction)| fraction.len() as u32)
        .unwrap_or(0)
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Inclusive bucket label for a numeric value, e.g. 34 with width 10 → "30-39"
fn bucket_label(value: f64, width: u64) -> Option<String> {
    if width == 0 || !value.is_finite() {
        return None;
    }
    let w = width as f64;
    let lo = (value / w).floor() * w;
    let hi = lo + w - 1.0;
    Some(format!("{}-{}", lo as i64, hi as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_date_to_year() {
        assert_eq!(
            generalize(&json!("1990-04-12"), 10, 1),
            Some(json!("1990"))
        );
    }

    #[test]
    fn test_rfc3339_to_year() {
        assert_eq!(
            generalize(&json!("2024-06-01T12:30:00Z"), 10, 1),
            Some(json!("2024"))
        );
    }

    #[test]
    fn test_naive_datetime_to_year() {
        assert_eq!(
            generalize(&json!("2024-06-01T12:30:00"), 10, 1),
            Some(json!("2024"))
        );
    }

    #[test]
    fn test_coordinate_to_region() {
        assert_eq!(
            generalize(&json!("40.7128,-74.0060"), 10, 1),
            Some(json!("40.7,-74.0"))
        );
    }

    #[test]
    fn test_coordinate_precision_never_increases() {
        // input has one fractional digit; asking for two must not add any
        assert_eq!(
            generalize(&json!("40.7,-74.0"), 10, 2),
            Some(json!("40.7,-74.0"))
        );
        // integer input stays integer
        assert_eq!(generalize(&json!("40,-74"), 10, 2), Some(json!("40,-74")));
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        assert_eq!(generalize(&json!("91.0,-74.0"), 10, 1), None);
        assert_eq!(generalize(&json!("40.0,-181.0"), 10, 1), None);
    }

    #[test]
    fn test_integer_bucket() {
        assert_eq!(generalize(&json!(34), 10, 1), Some(json!("30-39")));
        assert_eq!(generalize(&json!(30), 10, 1), Some(json!("30-39")));
        assert_eq!(generalize(&json!(39), 10, 1), Some(json!("30-39")));
    }

    #[test]
    fn test_float_bucket() {
        assert_eq!(generalize(&json!(34.7), 10, 1), Some(json!("30-39")));
    }

    #[test]
    fn test_negative_bucket() {
        assert_eq!(generalize(&json!(-5), 10, 1), Some(json!("-10--1")));
    }

    #[test]
    fn test_zero_width_bucket_is_unsupported() {
        assert_eq!(generalize(&json!(34), 0, 1), None);
    }

    #[test]
    fn test_unsupported_values() {
        assert_eq!(generalize(&json!("free text"), 10, 1), None);
        assert_eq!(generalize(&json!(true), 10, 1), None);
        assert_eq!(generalize(&json!(null), 10, 1), None);
        assert_eq!(generalize(&json!(["a"]), 10, 1), None);
    }
}
