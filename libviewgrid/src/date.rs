//! Decoding of the backend's numeric date values.
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedDate {
    /// The sentinel value, rendered as an empty cell.
    NoDate,
    Date(NaiveDateTime),
    /// Not a date in the expected encoding.
    Invalid,
}

/// Collaborator interface turning an encoded date cell into a point in time.
pub trait DateDecoder: Send + Sync {
    fn decode(&self, raw: &Value) -> DecodedDate;
}

/// Decodes `YYYYDDD[.fraction]`: year times 1000 plus day of year, with an optional
/// fraction of a day carrying the time of day. `2024015.5` is 2024-01-15 12:00.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrdinalDateDecoder {
    pub no_date_sentinel: f64,
}

impl Default for OrdinalDateDecoder {
    fn default() -> Self {
        Self {
            no_date_sentinel: 0.0,
        }
    }
}

impl OrdinalDateDecoder {
    /// Inverse of [`DateDecoder::decode`] at day resolution.
    #[must_use]
    pub fn encode(date: NaiveDate) -> f64 {
        use chrono::Datelike;
        f64::from(date.year() * 1000) + f64::from(date.ordinal())
    }
}

fn numeric(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

impl DateDecoder for OrdinalDateDecoder {
    fn decode(&self, raw: &Value) -> DecodedDate {
        let Some(encoded) = numeric(raw).filter(|v| v.is_finite()) else {
            return DecodedDate::Invalid;
        };
        if encoded == self.no_date_sentinel {
            return DecodedDate::NoDate;
        }
        if encoded < 0.0 {
            return DecodedDate::Invalid;
        }

        let whole = encoded.trunc() as i64;
        let Ok(year) = i32::try_from(whole / 1000) else {
            return DecodedDate::Invalid;
        };
        let ordinal = (whole % 1000) as u32;
        let Some(date) = NaiveDate::from_yo_opt(year, ordinal) else {
            return DecodedDate::Invalid;
        };

        let seconds = ((encoded.fract() * SECONDS_PER_DAY).round() as u32).min(86_399);
        let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default();
        DecodedDate::Date(date.and_time(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn decodes_day_of_year() {
        let decoder = OrdinalDateDecoder::default();
        assert_eq!(
            decoder.decode(&json!(2024015)),
            DecodedDate::Date(date(2024, 1, 15).and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            decoder.decode(&json!("2024060")),
            DecodedDate::Date(date(2024, 2, 29).and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn fraction_is_time_of_day() {
        let decoder = OrdinalDateDecoder::default();
        assert_eq!(
            decoder.decode(&json!(2024015.75)),
            DecodedDate::Date(date(2024, 1, 15).and_hms_opt(18, 0, 0).unwrap())
        );
    }

    #[test]
    fn sentinel_and_garbage() {
        let decoder = OrdinalDateDecoder::default();
        assert_eq!(decoder.decode(&json!(0)), DecodedDate::NoDate);
        assert_eq!(decoder.decode(&json!(2023366)), DecodedDate::Invalid);
        assert_eq!(decoder.decode(&json!("soon")), DecodedDate::Invalid);
        assert_eq!(decoder.decode(&json!(-5)), DecodedDate::Invalid);
        assert_eq!(decoder.decode(&json!(true)), DecodedDate::Invalid);
    }

    #[test]
    fn encode_matches_decode() {
        assert_eq!(OrdinalDateDecoder::encode(date(2024, 1, 15)), 2024015.0);
    }
}
