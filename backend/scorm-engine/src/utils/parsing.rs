//! Best-effort conversion of raw runtime values.
//!
//! SCO output is unreliable external input: every parser here falls back to the
//! caller's default instead of failing. `parse_positive` is the exception and
//! reports negative values as a [`ValueError`].

use chrono::Duration;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::error::ValueError;
use crate::models::ScormValue;

lazy_static! {
    // [D day[s], ][[HH:]MM:]SS[.ffffff]
    static ref STANDARD_DURATION_REGEX: Regex = Regex::new(
        r"^(?:(?P<days>-?\d+) (?:days?,? )?)?(?P<sign>-?)(?:(?:(?P<hours>\d+):)?(?P<minutes>\d+):)?(?P<seconds>\d+)(?:[.,](?P<fraction>\d{1,6})\d{0,6})?$"
    )
    .unwrap();

    // [+-]P[nD][T[nH][nM][nS]]
    static ref ISO8601_DURATION_REGEX: Regex = Regex::new(
        r"^(?P<sign>[-+]?)P(?:(?P<days>\d+(?:[.,]\d+)?)D)?(?:T(?:(?P<hours>\d+(?:[.,]\d+)?)H)?(?:(?P<minutes>\d+(?:[.,]\d+)?)M)?(?:(?P<seconds>\d+(?:[.,]\d+)?)S)?)?$"
    )
    .unwrap();
}

const MICROS_PER_SECOND: f64 = 1_000_000.0;

pub fn parse_float(value: Option<&ScormValue>, default: Option<f64>) -> Option<f64> {
    match value {
        Some(ScormValue::Number(number)) => Some(*number),
        Some(ScormValue::Text(text)) => text.trim().parse::<f64>().ok().or(default),
        None => default,
    }
}

/// Like [`parse_float`], but a present negative value is an error rather than
/// something to default away.
pub fn parse_positive(
    value: Option<&ScormValue>,
    default: Option<f64>,
    field: &str,
) -> Result<Option<f64>, ValueError> {
    ensure_positive(field, parse_float(value, None)).map(|parsed| parsed.or(default))
}

pub fn ensure_positive(field: &str, parsed: Option<f64>) -> Result<Option<f64>, ValueError> {
    match parsed {
        Some(value) if value < 0.0 => Err(ValueError::Negative {
            field: field.to_string(),
            value,
        }),
        other => Ok(other),
    }
}

/// Accepts `HH:MM:SS[.ffffff]` (SCORM 1.2 `CMITimespan`) and ISO-8601
/// `PT#H#M#S` (SCORM 2004 `timeinterval`). Bare numbers read as seconds.
pub fn parse_duration(value: Option<&ScormValue>, default: Option<Duration>) -> Option<Duration> {
    let Some(value) = value else {
        return default;
    };
    let text = value.as_text();
    let text = text.trim();

    parse_standard_duration(text)
        .or_else(|| parse_iso8601_duration(text))
        .or(default)
}

pub fn duration_seconds(duration: &Duration) -> f64 {
    match duration.num_microseconds() {
        Some(micros) => micros as f64 / MICROS_PER_SECOND,
        None => duration.num_milliseconds() as f64 / 1000.0,
    }
}

/// Shorthand for the reducers: duration parse straight to seconds.
pub fn parse_duration_seconds(value: Option<&ScormValue>) -> Option<f64> {
    parse_duration(value, None).map(|duration| duration_seconds(&duration))
}

fn parse_standard_duration(text: &str) -> Option<Duration> {
    let caps = STANDARD_DURATION_REGEX.captures(text)?;

    let days = integer_group(&caps, "days")?;
    let hours = integer_group(&caps, "hours")?;
    let minutes = integer_group(&caps, "minutes")?;
    let seconds = integer_group(&caps, "seconds")?;
    let micros = match caps.name("fraction") {
        Some(fraction) => format!("{:0<6}", fraction.as_str()).parse::<i64>().ok()?,
        None => 0,
    };

    let sign = if caps.name("sign").map(|m| m.as_str()) == Some("-") {
        -1
    } else {
        1
    };

    let time_micros = hours
        .checked_mul(3_600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?
        .checked_mul(1_000_000)?
        .checked_add(micros)?;

    Duration::try_days(days)?.checked_add(&Duration::microseconds(sign * time_micros))
}

fn parse_iso8601_duration(text: &str) -> Option<Duration> {
    let caps = ISO8601_DURATION_REGEX.captures(text)?;

    let components = ["days", "hours", "minutes", "seconds"];
    if components.iter().all(|name| caps.name(name).is_none()) {
        return None;
    }

    let days = decimal_group(&caps, "days")?;
    let hours = decimal_group(&caps, "hours")?;
    let minutes = decimal_group(&caps, "minutes")?;
    let seconds = decimal_group(&caps, "seconds")?;

    let sign = if caps.name("sign").map(|m| m.as_str()) == Some("-") {
        -1.0
    } else {
        1.0
    };

    let total_seconds = days * 86_400.0 + hours * 3_600.0 + minutes * 60.0 + seconds;
    let total_micros = (sign * total_seconds * MICROS_PER_SECOND).round();
    if !total_micros.is_finite() || total_micros.abs() >= i64::MAX as f64 {
        return None;
    }

    Some(Duration::microseconds(total_micros as i64))
}

fn integer_group(caps: &Captures<'_>, name: &str) -> Option<i64> {
    match caps.name(name) {
        Some(m) => m.as_str().parse::<i64>().ok(),
        None => Some(0),
    }
}

fn decimal_group(caps: &Captures<'_>, name: &str) -> Option<f64> {
    match caps.name(name) {
        Some(m) => m.as_str().replace(',', ".").parse::<f64>().ok(),
        None => Some(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> ScormValue {
        ScormValue::Text(value.to_string())
    }

    #[test]
    fn parse_float_accepts_strings_and_numbers() {
        assert_eq!(parse_float(Some(&text("0.5")), None), Some(0.5));
        assert_eq!(parse_float(Some(&text(" 85 ")), None), Some(85.0));
        assert_eq!(parse_float(Some(&ScormValue::Number(75.0)), None), Some(75.0));
    }

    #[test]
    fn parse_float_falls_back_to_default() {
        assert_eq!(parse_float(Some(&text("invalid")), None), None);
        assert_eq!(parse_float(Some(&text("")), Some(1.0)), Some(1.0));
        assert_eq!(parse_float(None, Some(2.0)), Some(2.0));
    }

    #[test]
    fn parse_positive_rejects_negative_values() {
        assert_eq!(parse_positive(Some(&text("1.5")), None, "weighting"), Ok(Some(1.5)));
        assert_eq!(parse_positive(Some(&text("abc")), Some(0.0), "weighting"), Ok(Some(0.0)));
        assert_eq!(parse_positive(None, None, "weighting"), Ok(None));
        assert_eq!(
            parse_positive(Some(&text("-2")), None, "weighting"),
            Err(ValueError::Negative {
                field: "weighting".to_string(),
                value: -2.0
            })
        );
    }

    #[test]
    fn parses_clock_durations() {
        assert_eq!(parse_duration_seconds(Some(&text("01:00:00"))), Some(3600.0));
        assert_eq!(parse_duration_seconds(Some(&text("0000:45:00.00"))), Some(2700.0));
        assert_eq!(parse_duration_seconds(Some(&text("00:00:01.5"))), Some(1.5));
        assert_eq!(parse_duration_seconds(Some(&text("12:30"))), Some(750.0));
        assert_eq!(parse_duration_seconds(Some(&text("1 day, 00:00:10"))), Some(86_410.0));
    }

    #[test]
    fn parses_iso8601_durations() {
        assert_eq!(parse_duration_seconds(Some(&text("PT1H0M0S"))), Some(3600.0));
        assert_eq!(parse_duration_seconds(Some(&text("PT0H45M0S"))), Some(2700.0));
        assert_eq!(parse_duration_seconds(Some(&text("PT15M"))), Some(900.0));
        assert_eq!(parse_duration_seconds(Some(&text("PT2.5S"))), Some(2.5));
        assert_eq!(parse_duration_seconds(Some(&text("P1DT1S"))), Some(86_401.0));
        assert_eq!(parse_duration_seconds(Some(&text("-PT30S"))), Some(-30.0));
    }

    #[test]
    fn bare_numbers_are_seconds() {
        assert_eq!(parse_duration_seconds(Some(&ScormValue::Number(45.0))), Some(45.0));
        assert_eq!(parse_duration_seconds(Some(&text("90"))), Some(90.0));
    }

    #[test]
    fn malformed_durations_are_unparseable() {
        for raw in ["", "P", "PT", "PTxS", "1:2:3:4", "one hour", "PT1H0M0S trailing"] {
            assert_eq!(parse_duration_seconds(Some(&text(raw))), None, "{raw}");
        }
        assert_eq!(parse_duration(None, None), None);
        assert_eq!(
            parse_duration(Some(&text("garbage")), Some(Duration::seconds(5))),
            Some(Duration::seconds(5))
        );
    }
}
