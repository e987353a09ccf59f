//! `default` and `date`.

use chrono::format::Item;
use chrono::format::StrftimeItems;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;

use super::string_arg;
use super::FilterRegistry;
use crate::error::FilterError;
use crate::value::Value;

pub(super) fn register(registry: &mut FilterRegistry) {
    registry.insert_builtin("default", default);
    registry.insert_builtin("date", date);
}

/// Replace only nil, false and the empty string. Zero and empty arrays
/// are kept, unlike plain truthiness.
fn default(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let fallback = args.first().ok_or_else(|| {
        FilterError::invalid_argument("default", "missing fallback argument")
    })?;
    let replace = matches!(input, Value::Nil | Value::Bool(false))
        || matches!(input, Value::String(s) if s.is_empty());
    Ok(if replace { fallback.clone() } else { input.clone() })
}

/// Format a date with a strftime pattern. Accepts RFC 3339 strings,
/// `YYYY-MM-DD [HH:MM:SS]` strings, the words `now` and `today`, and
/// integer unix timestamps. Unparseable input passes through unchanged.
fn date(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let format = string_arg("date", args, 0)?;
    if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
        return Err(FilterError::invalid_argument(
            "date",
            format!("invalid format string {format:?}"),
        ));
    }

    let parsed = match input {
        Value::String(s) => parse_datetime(s),
        Value::Int(ts) => Utc.timestamp_opt(*ts, 0).single(),
        _ => None,
    };
    match parsed {
        Some(dt) => Ok(Value::String(dt.format(&format).to_string())),
        None => Ok(input.clone()),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") || s.eq_ignore_ascii_case("today") {
        return Some(Utc::now());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}
