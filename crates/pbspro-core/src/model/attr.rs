//! Attribute value decoding.
//!
//! PBS reports every attribute as a string. Absent attributes decode to zero
//! (or an empty string); present but malformed values are a [`MappingError`].

use chrono::{Local, NaiveDateTime, TimeZone};

use super::BatchStatus;
use crate::error::MappingError;

/// `ctime(3)` layout used by `qstat -F json` for time attributes.
const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Per-state job counters (`state_count` attribute).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCount {
    pub transit: i64,
    pub queued: i64,
    pub held: i64,
    pub waiting: i64,
    pub running: i64,
    pub exiting: i64,
    pub begun: i64,
}

/// Server licensing counters (`license_count` attribute).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LicenseCount {
    pub avail_global: i64,
    pub avail_local: i64,
    pub used: i64,
    pub high_use: i64,
}

/// Typed accessors over one record, producing errors that name the record.
pub(crate) struct Decoder<'a> {
    record: &'a BatchStatus,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(record: &'a BatchStatus) -> Self {
        Self { record }
    }

    fn err(&self, attribute: String, reason: String) -> MappingError {
        MappingError::new(&self.record.name, attribute, reason)
    }

    fn decode<T>(
        &self,
        name: &str,
        resource: Option<&str>,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<T, MappingError>
    where
        T: Default,
    {
        let raw = match resource {
            Some(res) => self.record.get_resource(name, res),
            None => self.record.get(name),
        };
        let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(T::default());
        };
        parse(raw).map_err(|reason| {
            let attribute = match resource {
                Some(res) => format!("{}.{}", name, res),
                None => name.to_string(),
            };
            self.err(attribute, reason)
        })
    }

    pub(crate) fn text(&self, name: &str) -> String {
        self.record.get(name).unwrap_or_default().to_string()
    }

    pub(crate) fn text_res(&self, name: &str, resource: &str) -> String {
        self.record
            .get_resource(name, resource)
            .unwrap_or_default()
            .to_string()
    }

    pub(crate) fn int(&self, name: &str) -> Result<i64, MappingError> {
        self.decode(name, None, parse_int)
    }

    pub(crate) fn int_res(&self, name: &str, resource: &str) -> Result<i64, MappingError> {
        self.decode(name, Some(resource), parse_int)
    }

    pub(crate) fn float_res(&self, name: &str, resource: &str) -> Result<f64, MappingError> {
        self.decode(name, Some(resource), |v| {
            v.parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", v))
        })
    }

    pub(crate) fn flag(&self, name: &str) -> Result<u8, MappingError> {
        self.decode(name, None, parse_bool)
    }

    pub(crate) fn size_res(&self, name: &str, resource: &str) -> Result<u64, MappingError> {
        self.decode(name, Some(resource), parse_size)
    }

    pub(crate) fn duration(&self, name: &str) -> Result<i64, MappingError> {
        self.decode(name, None, parse_duration)
    }

    pub(crate) fn duration_res(&self, name: &str, resource: &str) -> Result<i64, MappingError> {
        self.decode(name, Some(resource), parse_duration)
    }

    pub(crate) fn timestamp(&self, name: &str) -> Result<i64, MappingError> {
        self.decode(name, None, parse_timestamp)
    }

    pub(crate) fn state_count(&self) -> Result<StateCount, MappingError> {
        self.decode("state_count", None, parse_state_count)
    }

    pub(crate) fn license_count(&self) -> Result<LicenseCount, MappingError> {
        self.decode("license_count", None, parse_license_count)
    }
}

fn parse_int(v: &str) -> Result<i64, String> {
    v.parse::<i64>()
        .map_err(|_| format!("'{}' is not an integer", v))
}

fn parse_bool(v: &str) -> Result<u8, String> {
    match v {
        "True" | "true" | "TRUE" | "1" => Ok(1),
        "False" | "false" | "FALSE" | "0" => Ok(0),
        other => Err(format!("'{}' is not a boolean", other)),
    }
}

/// Parses a PBS size such as `16gb`, `1024kb`, `8mw` into bytes.
pub(crate) fn parse_size(v: &str) -> Result<u64, String> {
    let lower = v.to_ascii_lowercase();
    let digits_end = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (number, suffix) = lower.split_at(digits_end);
    let number: u64 = number
        .parse()
        .map_err(|_| format!("'{}' is not a size", v))?;

    let (scale, unit) = match suffix.strip_suffix('w') {
        Some(prefix) => (prefix, 8u64),
        None => (suffix.strip_suffix('b').unwrap_or(suffix), 1u64),
    };
    let multiplier: u64 = match scale {
        "" => 1,
        "k" => 1 << 10,
        "m" => 1 << 20,
        "g" => 1 << 30,
        "t" => 1 << 40,
        "p" => 1 << 50,
        _ => return Err(format!("'{}' has an unknown size suffix", v)),
    };
    number
        .checked_mul(multiplier)
        .and_then(|n| n.checked_mul(unit))
        .ok_or_else(|| format!("'{}' overflows", v))
}

/// Parses `[[HH:]MM:]SS` into seconds. Fractional seconds are truncated.
pub(crate) fn parse_duration(v: &str) -> Result<i64, String> {
    let mut total: i64 = 0;
    let parts: Vec<&str> = v.split(':').collect();
    if parts.len() > 3 {
        return Err(format!("'{}' is not a duration", v));
    }
    for (i, part) in parts.iter().enumerate() {
        let value = if i + 1 == parts.len() {
            part.split('.').next().unwrap_or(part)
        } else {
            part
        };
        let value: i64 = value
            .parse()
            .map_err(|_| format!("'{}' is not a duration", v))?;
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(|| format!("'{}' overflows", v))?;
    }
    Ok(total)
}

/// Parses epoch seconds or a `ctime(3)` date in local time.
pub(crate) fn parse_timestamp(v: &str) -> Result<i64, String> {
    if let Ok(epoch) = v.parse::<i64>() {
        return Ok(epoch);
    }
    let normalized = v.split_whitespace().collect::<Vec<_>>().join(" ");
    let naive = NaiveDateTime::parse_from_str(&normalized, CTIME_FORMAT)
        .map_err(|_| format!("'{}' is not a timestamp", v))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
        .ok_or_else(|| format!("'{}' does not exist in local time", v))
}

/// Splits `Key:value Key:value` lists used by `state_count` and `license_count`.
fn parse_pairs(v: &str) -> Result<Vec<(&str, i64)>, String> {
    v.split_whitespace()
        .map(|pair| {
            let (key, value) = pair
                .split_once(':')
                .ok_or_else(|| format!("'{}' is not a Key:value pair", pair))?;
            let value = value
                .parse::<i64>()
                .map_err(|_| format!("'{}' has a non-numeric count", pair))?;
            Ok((key, value))
        })
        .collect()
}

pub(crate) fn parse_state_count(v: &str) -> Result<StateCount, String> {
    let mut counts = StateCount::default();
    for (key, value) in parse_pairs(v)? {
        match key {
            "Transit" => counts.transit = value,
            "Queued" => counts.queued = value,
            "Held" => counts.held = value,
            "Waiting" => counts.waiting = value,
            "Running" => counts.running = value,
            "Exiting" => counts.exiting = value,
            "Begun" => counts.begun = value,
            _ => {}
        }
    }
    Ok(counts)
}

pub(crate) fn parse_license_count(v: &str) -> Result<LicenseCount, String> {
    let mut counts = LicenseCount::default();
    for (key, value) in parse_pairs(v)? {
        match key {
            "Avail_Global" => counts.avail_global = value,
            "Avail_Local" => counts.avail_local = value,
            "Used" => counts.used = value,
            "High_Use" => counts.high_use = value,
            _ => {}
        }
    }
    Ok(counts)
}
