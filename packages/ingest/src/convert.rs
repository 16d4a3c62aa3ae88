//! Per-value conversion from cleaned CSV text into typed record fields.
//!
//! Conversion never fails a load: a value that cannot be parsed for its
//! column kind becomes null and is counted.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use securecheck_stop_models::{ColumnKind, DriverGender, StopColumn, TrafficStopRecord};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%H:%M:%S%.f"];

/// Parses a calendar date, accepting a datetime by keeping its date part.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            value
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

/// Parses a time of day.
#[must_use]
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(value, f).ok())
}

/// Parses an integer, truncating a finite float literal toward zero.
#[must_use]
pub fn parse_int(value: &str) -> Option<i32> {
    let value = value.trim();
    if let Ok(v) = value.parse::<i32>() {
        return Some(v);
    }

    let float = value.parse::<f64>().ok().filter(|f| f.is_finite())?.trunc();
    if float < f64::from(i32::MIN) || float > f64::from(i32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(float as i32)
}

/// Parses a boolean flag into `1` or `0`.
#[must_use]
pub fn parse_flag(value: &str) -> Option<i32> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Some(1),
        "0" | "0.0" | "false" | "no" => Some(0),
        _ => None,
    }
}

/// Maps each catalog column written to the table onto its position in a
/// cleaned [`crate::frame::StopFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    entries: Vec<(StopColumn, usize)>,
}

impl ColumnLayout {
    /// Builds the layout from CSV headers.
    ///
    /// Catalog columns keep table order; the first occurrence of a
    /// duplicated header wins. Headers outside the catalog are returned
    /// separately so they can be reported.
    #[must_use]
    pub fn from_headers(headers: &[String]) -> (Self, Vec<String>) {
        let entries = StopColumn::all()
            .iter()
            .filter_map(|column| {
                headers
                    .iter()
                    .position(|h| h == column.name())
                    .map(|idx| (*column, idx))
            })
            .collect();

        let ignored = headers
            .iter()
            .filter(|h| h.parse::<StopColumn>().is_err())
            .cloned()
            .collect();

        (Self { entries }, ignored)
    }

    /// Returns the catalog columns present, in table order.
    #[must_use]
    pub fn columns(&self) -> Vec<StopColumn> {
        self.entries.iter().map(|(c, _)| *c).collect()
    }

    /// Returns whether no catalog column is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts one cleaned row into a record.
    ///
    /// Returns the record and the number of non-null values that failed
    /// conversion and were replaced by null.
    #[must_use]
    pub fn to_record(&self, row: &[Option<String>]) -> (TrafficStopRecord, u64) {
        let mut record = TrafficStopRecord::default();
        let mut coerced = 0;

        for (column, idx) in &self.entries {
            let Some(raw) = row.get(*idx).and_then(Option::as_deref) else {
                continue;
            };
            if !assign(&mut record, *column, raw) {
                log::debug!("Coerced {column} value {raw:?} to null");
                coerced += 1;
            }
        }

        (record, coerced)
    }
}

/// Writes one raw value into its record field. Returns `false` if the value
/// did not convert.
fn assign(record: &mut TrafficStopRecord, column: StopColumn, raw: &str) -> bool {
    match column.kind() {
        ColumnKind::Date => {
            record.stop_date = parse_date(raw);
            record.stop_date.is_some()
        }
        ColumnKind::Time => {
            record.stop_time = parse_time(raw);
            record.stop_time.is_some()
        }
        ColumnKind::Integer => {
            let value = parse_int(raw);
            match column {
                StopColumn::DriverAgeRaw => record.driver_age_raw = value,
                _ => record.driver_age = value,
            }
            value.is_some()
        }
        ColumnKind::Flag => {
            let value = parse_flag(raw);
            match column {
                StopColumn::SearchConducted => record.search_conducted = value,
                StopColumn::IsArrested => record.is_arrested = value,
                _ => record.drugs_related_stop = value,
            }
            value.is_some()
        }
        ColumnKind::Text => {
            let value = Some(raw.to_owned());
            match column {
                StopColumn::CountryName => record.country_name = value,
                StopColumn::DriverGender => {
                    record.driver_gender = Some(DriverGender::from_recorded(raw).to_string());
                }
                StopColumn::DriverRace => record.driver_race = value,
                StopColumn::ViolationRaw => record.violation_raw = value,
                StopColumn::Violation => record.violation = value,
                StopColumn::SearchType => record.search_type = value,
                StopColumn::StopOutcome => record.stop_outcome = value,
                StopColumn::StopDuration => record.stop_duration = value,
                _ => record.vehicle_number = value,
            }
            true
        }
    }
}
