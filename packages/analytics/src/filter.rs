//! Parameterized WHERE-clause builder for dashboard filter selections.
//!
//! The predicate always starts with the date range; each non-empty filter
//! dimension then adds an `IN (?, ...)` fragment. Selected values only ever
//! travel as bound parameters.

use chrono::NaiveDate;
use securecheck_analytics_models::{DateRange, FilterSelection};
use securecheck_database::SqlValue;
use securecheck_stop_models::StopColumn;

use crate::AnalyticsError;

/// Parses a `YYYY-MM-DD` request parameter.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidDate`] if the value is not a valid
/// calendar date in that format.
pub fn parse_date(value: &str) -> Result<NaiveDate, AnalyticsError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| AnalyticsError::InvalidDate {
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// A rendered predicate: SQL fragments joined with `AND` plus the values
/// bound to their placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterPredicate {
    frags: Vec<String>,
    params: Vec<SqlValue>,
}

impl FilterPredicate {
    /// Starts a predicate restricted to the date range (inclusive on both
    /// ends).
    #[must_use]
    pub fn new(range: &DateRange) -> Self {
        Self {
            frags: vec![format!(
                "{} BETWEEN CAST(? AS TIMESTAMP) AND CAST(? AS TIMESTAMP)",
                StopColumn::StopDate.name()
            )],
            params: vec![
                SqlValue::Text(range.start_bound()),
                SqlValue::Text(range.end_bound()),
            ],
        }
    }

    /// Builds the full predicate for a selection and range.
    ///
    /// Dimensions are appended in a fixed order: vehicle, violation,
    /// gender, race, country.
    #[must_use]
    pub fn build(selection: &FilterSelection, range: &DateRange) -> Self {
        if selection.is_empty() {
            log::debug!("No filters selected, restricting by date range only");
        }

        Self::new(range)
            .with_any_of(StopColumn::VehicleNumber, &selection.vehicles)
            .with_any_of(StopColumn::Violation, &selection.violations)
            .with_any_of(StopColumn::DriverGender, &selection.genders)
            .with_any_of(StopColumn::DriverRace, &selection.races)
            .with_any_of(StopColumn::CountryName, &selection.countries)
    }

    /// Restricts `column` to the given values. An empty list adds nothing.
    #[must_use]
    pub fn with_any_of(mut self, column: StopColumn, values: &[String]) -> Self {
        if values.is_empty() {
            return self;
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        self.frags
            .push(format!("{} IN ({placeholders})", column.name()));
        self.params
            .extend(values.iter().map(|v| SqlValue::Text(v.clone())));
        self
    }

    /// The predicate as a `WHERE ...` clause.
    #[must_use]
    pub fn where_clause(&self) -> String {
        format!("WHERE {}", self.frags.join(" AND "))
    }

    /// The `WHERE ...` clause with an additional fixed condition ANDed on.
    ///
    /// `extra` must be a constant SQL fragment without placeholders.
    #[must_use]
    pub fn where_clause_and(&self, extra: Option<&str>) -> String {
        match extra {
            Some(extra) => format!("{} AND {extra}", self.where_clause()),
            None => self.where_clause(),
        }
    }

    /// Values bound to the clause's placeholders, in order.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}
