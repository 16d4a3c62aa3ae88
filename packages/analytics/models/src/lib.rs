#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard filter selections, the panel catalog identifiers, and the
//! tabular result types returned by the analytics engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Multi-select filter values chosen on the dashboard.
///
/// An empty list leaves that dimension unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSelection {
    /// Vehicle numbers.
    pub vehicles: Vec<String>,
    /// Violation categories.
    pub violations: Vec<String>,
    /// Driver genders.
    pub genders: Vec<String>,
    /// Driver races.
    pub races: Vec<String>,
    /// Country names.
    pub countries: Vec<String>,
}

impl FilterSelection {
    /// Returns whether no dimension is restricted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
            && self.violations.is_empty()
            && self.genders.is_empty()
            && self.races.is_empty()
            && self.countries.is_empty()
    }
}

/// Inclusive calendar date range; `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, swapping the endpoints if they are reversed.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// A range covering exactly one day.
    #[must_use]
    pub const fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// January 1 2020 through `today`.
    #[must_use]
    pub fn default_through(today: NaiveDate) -> Self {
        Self::new(default_start(), today)
    }

    /// Resolves optional endpoints. One endpoint alone is a single day;
    /// neither falls back to [`DateRange::default_through`].
    #[must_use]
    pub fn from_parts(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> Self {
        match (from, to) {
            (Some(start), Some(end)) => Self::new(start, end),
            (Some(date), None) | (None, Some(date)) => Self::single(date),
            (None, None) => Self::default_through(today),
        }
    }

    /// First day of the range.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Lower bound as a timestamp literal at midnight.
    #[must_use]
    pub fn start_bound(&self) -> String {
        format!("{} 00:00:00", self.start.format("%Y-%m-%d"))
    }

    /// Upper bound as a timestamp literal at the last microsecond of the
    /// end day.
    #[must_use]
    pub fn end_bound(&self) -> String {
        format!("{} 23:59:59.999999", self.end.format("%Y-%m-%d"))
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::default_through(chrono::Local::now().date_naive())
    }
}

/// First day of the default dashboard date range.
#[must_use]
pub fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Dashboard tab a panel is shown on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PanelTab {
    /// Vehicle analytics.
    Vehicle,
    /// Time of day and stop duration.
    TimeAndDuration,
    /// Driver demographics.
    Demographics,
    /// Violation analytics.
    Violations,
    /// Country-level analytics.
    Location,
    /// Cross-cutting breakdowns.
    Advanced,
}

impl PanelTab {
    /// Returns all tabs in dashboard order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Vehicle,
            Self::TimeAndDuration,
            Self::Demographics,
            Self::Violations,
            Self::Location,
            Self::Advanced,
        ]
    }

    /// Tab heading.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Vehicle => "Vehicle Analytics",
            Self::TimeAndDuration => "Time & Duration",
            Self::Demographics => "Demographics",
            Self::Violations => "Violations",
            Self::Location => "Location-Based",
            Self::Advanced => "Advanced Analytics",
        }
    }
}

/// Identifier of one entry in the fixed panel catalog.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PanelId {
    /// Top vehicles in drug-related stops.
    DrugStopsByVehicle,
    /// Most frequently searched vehicles.
    SearchesByVehicle,
    /// Stops per hour of day.
    StopsByHour,
    /// Average stop duration per violation.
    AvgDurationByViolation,
    /// Arrest rate by night/day period.
    ArrestRateByTimePeriod,
    /// Arrests per driver age group.
    ArrestsByAgeGroup,
    /// Stops per country and gender.
    GenderByCountry,
    /// Search rate per race and gender.
    SearchRateByRaceGender,
    /// Searches and arrests per violation.
    ViolationSearchesArrests,
    /// Violations among drivers under 25.
    YoungDriverViolations,
    /// Drug-related stops per country.
    DrugStopsByCountry,
    /// Arrest rate per country and violation.
    ArrestRateByCountryViolation,
    /// Search-conducted stops per country.
    SearchesByCountry,
    /// Stops and arrests per country and year.
    YearlyByCountry,
    /// Violations per race and age group.
    ViolationTrendsByAgeRace,
    /// Stops per year, month, and hour.
    StopsByYearMonthHour,
    /// Violations ranked by search and arrest rates.
    ViolationsHighSearchArrest,
    /// Stops per country, gender, race, and age group.
    DemographicsByCountry,
    /// Five violations with the highest arrest rate.
    TopViolationsByArrestRate,
}

impl PanelId {
    /// Returns every panel in dashboard order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::DrugStopsByVehicle,
            Self::SearchesByVehicle,
            Self::StopsByHour,
            Self::AvgDurationByViolation,
            Self::ArrestRateByTimePeriod,
            Self::ArrestsByAgeGroup,
            Self::GenderByCountry,
            Self::SearchRateByRaceGender,
            Self::ViolationSearchesArrests,
            Self::YoungDriverViolations,
            Self::DrugStopsByCountry,
            Self::ArrestRateByCountryViolation,
            Self::SearchesByCountry,
            Self::YearlyByCountry,
            Self::ViolationTrendsByAgeRace,
            Self::StopsByYearMonthHour,
            Self::ViolationsHighSearchArrest,
            Self::DemographicsByCountry,
            Self::TopViolationsByArrestRate,
        ]
    }

    /// Returns the panel's identifier string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        <&'static str>::from(self)
    }

    /// Human-readable panel heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::DrugStopsByVehicle => "Top 10 Vehicles Involved in Drug-Related Stops",
            Self::SearchesByVehicle => "Most Frequently Searched Vehicles",
            Self::StopsByHour => "Traffic Stops by Hour of the Day",
            Self::AvgDurationByViolation => "Average Stop Duration by Violation",
            Self::ArrestRateByTimePeriod => "Arrest Rate by Time of Day",
            Self::ArrestsByAgeGroup => "Driver Age Group with Highest Arrest Rate",
            Self::GenderByCountry => "Gender Distribution of Drivers Stopped by Country",
            Self::SearchRateByRaceGender => "Search Rate by Race & Gender Combination",
            Self::ViolationSearchesArrests => "Violations Most Associated with Searches or Arrests",
            Self::YoungDriverViolations => "Most Common Violations for Drivers Under 25",
            Self::DrugStopsByCountry => "Countries Reporting Highest Rate of Drug-Related Stops",
            Self::ArrestRateByCountryViolation => "Arrest Rate (%) by Country & Violation",
            Self::SearchesByCountry => "Total Search-Conducted Stops by Country",
            Self::YearlyByCountry => "Yearly Breakdown of Stops & Arrests by Country",
            Self::ViolationTrendsByAgeRace => "Driver Violation Trends by Age & Race",
            Self::StopsByYearMonthHour => "Time Period Analysis of Stops (Year, Month, Hour)",
            Self::ViolationsHighSearchArrest => "Violations with High Search & Arrest Rates",
            Self::DemographicsByCountry => "Driver Demographics by Country",
            Self::TopViolationsByArrestRate => "Top 5 Violations by Arrest Rate",
        }
    }

    /// Tab the panel belongs to.
    #[must_use]
    pub const fn tab(self) -> PanelTab {
        match self {
            Self::DrugStopsByVehicle | Self::SearchesByVehicle => PanelTab::Vehicle,
            Self::StopsByHour | Self::AvgDurationByViolation | Self::ArrestRateByTimePeriod => {
                PanelTab::TimeAndDuration
            }
            Self::ArrestsByAgeGroup | Self::GenderByCountry | Self::SearchRateByRaceGender => {
                PanelTab::Demographics
            }
            Self::ViolationSearchesArrests | Self::YoungDriverViolations => PanelTab::Violations,
            Self::DrugStopsByCountry
            | Self::ArrestRateByCountryViolation
            | Self::SearchesByCountry => PanelTab::Location,
            Self::YearlyByCountry
            | Self::ViolationTrendsByAgeRace
            | Self::StopsByYearMonthHour
            | Self::ViolationsHighSearchArrest
            | Self::DemographicsByCountry
            | Self::TopViolationsByArrestRate => PanelTab::Advanced,
        }
    }

    /// File name offered when the panel is downloaded as CSV.
    #[must_use]
    pub fn csv_file_name(self) -> String {
        match self {
            Self::DrugStopsByVehicle => "drug_stops.csv".to_string(),
            Self::SearchesByVehicle => "frequent_searches.csv".to_string(),
            other => format!("{}.csv", other.as_str()),
        }
    }
}

/// Catalog listing entry for one panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelInfo {
    /// Panel identifier.
    pub id: PanelId,
    /// Panel heading.
    pub title: String,
    /// Tab the panel is shown on.
    pub tab: PanelTab,
    /// Heading of that tab.
    pub tab_label: String,
    /// CSV download file name.
    pub csv_file_name: String,
}

impl From<PanelId> for PanelInfo {
    fn from(id: PanelId) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            tab: id.tab(),
            tab_label: id.tab().label().to_string(),
            csv_file_name: id.csv_file_name(),
        }
    }
}

/// One value of a result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// SQL `NULL`.
    Null,
    /// Integer value (counts, hours, years).
    Int(i64),
    /// Floating-point value (averages, rates).
    Float(f64),
    /// Text value.
    Text(String),
}

impl Cell {
    /// Returns the text value, if this is a text cell.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Tabular query result: named columns and rows in query order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelTable {
    /// Column names in projection order.
    pub columns: Vec<String>,
    /// Rows, each with one cell per column.
    pub rows: Vec<Vec<Cell>>,
}

impl PanelTable {
    /// Returns whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the first row's value of one column.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.first().and_then(|row| row.get(idx))
    }

    /// Returns every value of one column, in row order.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }
}

/// The leading row of a ranked panel, called out above its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelHighlight {
    /// What is being called out, e.g. "Highest Arrest Rate".
    pub heading: String,
    /// The leading group, e.g. a time period or a race and gender pair.
    pub subject: String,
    /// The measure that ranks first.
    pub value: Cell,
}

impl PanelHighlight {
    /// Builds the highlight for panels that have one, from the first row
    /// of their ranked table. Empty tables have no highlight.
    #[must_use]
    pub fn for_panel(id: PanelId, table: &PanelTable) -> Option<Self> {
        let text = |name: &str| {
            table
                .first(name)
                .map(|c| c.as_text().unwrap_or("Unknown").to_string())
        };

        let (heading, subject, measure) = match id {
            PanelId::ArrestRateByTimePeriod => (
                "Highest Arrest Rate",
                text("time_period")?,
                "arrest_rate_percent",
            ),
            PanelId::SearchRateByRaceGender => (
                "Highest Search Rate",
                format!("{} - {}", text("driver_race")?, text("driver_gender")?),
                "search_rate_percent",
            ),
            PanelId::SearchesByCountry => (
                "Highest Search-Conducted Stops",
                text("country")?,
                "total_search_stops",
            ),
            _ => return None,
        };

        Some(Self {
            heading: heading.to_string(),
            subject,
            value: table.first(measure)?.clone(),
        })
    }
}

/// A panel result together with its catalog metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelResult {
    /// Catalog metadata.
    #[serde(flatten)]
    pub info: PanelInfo,
    /// Leading row of ranked panels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<PanelHighlight>,
    /// Query result.
    pub table: PanelTable,
}

impl PanelResult {
    /// Wraps a panel's table with its metadata and highlight.
    #[must_use]
    pub fn new(id: PanelId, table: PanelTable) -> Self {
        Self {
            info: PanelInfo::from(id),
            highlight: PanelHighlight::for_panel(id, &table),
            table,
        }
    }
}

/// The three headline numbers shown above the panels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineMetrics {
    /// Stops matching the filters.
    pub total_logs: u64,
    /// Matching stops with a non-empty violation.
    pub total_violations: u64,
    /// Vehicles with at least four matching stops.
    pub high_risk_vehicles: u64,
}

/// Option lists for the dashboard's multi-select filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Distinct vehicle numbers.
    pub vehicles: Vec<String>,
    /// Distinct violations.
    pub violations: Vec<String>,
    /// Fixed gender list.
    pub genders: Vec<String>,
    /// Distinct driver races.
    pub races: Vec<String>,
    /// Distinct country names.
    pub countries: Vec<String>,
}
