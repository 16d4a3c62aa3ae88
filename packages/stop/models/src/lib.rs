#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Traffic-stop record types and the canonical column catalog.
//!
//! Every CSV source is mapped onto the sixteen columns of [`StopColumn`].
//! The loader, the table schema, and the analytics queries all agree on
//! these names, so this crate is the single place they are defined.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Default name of the destination table.
pub const DEFAULT_TABLE_NAME: &str = "traffic_stops";

/// Number of stops at which a vehicle is considered high-risk.
pub const HIGH_RISK_STOP_THRESHOLD: i64 = 4;

/// How a raw CSV value is converted before it is bound to an INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Calendar date, stored as `DATE`.
    Date,
    /// Time of day, stored as `TIME`.
    Time,
    /// Nullable integer, stored as `INTEGER`.
    Integer,
    /// Boolean flag stored as a `0`/`1` `INTEGER`.
    Flag,
    /// Free text, stored as `TEXT`.
    Text,
}

impl ColumnKind {
    /// Returns the SQL storage type for this kind.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Integer | Self::Flag => "INTEGER",
            Self::Text => "TEXT",
        }
    }
}

/// The canonical traffic-stop columns, in table order.
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
pub enum StopColumn {
    /// Date of the stop.
    StopDate,
    /// Time of the stop.
    StopTime,
    /// Country where the stop happened.
    CountryName,
    /// Driver gender as recorded.
    DriverGender,
    /// Driver age as originally recorded.
    DriverAgeRaw,
    /// Corrected driver age.
    DriverAge,
    /// Driver race as recorded.
    DriverRace,
    /// Uncleaned violation string.
    ViolationRaw,
    /// Cleaned violation category.
    Violation,
    /// Whether a search was conducted (`0`/`1`).
    SearchConducted,
    /// Kind of search, mode-filled at load time.
    SearchType,
    /// Outcome of the stop (ticket, warning, arrest, ...).
    StopOutcome,
    /// Whether the driver was arrested (`0`/`1`).
    IsArrested,
    /// Duration band or minutes.
    StopDuration,
    /// Whether the stop was drug related (`0`/`1`).
    DrugsRelatedStop,
    /// Vehicle registration number.
    VehicleNumber,
}

impl StopColumn {
    /// Returns every column in table order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::StopDate,
            Self::StopTime,
            Self::CountryName,
            Self::DriverGender,
            Self::DriverAgeRaw,
            Self::DriverAge,
            Self::DriverRace,
            Self::ViolationRaw,
            Self::Violation,
            Self::SearchConducted,
            Self::SearchType,
            Self::StopOutcome,
            Self::IsArrested,
            Self::StopDuration,
            Self::DrugsRelatedStop,
            Self::VehicleNumber,
        ]
    }

    /// Returns the conversion kind for this column.
    #[must_use]
    pub const fn kind(self) -> ColumnKind {
        match self {
            Self::StopDate => ColumnKind::Date,
            Self::StopTime => ColumnKind::Time,
            Self::DriverAgeRaw | Self::DriverAge => ColumnKind::Integer,
            Self::SearchConducted | Self::IsArrested | Self::DrugsRelatedStop => ColumnKind::Flag,
            Self::CountryName
            | Self::DriverGender
            | Self::DriverRace
            | Self::ViolationRaw
            | Self::Violation
            | Self::SearchType
            | Self::StopOutcome
            | Self::StopDuration
            | Self::VehicleNumber => ColumnKind::Text,
        }
    }

    /// Returns the SQL column name.
    #[must_use]
    pub fn name(self) -> &'static str {
        <&'static str>::from(self)
    }
}

/// Driver gender options offered by the dashboard filter.
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
)]
#[strum(ascii_case_insensitive)]
pub enum DriverGender {
    /// Male driver.
    #[strum(to_string = "Male", serialize = "M")]
    Male,
    /// Female driver.
    #[strum(to_string = "Female", serialize = "F")]
    Female,
    /// Any other recorded gender.
    #[strum(to_string = "Other")]
    Other,
}

impl DriverGender {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Male, Self::Female, Self::Other]
    }

    /// Maps a recorded gender code onto a dashboard option. `M`/`Male` and
    /// `F`/`Female` match in any case; everything else is [`Self::Other`].
    #[must_use]
    pub fn from_recorded(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Other)
    }
}

/// One traffic stop after type conversion.
///
/// Every field is optional because any column may be dropped (all null in
/// the source) or fail conversion for an individual row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficStopRecord {
    /// Date of the stop.
    pub stop_date: Option<NaiveDate>,
    /// Time of the stop.
    pub stop_time: Option<NaiveTime>,
    /// Country where the stop happened.
    pub country_name: Option<String>,
    /// Driver gender.
    pub driver_gender: Option<String>,
    /// Driver age as originally recorded.
    pub driver_age_raw: Option<i32>,
    /// Corrected driver age.
    pub driver_age: Option<i32>,
    /// Driver race.
    pub driver_race: Option<String>,
    /// Uncleaned violation string.
    pub violation_raw: Option<String>,
    /// Cleaned violation category.
    pub violation: Option<String>,
    /// `1` when a search was conducted.
    pub search_conducted: Option<i32>,
    /// Kind of search.
    pub search_type: Option<String>,
    /// Outcome of the stop.
    pub stop_outcome: Option<String>,
    /// `1` when the driver was arrested.
    pub is_arrested: Option<i32>,
    /// Duration band or minutes.
    pub stop_duration: Option<String>,
    /// `1` when the stop was drug related.
    pub drugs_related_stop: Option<i32>,
    /// Vehicle registration number.
    pub vehicle_number: Option<String>,
}
