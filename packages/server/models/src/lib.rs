#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the dashboard server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the analytics types so the query-string contract can evolve on its
//! own.

use securecheck_analytics_models::{FilterSelection, HeadlineMetrics, PanelResult};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Query parameters shared by every filtered endpoint.
///
/// List parameters are comma-separated; blank entries are ignored. Dates
/// are `YYYY-MM-DD`; either one alone selects a single day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterQueryParams {
    /// Vehicle numbers.
    pub vehicles: Option<String>,
    /// Violation categories.
    pub violations: Option<String>,
    /// Driver genders.
    pub genders: Option<String>,
    /// Driver races.
    pub races: Option<String>,
    /// Country names.
    pub countries: Option<String>,
    /// Start date.
    pub from: Option<String>,
    /// End date.
    pub to: Option<String>,
}

impl FilterQueryParams {
    /// Splits the list parameters into a [`FilterSelection`].
    #[must_use]
    pub fn selection(&self) -> FilterSelection {
        FilterSelection {
            vehicles: split_list(self.vehicles.as_deref()),
            violations: split_list(self.violations.as_deref()),
            genders: split_list(self.genders.as_deref()),
            races: split_list(self.races.as_deref()),
            countries: split_list(self.countries.as_deref()),
        }
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// Everything one dashboard render needs: the resolved date range, the
/// headline metrics, and every panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDashboard {
    /// First day of the applied range (`YYYY-MM-DD`).
    pub from: String,
    /// Last day of the applied range (`YYYY-MM-DD`).
    pub to: String,
    /// Headline metrics.
    pub metrics: HeadlineMetrics,
    /// Panel results in dashboard order.
    pub panels: Vec<PanelResult>,
}
