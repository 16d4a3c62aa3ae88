//! The fixed catalog of aggregate panel queries.
//!
//! Every query shares the same filter predicate and differs only in its
//! projection, grouping, ordering, and limit. Secondary sort keys make the
//! row order deterministic when the primary key ties.

use securecheck_analytics_models::PanelId;
use securecheck_database::schema::validate_table_name;
use securecheck_stop_models::{HIGH_RISK_STOP_THRESHOLD, StopColumn};

use crate::AnalyticsError;
use crate::filter::FilterPredicate;

/// Buckets `driver_age`; null ages fall through to `60+`.
pub const AGE_GROUP_SQL: &str = "CASE
            WHEN driver_age < 18 THEN 'Under 18'
            WHEN driver_age BETWEEN 18 AND 25 THEN '18-25'
            WHEN driver_age BETWEEN 26 AND 35 THEN '26-35'
            WHEN driver_age BETWEEN 36 AND 45 THEN '36-45'
            WHEN driver_age BETWEEN 46 AND 60 THEN '46-60'
            ELSE '60+'
        END";

/// Buckets the hour of `stop_time` into night and day periods.
pub const TIME_PERIOD_SQL: &str = "CASE
            WHEN hour(stop_time) BETWEEN 20 AND 23 THEN 'Night (8 PM-11 PM)'
            WHEN hour(stop_time) BETWEEN 0 AND 5 THEN 'Night (12 AM-5 AM)'
            ELSE 'Daytime (6 AM-7 PM)'
        END";

/// Leading number of `stop_duration` (`16-30 Min` -> 16); null when there
/// is none.
pub const DURATION_MINUTES_SQL: &str =
    "TRY_CAST(regexp_extract(CAST(stop_duration AS VARCHAR), '^[0-9]+([.][0-9]+){0,1}') AS DOUBLE)";

/// Percentage of rows with `flag = 1`, rounded to two decimals.
fn rate_sql(flag: &str) -> String {
    format!("ROUND(CAST(SUM({flag}) AS DOUBLE) / COUNT(*) * 100, 2)")
}

/// Integer sum of a flag column.
fn sum_sql(flag: &str) -> String {
    format!("CAST(SUM({flag}) AS BIGINT)")
}

/// Fixed condition ANDed onto the shared predicate for a panel.
#[must_use]
pub const fn extra_condition(id: PanelId) -> Option<&'static str> {
    match id {
        PanelId::DrugStopsByVehicle | PanelId::DrugStopsByCountry => Some("drugs_related_stop = 1"),
        PanelId::SearchesByVehicle | PanelId::SearchesByCountry => Some("search_conducted = 1"),
        PanelId::ArrestsByAgeGroup => Some("is_arrested = 1"),
        PanelId::YoungDriverViolations => Some("driver_age < 25"),
        _ => None,
    }
}

/// Row limit of a panel, if any.
#[must_use]
pub const fn limit(id: PanelId) -> Option<u32> {
    match id {
        PanelId::DrugStopsByVehicle
        | PanelId::SearchesByVehicle
        | PanelId::ArrestsByAgeGroup
        | PanelId::ViolationSearchesArrests
        | PanelId::YoungDriverViolations
        | PanelId::DrugStopsByCountry
        | PanelId::ViolationsHighSearchArrest => Some(10),
        PanelId::TopViolationsByArrestRate => Some(5),
        _ => None,
    }
}

/// Renders the SQL of one panel against `table`.
///
/// The returned statement has exactly the placeholders of `predicate`, in
/// the same order, so it runs with `predicate.params()`.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the table name is not a plain
/// identifier.
#[allow(clippy::too_many_lines)]
pub fn panel_sql(
    id: PanelId,
    table: &str,
    predicate: &FilterPredicate,
) -> Result<String, AnalyticsError> {
    let table = validate_table_name(table)?;
    let w = predicate.where_clause_and(extra_condition(id));
    let arrests = sum_sql("is_arrested");
    let searches = sum_sql("search_conducted");
    let arrest_rate = rate_sql("is_arrested");
    let search_rate = rate_sql("search_conducted");

    let body = match id {
        PanelId::DrugStopsByVehicle => format!(
            "SELECT vehicle_number, COUNT(*) AS drug_stop_count
             FROM {table}
             {w}
             GROUP BY vehicle_number
             ORDER BY drug_stop_count DESC, vehicle_number"
        ),
        PanelId::SearchesByVehicle => format!(
            "SELECT vehicle_number, COUNT(*) AS search_count
             FROM {table}
             {w}
             GROUP BY vehicle_number
             ORDER BY search_count DESC, vehicle_number"
        ),
        PanelId::StopsByHour => format!(
            "SELECT hour(stop_time) AS hour_of_day, COUNT(*) AS stop_count
             FROM {table}
             {w}
             GROUP BY hour_of_day
             ORDER BY stop_count DESC, hour_of_day"
        ),
        PanelId::AvgDurationByViolation => format!(
            "SELECT violation, ROUND(AVG({DURATION_MINUTES_SQL}), 2) AS avg_duration
             FROM {table}
             {w}
             GROUP BY violation
             ORDER BY avg_duration DESC NULLS LAST, violation"
        ),
        PanelId::ArrestRateByTimePeriod => format!(
            "SELECT {TIME_PERIOD_SQL} AS time_period,
                    COUNT(*) AS total_stops,
                    {arrests} AS total_arrests,
                    {arrest_rate} AS arrest_rate_percent
             FROM {table}
             {w}
             GROUP BY time_period
             ORDER BY arrest_rate_percent DESC NULLS LAST, time_period"
        ),
        PanelId::ArrestsByAgeGroup => format!(
            "SELECT {AGE_GROUP_SQL} AS driver_age_group, COUNT(*) AS arrests
             FROM {table}
             {w}
             GROUP BY driver_age_group
             ORDER BY arrests DESC, driver_age_group"
        ),
        PanelId::GenderByCountry => format!(
            "SELECT country_name AS country, driver_gender, COUNT(*) AS stop_count
             FROM {table}
             {w}
             GROUP BY country, driver_gender
             ORDER BY stop_count DESC, country, driver_gender"
        ),
        PanelId::SearchRateByRaceGender => format!(
            "SELECT driver_race,
                    driver_gender,
                    COUNT(*) AS total_stops,
                    {searches} AS total_searches,
                    {search_rate} AS search_rate_percent
             FROM {table}
             {w}
             GROUP BY driver_race, driver_gender
             ORDER BY search_rate_percent DESC NULLS LAST, driver_race, driver_gender"
        ),
        PanelId::ViolationSearchesArrests => format!(
            "SELECT violation,
                    {searches} AS total_searches,
                    {arrests} AS total_arrests
             FROM {table}
             {w}
             GROUP BY violation
             ORDER BY total_searches DESC NULLS LAST, total_arrests DESC NULLS LAST, violation"
        ),
        PanelId::YoungDriverViolations => format!(
            "SELECT violation, COUNT(*) AS violation_count
             FROM {table}
             {w}
             GROUP BY violation
             ORDER BY violation_count DESC, violation"
        ),
        PanelId::DrugStopsByCountry => format!(
            "SELECT country_name AS country, COUNT(*) AS drug_stop_count
             FROM {table}
             {w}
             GROUP BY country
             ORDER BY drug_stop_count DESC, country"
        ),
        PanelId::ArrestRateByCountryViolation => format!(
            "SELECT country_name AS country,
                    violation,
                    COUNT(*) AS total_stops,
                    {arrests} AS total_arrests,
                    {arrest_rate} AS arrest_rate_percent
             FROM {table}
             {w}
             GROUP BY country, violation
             ORDER BY arrest_rate_percent DESC NULLS LAST, country, violation"
        ),
        PanelId::SearchesByCountry => format!(
            "SELECT country_name AS country, COUNT(*) AS total_search_stops
             FROM {table}
             {w}
             GROUP BY country
             ORDER BY total_search_stops DESC, country"
        ),
        PanelId::YearlyByCountry => format!(
            "SELECT country_name AS country,
                    year(stop_date) AS \"year\",
                    COUNT(*) AS total_stops,
                    {arrests} AS total_arrests
             FROM {table}
             {w}
             GROUP BY country, \"year\"
             ORDER BY country, \"year\""
        ),
        PanelId::ViolationTrendsByAgeRace => format!(
            "SELECT driver_race,
                    {AGE_GROUP_SQL} AS driver_age_group,
                    violation,
                    COUNT(*) AS violation_count
             FROM {table}
             {w}
             GROUP BY driver_race, driver_age_group, violation
             ORDER BY violation_count DESC, driver_race, driver_age_group, violation"
        ),
        PanelId::StopsByYearMonthHour => format!(
            "SELECT year(stop_date) AS \"year\",
                    month(stop_date) AS \"month\",
                    hour(stop_time) AS \"hour\",
                    COUNT(*) AS stop_count
             FROM {table}
             {w}
             GROUP BY \"year\", \"month\", \"hour\"
             ORDER BY \"year\", \"month\", \"hour\""
        ),
        PanelId::ViolationsHighSearchArrest => format!(
            "SELECT violation,
                    total_stops,
                    total_searches,
                    total_arrests,
                    ROUND(CAST(total_searches AS DOUBLE) / total_stops * 100, 2) AS search_rate,
                    ROUND(CAST(total_arrests AS DOUBLE) / total_stops * 100, 2) AS arrest_rate
             FROM (
                 SELECT violation,
                        COUNT(*) AS total_stops,
                        {searches} AS total_searches,
                        {arrests} AS total_arrests
                 FROM {table}
                 {w}
                 GROUP BY violation
             ) AS t
             ORDER BY search_rate DESC NULLS LAST, arrest_rate DESC NULLS LAST, violation"
        ),
        PanelId::DemographicsByCountry => format!(
            "SELECT country_name AS country,
                    driver_gender,
                    driver_race,
                    {AGE_GROUP_SQL} AS driver_age_group,
                    COUNT(*) AS \"count\"
             FROM {table}
             {w}
             GROUP BY country, driver_gender, driver_race, driver_age_group
             ORDER BY \"count\" DESC, country, driver_gender, driver_race, driver_age_group"
        ),
        PanelId::TopViolationsByArrestRate => format!(
            "SELECT violation,
                    COUNT(*) AS total_stops,
                    {arrests} AS total_arrests,
                    {arrest_rate} AS arrest_rate_percent
             FROM {table}
             {w}
             GROUP BY violation
             ORDER BY arrest_rate_percent DESC NULLS LAST, violation"
        ),
    };

    Ok(match limit(id) {
        Some(n) => format!("{body}\n             LIMIT {n}"),
        None => body,
    })
}

/// `COUNT(*)` of rows matching the predicate.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the table name is rejected.
pub fn total_logs_sql(table: &str, predicate: &FilterPredicate) -> Result<String, AnalyticsError> {
    let table = validate_table_name(table)?;
    Ok(format!(
        "SELECT COUNT(*) FROM {table} {}",
        predicate.where_clause()
    ))
}

/// Matching rows with a non-null, non-empty violation.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the table name is rejected.
pub fn total_violations_sql(
    table: &str,
    predicate: &FilterPredicate,
) -> Result<String, AnalyticsError> {
    let table = validate_table_name(table)?;
    Ok(format!(
        "SELECT COUNT(*) FROM {table} {}",
        predicate.where_clause_and(Some("violation IS NOT NULL AND violation <> ''"))
    ))
}

/// Distinct vehicles with at least [`HIGH_RISK_STOP_THRESHOLD`] matching
/// stops.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the table name is rejected.
pub fn high_risk_vehicles_sql(
    table: &str,
    predicate: &FilterPredicate,
) -> Result<String, AnalyticsError> {
    let table = validate_table_name(table)?;
    Ok(format!(
        "SELECT COUNT(*) FROM (
             SELECT vehicle_number
             FROM {table}
             {}
             GROUP BY vehicle_number
             HAVING COUNT(*) >= {HIGH_RISK_STOP_THRESHOLD}
         ) AS t",
        predicate.where_clause()
    ))
}

/// Distinct non-null values of a filterable column, sorted ascending.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the table name is rejected.
pub fn distinct_values_sql(table: &str, column: StopColumn) -> Result<String, AnalyticsError> {
    let table = validate_table_name(table)?;
    let column = column.name();
    Ok(format!(
        "SELECT DISTINCT CAST({column} AS VARCHAR) AS v FROM {table} WHERE {column} IS NOT NULL ORDER BY v"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use securecheck_analytics_models::{DateRange, FilterSelection};

    fn predicate() -> FilterPredicate {
        let selection = FilterSelection {
            races: vec!["Asian".to_string(), "White".to_string()],
            ..FilterSelection::default()
        };
        FilterPredicate::build(&selection, &DateRange::default())
    }

    #[test]
    fn every_panel_uses_exactly_the_predicate_placeholders() {
        let predicate = predicate();
        for id in PanelId::all() {
            let sql = panel_sql(*id, "traffic_stops", &predicate).unwrap();
            assert_eq!(
                sql.matches('?').count(),
                predicate.params().len(),
                "placeholder mismatch in {id}"
            );
            assert!(sql.contains("FROM traffic_stops"), "{id} ignores the table");
        }
    }

    #[test]
    fn extra_conditions_follow_the_shared_predicate() {
        let sql = panel_sql(PanelId::DrugStopsByVehicle, "traffic_stops", &predicate()).unwrap();
        assert!(sql.contains("driver_race IN (?, ?) AND drugs_related_stop = 1"));
        assert!(sql.trim_end().ends_with("LIMIT 10"));
    }

    #[test]
    fn top_violations_are_limited_to_five() {
        let sql = panel_sql(
            PanelId::TopViolationsByArrestRate,
            "traffic_stops",
            &predicate(),
        )
        .unwrap();
        assert!(sql.trim_end().ends_with("LIMIT 5"));
    }

    #[test]
    fn unlimited_panels_have_no_limit_clause() {
        let sql = panel_sql(PanelId::StopsByHour, "traffic_stops", &predicate()).unwrap();
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn rejects_unsafe_table_names() {
        assert!(panel_sql(PanelId::StopsByHour, "t; DROP TABLE x", &predicate()).is_err());
        assert!(total_logs_sql("bad name", &predicate()).is_err());
    }
}
