//! Runs catalog queries and reads their results into [`PanelTable`]s.
//!
//! Every function here is read-only and takes the connection only for the
//! duration of the call.

use std::ops::Deref;

use duckdb::types::Value;
use duckdb::{Connection, params_from_iter};
use securecheck_analytics_models::{
    Cell, FilterOptions, HeadlineMetrics, PanelId, PanelResult, PanelTable,
};
use securecheck_database::{SqlValue, schema};
use securecheck_stop_models::{DriverGender, StopColumn};

use crate::AnalyticsError;
use crate::cache::PanelCache;
use crate::catalog;
use crate::filter::FilterPredicate;

/// Executes a query and collects every row, with column names taken from
/// the executed statement.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if preparing or running the query
/// fails.
pub fn query_table(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
) -> Result<PanelTable, AnalyticsError> {
    log::debug!("Running query with {} params:\n{sql}", params.len());

    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(params))?;
    let columns = rows
        .as_ref()
        .map(duckdb::Statement::column_names)
        .unwrap_or_default();

    let mut table_rows = Vec::new();
    while let Some(row) = rows.next()? {
        let cells = (0..columns.len())
            .map(|i| row.get::<_, Value>(i).map(cell_from_value))
            .collect::<Result<Vec<_>, _>>()?;
        table_rows.push(cells);
    }

    Ok(PanelTable {
        columns,
        rows: table_rows,
    })
}

#[allow(clippy::cast_precision_loss)]
fn cell_from_value(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Null,
        Value::Boolean(v) => Cell::Int(i64::from(v)),
        Value::TinyInt(v) => Cell::Int(i64::from(v)),
        Value::SmallInt(v) => Cell::Int(i64::from(v)),
        Value::Int(v) => Cell::Int(i64::from(v)),
        Value::BigInt(v) => Cell::Int(v),
        Value::UTinyInt(v) => Cell::Int(i64::from(v)),
        Value::USmallInt(v) => Cell::Int(i64::from(v)),
        Value::UInt(v) => Cell::Int(i64::from(v)),
        Value::UBigInt(v) => i64::try_from(v).map_or(Cell::Float(v as f64), Cell::Int),
        Value::HugeInt(v) => i64::try_from(v).map_or(Cell::Float(v as f64), Cell::Int),
        Value::Float(v) => Cell::Float(f64::from(v)),
        Value::Double(v) => Cell::Float(v),
        Value::Text(v) => Cell::Text(v),
        other => Cell::Text(format!("{other:?}")),
    }
}

/// Runs one catalog panel.
///
/// An empty result is an empty table, not an error.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the table name is invalid or the
/// query fails.
pub fn run_panel(
    conn: &Connection,
    table: &str,
    predicate: &FilterPredicate,
    id: PanelId,
) -> Result<PanelTable, AnalyticsError> {
    let sql = catalog::panel_sql(id, table, predicate)?;
    let result = query_table(conn, &sql, predicate.params())?;
    log::debug!("Panel {id} returned {} rows", result.rows.len());
    Ok(result)
}

/// Runs one catalog panel through a request-scoped cache.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the query fails.
pub fn run_panel_cached(
    conn: &Connection,
    table: &str,
    predicate: &FilterPredicate,
    id: PanelId,
    cache: &mut PanelCache,
) -> Result<PanelTable, AnalyticsError> {
    cache.get_or_fetch(predicate, id, || run_panel(conn, table, predicate, id))
}

/// Runs the given panels in order, sharing one cache.
///
/// `connect` is called once per panel and the handle it returns is dropped
/// as soon as that panel's query finishes, so a pooled connection is never
/// held across the whole batch.
///
/// # Errors
///
/// Returns the first panel failure.
pub fn run_panels<C, F>(
    connect: F,
    table: &str,
    predicate: &FilterPredicate,
    ids: &[PanelId],
    cache: &mut PanelCache,
) -> Result<Vec<PanelResult>, AnalyticsError>
where
    F: Fn() -> C,
    C: Deref<Target = Connection>,
{
    ids.iter()
        .map(|id| {
            let conn = connect();
            let table = run_panel_cached(&conn, table, predicate, *id, cache)?;
            Ok(PanelResult::new(*id, table))
        })
        .collect()
}

/// Runs every catalog panel in dashboard order.
///
/// # Errors
///
/// Returns the first panel failure.
pub fn run_all<C, F>(
    connect: F,
    table: &str,
    predicate: &FilterPredicate,
) -> Result<Vec<PanelResult>, AnalyticsError>
where
    F: Fn() -> C,
    C: Deref<Target = Connection>,
{
    let mut cache = PanelCache::new();
    run_panels(connect, table, predicate, PanelId::all(), &mut cache)
}

fn count(conn: &Connection, sql: &str, params: &[SqlValue]) -> Result<u64, AnalyticsError> {
    log::debug!("Running count:\n{sql}");
    let n: i64 = conn.query_row(sql, params_from_iter(params), |row| row.get(0))?;
    Ok(u64::try_from(n).unwrap_or(0))
}

/// Computes the three headline metrics under the predicate.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if any count query fails.
pub fn headline_metrics(
    conn: &Connection,
    table: &str,
    predicate: &FilterPredicate,
) -> Result<HeadlineMetrics, AnalyticsError> {
    let params = predicate.params();

    Ok(HeadlineMetrics {
        total_logs: count(conn, &catalog::total_logs_sql(table, predicate)?, params)?,
        total_violations: count(conn, &catalog::total_violations_sql(table, predicate)?, params)?,
        high_risk_vehicles: count(
            conn,
            &catalog::high_risk_vehicles_sql(table, predicate)?,
            params,
        )?,
    })
}

/// Loads the option lists for the dashboard filters.
///
/// Columns missing from the table (dropped at load time) yield empty lists.
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if a query fails.
pub fn filter_options(conn: &Connection, table: &str) -> Result<FilterOptions, AnalyticsError> {
    let present = schema::table_columns(conn, table)?;

    let distinct = |column: StopColumn| -> Result<Vec<String>, AnalyticsError> {
        if !present.iter().any(|c| c == column.name()) {
            log::warn!("Column {column} is not in {table}; no filter options");
            return Ok(Vec::new());
        }

        let sql = catalog::distinct_values_sql(table, column)?;
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    };

    Ok(FilterOptions {
        vehicles: distinct(StopColumn::VehicleNumber)?,
        violations: distinct(StopColumn::Violation)?,
        genders: DriverGender::all().iter().map(ToString::to_string).collect(),
        races: distinct(StopColumn::DriverRace)?,
        countries: distinct(StopColumn::CountryName)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use securecheck_analytics_models::{DateRange, FilterSelection};
    use securecheck_database::stops;
    use securecheck_stop_models::TrafficStopRecord;

    const TABLE: &str = "traffic_stops";

    #[derive(Clone, Copy)]
    struct Stop {
        vehicle: &'static str,
        date: (i32, u32, u32),
        hour: u32,
        violation: &'static str,
        country: &'static str,
        gender: &'static str,
        race: &'static str,
        age: Option<i32>,
        searched: i32,
        arrested: i32,
        drugs: i32,
        duration: &'static str,
    }

    const BASE: Stop = Stop {
        vehicle: "TN01",
        date: (2020, 6, 15),
        hour: 10,
        violation: "Speeding",
        country: "India",
        gender: "Male",
        race: "Asian",
        age: Some(30),
        searched: 0,
        arrested: 0,
        drugs: 0,
        duration: "0-15 Min",
    };

    fn record(stop: Stop) -> TrafficStopRecord {
        let (y, m, d) = stop.date;
        TrafficStopRecord {
            stop_date: NaiveDate::from_ymd_opt(y, m, d),
            stop_time: NaiveTime::from_hms_opt(stop.hour, 0, 0),
            country_name: Some(stop.country.to_string()),
            driver_gender: Some(stop.gender.to_string()),
            driver_age_raw: stop.age,
            driver_age: stop.age,
            driver_race: Some(stop.race.to_string()),
            violation_raw: Some(stop.violation.to_string()),
            violation: Some(stop.violation.to_string()),
            search_conducted: Some(stop.searched),
            search_type: Some("Vehicle Search".to_string()),
            stop_outcome: Some("Ticket".to_string()),
            is_arrested: Some(stop.arrested),
            stop_duration: Some(stop.duration.to_string()),
            drugs_related_stop: Some(stop.drugs),
            vehicle_number: Some(stop.vehicle.to_string()),
        }
    }

    fn setup(stops: &[Stop]) -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::create_table_if_not_exists(&conn, TABLE, StopColumn::all()).unwrap();
        let records: Vec<_> = stops.iter().copied().map(record).collect();
        stops::insert_records(&mut conn, TABLE, StopColumn::all(), &records, |_| {}).unwrap();
        conn
    }

    fn year_2020() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        )
    }

    fn all_2020() -> FilterPredicate {
        FilterPredicate::new(&year_2020())
    }

    fn repeat(stop: Stop, n: usize) -> Vec<Stop> {
        vec![stop; n]
    }

    #[test]
    fn high_risk_counts_vehicles_with_four_or_more_stops() {
        let mut stops = repeat(Stop { vehicle: "A", ..BASE }, 4);
        stops.extend(repeat(Stop { vehicle: "B", ..BASE }, 3));
        stops.extend(repeat(Stop { vehicle: "C", ..BASE }, 5));
        let conn = setup(&stops);

        let metrics = headline_metrics(&conn, TABLE, &all_2020()).unwrap();
        assert_eq!(metrics.total_logs, 12);
        assert_eq!(metrics.total_violations, 12);
        assert_eq!(metrics.high_risk_vehicles, 2);
    }

    #[test]
    fn total_violations_skips_empty_violations() {
        let conn = setup(&[BASE, Stop { violation: "", ..BASE }]);
        let metrics = headline_metrics(&conn, TABLE, &all_2020()).unwrap();
        assert_eq!(metrics.total_logs, 2);
        assert_eq!(metrics.total_violations, 1);
    }

    #[test]
    fn arrest_rate_is_a_rounded_percentage() {
        let mut stops = repeat(BASE, 7);
        stops.extend(repeat(Stop { arrested: 1, ..BASE }, 3));
        let conn = setup(&stops);

        let table =
            run_panel(&conn, TABLE, &all_2020(), PanelId::TopViolationsByArrestRate).unwrap();
        assert_eq!(
            table.columns,
            vec!["violation", "total_stops", "total_arrests", "arrest_rate_percent"]
        );
        assert_eq!(
            table.rows,
            vec![vec![
                Cell::Text("Speeding".to_string()),
                Cell::Int(10),
                Cell::Int(3),
                Cell::Float(30.0),
            ]]
        );
    }

    #[test]
    fn selected_dimension_restricts_every_row() {
        let conn = setup(&[
            Stop { violation: "DUI", ..BASE },
            Stop { violation: "Speeding", ..BASE },
            Stop { violation: "Seatbelt", ..BASE },
            Stop { violation: "DUI", country: "USA", ..BASE },
        ]);
        let selection = FilterSelection {
            violations: vec!["DUI".to_string(), "Seatbelt".to_string()],
            ..FilterSelection::default()
        };
        let predicate = FilterPredicate::build(&selection, &year_2020());

        let table =
            run_panel(&conn, TABLE, &predicate, PanelId::ViolationSearchesArrests).unwrap();
        let violations: Vec<&str> = table
            .column("violation")
            .unwrap()
            .iter()
            .filter_map(|c| c.as_text())
            .collect();
        assert_eq!(violations, vec!["DUI", "Seatbelt"]);

        let metrics = headline_metrics(&conn, TABLE, &predicate).unwrap();
        assert_eq!(metrics.total_logs, 3);
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let conn = setup(&[
            Stop { date: (2019, 12, 31), ..BASE },
            Stop { date: (2020, 1, 1), hour: 0, ..BASE },
            Stop { date: (2020, 12, 31), hour: 23, ..BASE },
            Stop { date: (2021, 1, 1), ..BASE },
        ]);

        let metrics = headline_metrics(&conn, TABLE, &all_2020()).unwrap();
        assert_eq!(metrics.total_logs, 2);
    }

    #[test]
    fn single_date_matches_only_that_day() {
        let conn = setup(&[
            Stop { date: (2020, 3, 4), ..BASE },
            Stop { date: (2020, 3, 4), ..BASE },
            Stop { date: (2020, 3, 5), ..BASE },
        ]);
        let day = DateRange::single(NaiveDate::from_ymd_opt(2020, 3, 4).unwrap());

        let metrics = headline_metrics(&conn, TABLE, &FilterPredicate::new(&day)).unwrap();
        assert_eq!(metrics.total_logs, 2);
    }

    #[test]
    fn every_panel_runs_and_empty_windows_return_empty_tables() {
        let conn = setup(&[
            BASE,
            Stop { vehicle: "KA05", arrested: 1, searched: 1, drugs: 1, age: Some(19), ..BASE },
            Stop { country: "USA", gender: "Female", race: "White", hour: 22, ..BASE },
        ]);

        let populated = run_all(|| &conn, TABLE, &all_2020()).unwrap();
        assert_eq!(populated.len(), PanelId::all().len());
        assert!(populated.iter().all(|p| !p.table.columns.is_empty()));
        assert!(populated.iter().any(|p| !p.table.is_empty()));

        let empty_range = DateRange::single(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap());
        let empty = run_all(|| &conn, TABLE, &FilterPredicate::new(&empty_range)).unwrap();
        assert!(empty.iter().all(|p| p.table.is_empty()));
    }

    #[test]
    fn ranked_panels_carry_their_leading_row() {
        let conn = setup(&[
            Stop { country: "USA", searched: 1, ..BASE },
            Stop { country: "USA", searched: 1, ..BASE },
            Stop { searched: 1, ..BASE },
        ]);
        let mut cache = PanelCache::new();

        let results = run_panels(
            || &conn,
            TABLE,
            &all_2020(),
            &[PanelId::SearchesByCountry, PanelId::StopsByHour],
            &mut cache,
        )
        .unwrap();

        let highlight = results[0].highlight.as_ref().unwrap();
        assert_eq!(highlight.heading, "Highest Search-Conducted Stops");
        assert_eq!(highlight.subject, "USA");
        assert_eq!(highlight.value, Cell::Int(2));
        assert!(results[1].highlight.is_none());
    }

    #[test]
    fn null_ages_fall_into_the_oldest_bucket() {
        let conn = setup(&[
            Stop { age: None, arrested: 1, ..BASE },
            Stop { age: Some(70), arrested: 1, ..BASE },
            Stop { age: Some(17), arrested: 1, ..BASE },
            Stop { age: Some(22), arrested: 0, ..BASE },
        ]);

        let table = run_panel(&conn, TABLE, &all_2020(), PanelId::ArrestsByAgeGroup).unwrap();
        assert_eq!(
            table.rows,
            vec![
                vec![Cell::Text("60+".to_string()), Cell::Int(2)],
                vec![Cell::Text("Under 18".to_string()), Cell::Int(1)],
            ]
        );
    }

    #[test]
    fn time_periods_split_night_and_day() {
        let conn = setup(&[
            Stop { hour: 21, arrested: 1, ..BASE },
            Stop { hour: 3, ..BASE },
            Stop { hour: 12, ..BASE },
            Stop { hour: 19, ..BASE },
        ]);

        let table =
            run_panel(&conn, TABLE, &all_2020(), PanelId::ArrestRateByTimePeriod).unwrap();
        let periods: Vec<&str> = table
            .column("time_period")
            .unwrap()
            .iter()
            .filter_map(|c| c.as_text())
            .collect();
        assert_eq!(
            periods,
            vec!["Night (8 PM-11 PM)", "Daytime (6 AM-7 PM)", "Night (12 AM-5 AM)"]
        );
        assert_eq!(table.rows[0][3], Cell::Float(100.0));
    }

    #[test]
    fn duration_average_uses_leading_minutes() {
        let conn = setup(&[
            Stop { duration: "16-30 Min", ..BASE },
            Stop { duration: "0-15 Min", ..BASE },
            Stop { duration: "unknown", ..BASE },
        ]);

        let table =
            run_panel(&conn, TABLE, &all_2020(), PanelId::AvgDurationByViolation).unwrap();
        assert_eq!(table.rows[0][1], Cell::Float(8.0));
    }

    #[test]
    fn filter_options_are_distinct_and_sorted() {
        let conn = setup(&[
            Stop { country: "USA", vehicle: "Z9", ..BASE },
            Stop { country: "Canada", vehicle: "A1", ..BASE },
            Stop { country: "USA", vehicle: "A1", ..BASE },
        ]);

        let options = filter_options(&conn, TABLE).unwrap();
        assert_eq!(options.countries, vec!["Canada", "USA"]);
        assert_eq!(options.vehicles, vec!["A1", "Z9"]);
        assert_eq!(options.genders, vec!["Male", "Female", "Other"]);
        assert_eq!(options.violations, vec!["Speeding"]);
    }

    #[test]
    fn filter_options_tolerate_dropped_columns() {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_table_if_not_exists(
            &conn,
            TABLE,
            &[StopColumn::StopDate, StopColumn::CountryName],
        )
        .unwrap();

        let options = filter_options(&conn, TABLE).unwrap();
        assert!(options.vehicles.is_empty());
        assert!(options.countries.is_empty());
        assert_eq!(options.genders.len(), 3);
    }

    #[test]
    fn cached_panels_are_fetched_once_per_request() {
        let conn = setup(&[BASE]);
        let predicate = all_2020();
        let mut cache = PanelCache::new();

        let results = run_panels(
            || &conn,
            TABLE,
            &predicate,
            &[PanelId::StopsByHour, PanelId::StopsByHour],
            &mut cache,
        )
        .unwrap();

        assert_eq!(results[0], results[1]);
        assert_eq!(cache.hits(), 1);
    }
}
