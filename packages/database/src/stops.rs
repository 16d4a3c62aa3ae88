//! Traffic-stop record storage.
//!
//! Records are inserted one row at a time through a single prepared
//! statement inside one transaction. The transaction is committed once
//! after the last row; any failure before that rolls everything back.

use chrono::{NaiveDate, NaiveTime};
use duckdb::{Connection, params_from_iter};
use securecheck_stop_models::{StopColumn, TrafficStopRecord};

use crate::schema::validate_table_name;
use crate::{DbError, SqlValue};

/// Returns the bound value of one column of a record.
///
/// Dates and times are sent in their canonical string forms
/// (`YYYY-MM-DD`, `HH:MM:SS`) and cast by `DuckDB` on insert.
#[must_use]
pub fn column_value(record: &TrafficStopRecord, column: StopColumn) -> SqlValue {
    match column {
        StopColumn::StopDate => record
            .stop_date
            .map_or(SqlValue::Null, |d| SqlValue::Text(d.format("%Y-%m-%d").to_string())),
        StopColumn::StopTime => record
            .stop_time
            .map_or(SqlValue::Null, |t| SqlValue::Text(t.format("%H:%M:%S").to_string())),
        StopColumn::CountryName => SqlValue::from_text(record.country_name.as_deref()),
        StopColumn::DriverGender => SqlValue::from_text(record.driver_gender.as_deref()),
        StopColumn::DriverAgeRaw => SqlValue::from_int(record.driver_age_raw),
        StopColumn::DriverAge => SqlValue::from_int(record.driver_age),
        StopColumn::DriverRace => SqlValue::from_text(record.driver_race.as_deref()),
        StopColumn::ViolationRaw => SqlValue::from_text(record.violation_raw.as_deref()),
        StopColumn::Violation => SqlValue::from_text(record.violation.as_deref()),
        StopColumn::SearchConducted => SqlValue::from_int(record.search_conducted),
        StopColumn::SearchType => SqlValue::from_text(record.search_type.as_deref()),
        StopColumn::StopOutcome => SqlValue::from_text(record.stop_outcome.as_deref()),
        StopColumn::IsArrested => SqlValue::from_int(record.is_arrested),
        StopColumn::StopDuration => SqlValue::from_text(record.stop_duration.as_deref()),
        StopColumn::DrugsRelatedStop => SqlValue::from_int(record.drugs_related_stop),
        StopColumn::VehicleNumber => SqlValue::from_text(record.vehicle_number.as_deref()),
    }
}

/// Builds the parameterized `INSERT` statement for the given columns.
///
/// # Errors
///
/// Returns [`DbError::InvalidTableName`] if the table name is rejected.
pub fn insert_sql(table: &str, columns: &[StopColumn]) -> Result<String, DbError> {
    let table = validate_table_name(table)?;
    let names = columns
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");

    Ok(format!(
        "INSERT INTO {table} ({names}) VALUES ({placeholders})"
    ))
}

/// Inserts records row by row inside a single transaction.
///
/// `on_inserted` is called with the running total after each row. Returns
/// the number of rows inserted. There is no deduplication: inserting the
/// same records twice stores them twice.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails. The transaction is rolled back
/// and no rows from this call remain.
pub fn insert_records(
    conn: &mut Connection,
    table: &str,
    columns: &[StopColumn],
    records: &[TrafficStopRecord],
    mut on_inserted: impl FnMut(u64),
) -> Result<u64, DbError> {
    let sql = insert_sql(table, columns)?;
    log::debug!("Insert statement: {sql}");

    let tx = conn.transaction()?;
    let mut inserted = 0u64;

    {
        let mut stmt = tx.prepare(&sql)?;
        for record in records {
            let values = columns.iter().map(|c| column_value(record, *c));
            let rows = stmt.execute(params_from_iter(values))?;
            inserted += u64::try_from(rows).unwrap_or(0);
            on_inserted(inserted);
        }
    }

    tx.commit()?;
    log::info!("Committed {inserted} rows into {table}");

    Ok(inserted)
}

/// Deletes every row from the table. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError`] if the table name is invalid or the delete fails.
pub fn truncate(conn: &Connection, table: &str) -> Result<u64, DbError> {
    let table = validate_table_name(table)?;
    let removed = conn.execute(&format!("DELETE FROM {table}"), [])?;
    log::info!("Removed {removed} existing rows from {table}");
    Ok(u64::try_from(removed).unwrap_or(0))
}

/// Returns the number of rows stored in the table.
///
/// # Errors
///
/// Returns [`DbError`] if the table name is invalid or the query fails.
pub fn count_rows(conn: &Connection, table: &str) -> Result<u64, DbError> {
    let table = validate_table_name(table)?;
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    #[allow(clippy::cast_sign_loss)]
    Ok(count.max(0) as u64)
}

/// Reads every stored record back, in insertion order.
///
/// Only the listed columns are read; the remaining fields stay `None`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored value cannot be
/// converted back into its record field.
pub fn fetch_records(
    conn: &Connection,
    table: &str,
    columns: &[StopColumn],
) -> Result<Vec<TrafficStopRecord>, DbError> {
    let table = validate_table_name(table)?;
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let select = columns
        .iter()
        .map(|c| format!("CAST({0} AS VARCHAR) AS {0}", c.name()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT {select} FROM {table} ORDER BY rowid");

    let mut stmt = conn.prepare(&sql)?;
    let raw_rows = stmt
        .query_map([], |row| {
            (0..columns.len())
                .map(|i| row.get::<_, Option<String>>(i))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw_rows
        .into_iter()
        .map(|raw| {
            let mut record = TrafficStopRecord::default();
            for (column, value) in columns.iter().zip(raw) {
                assign(&mut record, *column, value)?;
            }
            Ok(record)
        })
        .collect()
}

fn assign(
    record: &mut TrafficStopRecord,
    column: StopColumn,
    value: Option<String>,
) -> Result<(), DbError> {
    match column {
        StopColumn::StopDate => {
            record.stop_date = value
                .map(|v| {
                    NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|e| DbError::Conversion {
                        message: format!("Invalid stored date {v:?}: {e}"),
                    })
                })
                .transpose()?;
        }
        StopColumn::StopTime => {
            record.stop_time = value
                .map(|v| {
                    NaiveTime::parse_from_str(&v, "%H:%M:%S")
                        .or_else(|_| NaiveTime::parse_from_str(&v, "%H:%M:%S%.f"))
                        .map_err(|e| DbError::Conversion {
                            message: format!("Invalid stored time {v:?}: {e}"),
                        })
                })
                .transpose()?;
        }
        StopColumn::DriverAgeRaw => record.driver_age_raw = parse_int(value)?,
        StopColumn::DriverAge => record.driver_age = parse_int(value)?,
        StopColumn::SearchConducted => record.search_conducted = parse_int(value)?,
        StopColumn::IsArrested => record.is_arrested = parse_int(value)?,
        StopColumn::DrugsRelatedStop => record.drugs_related_stop = parse_int(value)?,
        StopColumn::CountryName => record.country_name = value,
        StopColumn::DriverGender => record.driver_gender = value,
        StopColumn::DriverRace => record.driver_race = value,
        StopColumn::ViolationRaw => record.violation_raw = value,
        StopColumn::Violation => record.violation = value,
        StopColumn::SearchType => record.search_type = value,
        StopColumn::StopOutcome => record.stop_outcome = value,
        StopColumn::StopDuration => record.stop_duration = value,
        StopColumn::VehicleNumber => record.vehicle_number = value,
    }
    Ok(())
}

fn parse_int(value: Option<String>) -> Result<Option<i32>, DbError> {
    value
        .map(|v| {
            v.parse::<i32>().map_err(|e| DbError::Conversion {
                message: format!("Invalid stored integer {v:?}: {e}"),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::create_table_if_not_exists;

    fn record(vehicle: &str, day: u32) -> TrafficStopRecord {
        TrafficStopRecord {
            stop_date: NaiveDate::from_ymd_opt(2020, 1, day),
            stop_time: NaiveTime::from_hms_opt(20, 15, 0),
            country_name: Some("India".to_string()),
            driver_gender: Some("Male".to_string()),
            driver_age_raw: Some(31),
            driver_age: Some(31),
            driver_race: Some("Asian".to_string()),
            violation_raw: Some("Speeding".to_string()),
            violation: Some("Speeding".to_string()),
            search_conducted: Some(0),
            search_type: Some("Vehicle Search".to_string()),
            stop_outcome: Some("Ticket".to_string()),
            is_arrested: Some(1),
            stop_duration: Some("0-15 Min".to_string()),
            drugs_related_stop: Some(0),
            vehicle_number: Some(vehicle.to_string()),
        }
    }

    fn setup(columns: &[StopColumn]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_table_if_not_exists(&conn, "traffic_stops", columns).unwrap();
        conn
    }

    #[test]
    fn insert_sql_uses_one_placeholder_per_column() {
        let sql = insert_sql(
            "traffic_stops",
            &[StopColumn::StopDate, StopColumn::VehicleNumber],
        )
        .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO traffic_stops (stop_date, vehicle_number) VALUES (?, ?)"
        );
    }

    #[test]
    fn round_trips_fully_populated_records() {
        let mut conn = setup(StopColumn::all());
        let records = vec![record("TN01", 1), record("TN02", 2), record("TN03", 3)];

        let mut progress = Vec::new();
        let inserted = insert_records(
            &mut conn,
            "traffic_stops",
            StopColumn::all(),
            &records,
            |n| progress.push(n),
        )
        .unwrap();

        assert_eq!(inserted, 3);
        assert_eq!(progress, vec![1, 2, 3]);
        assert_eq!(count_rows(&conn, "traffic_stops").unwrap(), 3);

        let fetched = fetch_records(&conn, "traffic_stops", StopColumn::all()).unwrap();
        assert_eq!(fetched, records);
    }

    #[test]
    fn stores_missing_values_as_null() {
        let mut conn = setup(StopColumn::all());
        let sparse = TrafficStopRecord {
            vehicle_number: Some("KA05".to_string()),
            ..TrafficStopRecord::default()
        };

        insert_records(&mut conn, "traffic_stops", StopColumn::all(), &[sparse.clone()], |_| {})
            .unwrap();

        let nulls: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM traffic_stops WHERE stop_date IS NULL AND driver_age IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
        let fetched = fetch_records(&conn, "traffic_stops", StopColumn::all()).unwrap();
        assert_eq!(fetched, vec![sparse]);
    }

    #[test]
    fn loading_twice_duplicates_rows() {
        let mut conn = setup(StopColumn::all());
        let records = vec![record("TN01", 1), record("TN02", 2)];

        insert_records(&mut conn, "traffic_stops", StopColumn::all(), &records, |_| {}).unwrap();
        insert_records(&mut conn, "traffic_stops", StopColumn::all(), &records, |_| {}).unwrap();

        assert_eq!(count_rows(&conn, "traffic_stops").unwrap(), 4);
    }

    #[test]
    fn truncate_empties_the_table() {
        let mut conn = setup(StopColumn::all());
        insert_records(
            &mut conn,
            "traffic_stops",
            StopColumn::all(),
            &[record("TN01", 1)],
            |_| {},
        )
        .unwrap();

        assert_eq!(truncate(&conn, "traffic_stops").unwrap(), 1);
        assert_eq!(count_rows(&conn, "traffic_stops").unwrap(), 0);
    }

    #[test]
    fn failed_insert_rolls_back_the_whole_batch() {
        // Table is missing `vehicle_number`, so the first insert fails.
        let mut conn = setup(&[StopColumn::StopDate]);
        let result = insert_records(
            &mut conn,
            "traffic_stops",
            &[StopColumn::StopDate, StopColumn::VehicleNumber],
            &[record("TN01", 1), record("TN02", 2)],
            |_| {},
        );

        assert!(result.is_err());
        assert_eq!(count_rows(&conn, "traffic_stops").unwrap(), 0);
    }

    #[test]
    fn only_selected_columns_are_written() {
        let columns = [StopColumn::StopDate, StopColumn::VehicleNumber];
        let mut conn = setup(&columns);

        insert_records(&mut conn, "traffic_stops", &columns, &[record("TN09", 9)], |_| {}).unwrap();

        let fetched = fetch_records(&conn, "traffic_stops", &columns).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].vehicle_number.as_deref(), Some("TN09"));
        assert_eq!(fetched[0].stop_date, NaiveDate::from_ymd_opt(2020, 1, 9));
        assert_eq!(fetched[0].driver_age, None);
    }
}
