//! CSV download of panel tables.

use securecheck_analytics_models::PanelTable;

use crate::AnalyticsError;

/// Serializes a table as CSV: a header row of column names, then one record
/// per row. Null cells are written as empty fields.
///
/// # Errors
///
/// Returns [`AnalyticsError::Csv`] if a record cannot be written.
pub fn to_csv(table: &PanelTable) -> Result<Vec<u8>, AnalyticsError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;

    for row in &table.rows {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }

    writer
        .into_inner()
        .map_err(|e| AnalyticsError::Csv(csv::Error::from(e.into_error())))
}
