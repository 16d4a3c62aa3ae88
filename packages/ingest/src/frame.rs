//! In-memory CSV table and the cleaning pre-pass.
//!
//! The whole dataset is read before anything touches the database, so
//! column-wide decisions (dropping all-null columns, computing the
//! `search_type` mode) see every row.

use std::collections::BTreeMap;

use securecheck_ingest_models::ColumnNulls;

use crate::IngestError;

/// Values treated as missing, compared after trimming.
pub const NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Returns whether a trimmed CSV value denotes a missing value.
#[must_use]
pub fn is_null(value: &str) -> bool {
    NULL_MARKERS.contains(&value.trim())
}

/// A parsed CSV file: trimmed headers and rows of nullable trimmed values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopFrame {
    /// Column headers in file order.
    pub headers: Vec<String>,
    /// Data rows; every row has exactly `headers.len()` cells.
    pub rows: Vec<Vec<Option<String>>>,
}

impl StopFrame {
    /// Parses CSV bytes, keeping at most `limit` data rows.
    ///
    /// Short rows are padded with nulls and surplus fields are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Csv`] if the CSV is malformed or
    /// [`IngestError::MissingHeader`] if there is no header row.
    pub fn from_csv_bytes(bytes: &[u8], limit: Option<u64>) -> Result<Self, IngestError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_owned())
            .collect();

        if headers.iter().all(String::is_empty) {
            return Err(IngestError::MissingHeader);
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            if let Some(max) = limit
                && rows.len() as u64 >= max
            {
                log::info!("Reached record limit ({max}), stopping CSV parse");
                break;
            }

            let record = result?;
            let row = (0..headers.len())
                .map(|i| {
                    record
                        .get(i)
                        .map(str::trim)
                        .filter(|v| !is_null(v))
                        .map(str::to_owned)
                })
                .collect();
            rows.push(row);
        }

        log::info!(
            "Parsed {} rows x {} columns from CSV",
            rows.len(),
            headers.len()
        );

        Ok(Self { headers, rows })
    }

    /// Returns the index of the first column with this header.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Counts the nulls in every column, in file order.
    #[must_use]
    pub fn null_counts(&self) -> Vec<ColumnNulls> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| ColumnNulls {
                column: header.clone(),
                nulls: self.rows.iter().filter(|row| row[i].is_none()).count() as u64,
            })
            .collect()
    }

    /// Removes every column whose values are all null and returns the
    /// removed headers in file order.
    ///
    /// A frame without data rows is left untouched.
    pub fn drop_all_null_columns(&mut self) -> Vec<String> {
        if self.rows.is_empty() {
            return Vec::new();
        }

        let keep: Vec<bool> = (0..self.headers.len())
            .map(|i| self.rows.iter().any(|row| row[i].is_some()))
            .collect();

        let dropped: Vec<String> = self
            .headers
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(h, _)| h.clone())
            .collect();

        if dropped.is_empty() {
            return dropped;
        }

        self.headers = retain_by_mask(std::mem::take(&mut self.headers), &keep);
        for row in &mut self.rows {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }

        log::info!("Dropped all-null columns: {}", dropped.join(", "));
        dropped
    }

    /// Returns the most frequent non-null value of a column.
    ///
    /// Ties go to the lexicographically smallest value. Returns `None` if the
    /// column is absent or has no non-null values.
    #[must_use]
    pub fn mode(&self, name: &str) -> Option<String> {
        let idx = self.column_index(name)?;
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for value in self.rows.iter().filter_map(|row| row[idx].as_deref()) {
            *counts.entry(value).or_insert(0) += 1;
        }

        let mut best: Option<(&str, u64)> = None;
        for (value, count) in counts {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((value, count));
            }
        }
        best.map(|(value, _)| value.to_owned())
    }

    /// Replaces every null in a column with `value`. Returns how many cells
    /// were filled.
    pub fn fill_nulls(&mut self, name: &str, value: &str) -> u64 {
        let Some(idx) = self.column_index(name) else {
            return 0;
        };

        let mut filled = 0;
        for row in &mut self.rows {
            if row[idx].is_none() {
                row[idx] = Some(value.to_owned());
                filled += 1;
            }
        }
        filled
    }
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| k.then_some(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(csv: &str) -> StopFrame {
        StopFrame::from_csv_bytes(csv.as_bytes(), None).unwrap()
    }

    #[test]
    fn recognizes_null_markers() {
        for marker in ["", " ", "NA", "N/A", "NaN", "null", "None", "#N/A", "<NA>", " nan "] {
            assert!(is_null(marker), "{marker:?} should be null");
        }
        assert!(!is_null("0"));
        assert!(!is_null("Nancy"));
    }

    #[test]
    fn parses_and_trims_values() {
        let f = frame(" a , b \n 1 ,NA\n,x\n");
        assert_eq!(f.headers, vec!["a", "b"]);
        assert_eq!(
            f.rows,
            vec![
                vec![Some("1".to_string()), None],
                vec![None, Some("x".to_string())],
            ]
        );
    }

    #[test]
    fn pads_short_rows_with_nulls() {
        let f = frame("a,b,c\n1\n");
        assert_eq!(f.rows, vec![vec![Some("1".to_string()), None, None]]);
    }

    #[test]
    fn respects_record_limit() {
        let f = StopFrame::from_csv_bytes(b"a\n1\n2\n3\n", Some(2)).unwrap();
        assert_eq!(f.rows.len(), 2);
    }

    #[test]
    fn counts_nulls_per_column() {
        let f = frame("a,empty,b\n1,,x\n2,NaN,\nNA,None,y\n");
        let null_counts = f.null_counts();
        let counts: Vec<(&str, u64)> = null_counts
            .iter()
            .map(|c| (c.column.as_str(), c.nulls))
            .collect();
        assert_eq!(counts, vec![("a", 1), ("empty", 3), ("b", 1)]);
    }

    #[test]
    fn drops_only_all_null_columns() {
        let mut f = frame("a,empty,b\n1,,x\n2,NaN,\n");
        let dropped = f.drop_all_null_columns();
        assert_eq!(dropped, vec!["empty"]);
        assert_eq!(f.headers, vec!["a", "b"]);
        assert_eq!(f.rows[1], vec![Some("2".to_string()), None]);
    }

    #[test]
    fn header_only_frame_keeps_every_column() {
        let mut f = frame("a,b\n");
        assert!(f.drop_all_null_columns().is_empty());
        assert_eq!(f.headers, vec!["a", "b"]);
    }

    #[test]
    fn mode_prefers_smallest_value_on_ties() {
        let f = frame("search_type\nVehicle\nFrisk\nVehicle\nFrisk\nNA\nArrest\n");
        assert_eq!(f.mode("search_type").as_deref(), Some("Frisk"));
    }

    #[test]
    fn mode_of_missing_or_empty_column_is_none() {
        let f = frame("a,b\n1,\n");
        assert_eq!(f.mode("b"), None);
        assert_eq!(f.mode("search_type"), None);
    }

    #[test]
    fn fill_nulls_replaces_every_missing_value() {
        let mut f = frame("search_type\nFrisk\nN/A\nNA\nVehicle\n");
        let mode = f.mode("search_type").unwrap();
        assert_eq!(f.fill_nulls("search_type", &mode), 2);
        assert!(f.rows.iter().all(|row| row[0].is_some()));
        assert_eq!(f.rows[1][0].as_deref(), Some("Frisk"));
    }
}
