use serde::{Deserialize, Serialize};
use shared::AppError;

use super::webhook::RowId;

/// Destination columns in declared order. The trailing `id` column holds the
/// correlation id (the source row id).
pub const DESTINATION_COLUMNS: [&str; 8] = [
    "branch",
    "account",
    "name",
    "owner",
    "in_filter",
    "in_branch_key",
    "comment",
    "id",
];

/// Number of cell values mapped onto destination columns.
pub const DATA_COLUMN_COUNT: usize = DESTINATION_COLUMNS.len() - 1;

/// Current state of a source row as returned by the row fetcher.
///
/// `cell_values` are already stringified and trimmed, one entry per source
/// column in sheet order; empty cells are `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSnapshot {
    pub row_id: RowId,
    pub version: i64,
    pub cell_values: Vec<String>,
}

/// A row ready to be written, with values in destination column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationRecord {
    values: Vec<String>,
}

impl ReplicationRecord {
    /// Maps the first [`DATA_COLUMN_COUNT`] cells positionally and appends
    /// the row id. Extra trailing cells are not mapped.
    pub fn from_snapshot(snapshot: &RowSnapshot) -> Result<Self, AppError> {
        if snapshot.cell_values.len() < DATA_COLUMN_COUNT {
            return Err(AppError::malformed(format!(
                "row {} has {} cells, expected at least {}",
                snapshot.row_id,
                snapshot.cell_values.len(),
                DATA_COLUMN_COUNT
            )));
        }

        let mut values: Vec<String> = snapshot.cell_values[..DATA_COLUMN_COUNT]
            .iter()
            .map(|v| v.trim().to_string())
            .collect();
        values.push(snapshot.row_id.to_string());

        Ok(Self { values })
    }

    /// All values, trailing correlation id included.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn data_values(&self) -> &[String] {
        &self.values[..DATA_COLUMN_COUNT]
    }

    pub fn correlation_id(&self) -> &str {
        &self.values[DATA_COLUMN_COUNT]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cells: &[&str]) -> RowSnapshot {
        RowSnapshot {
            row_id: RowId(42),
            version: 1,
            cell_values: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_record_appends_row_id() {
        let record = ReplicationRecord::from_snapshot(&snapshot(&[
            "East", "1001", "Acme", "Jo", "Y", "B1", "note",
        ]))
        .unwrap();

        assert_eq!(
            record.values(),
            ["East", "1001", "Acme", "Jo", "Y", "B1", "note", "42"]
        );
        assert_eq!(record.correlation_id(), "42");
        assert_eq!(record.data_values().len(), DATA_COLUMN_COUNT);
    }

    #[test]
    fn test_short_row_is_rejected() {
        let err = ReplicationRecord::from_snapshot(&snapshot(&["East", "1001"])).unwrap_err();
        assert!(matches!(err, AppError::MalformedPayload { .. }));
        assert!(err.to_string().contains("row 42 has 2 cells"));
    }

    #[test]
    fn test_extra_cells_are_not_mapped() {
        let record = ReplicationRecord::from_snapshot(&snapshot(&[
            "East", "1001", "Acme", "Jo", "", "B1", "note", "extra",
        ]))
        .unwrap();

        assert_eq!(record.values().len(), DESTINATION_COLUMNS.len());
        assert_eq!(record.values()[4], "");
        assert_eq!(record.correlation_id(), "42");
    }
}
