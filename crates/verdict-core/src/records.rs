//! Case table loading.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::types::{CaseRecord, RecordId};

pub const TITLE_COLUMN: &str = "case_title";
pub const TEXT_COLUMN: &str = "case_text";
pub const OUTCOME_COLUMN: &str = "case_outcome";
pub const ID_COLUMN: &str = "case_id";

pub const REQUIRED_COLUMNS: &[&str] = &[TITLE_COLUMN, TEXT_COLUMN, OUTCOME_COLUMN];

/// Load every row of a case CSV.
pub fn load_csv(path: &Path) -> CoreResult<Vec<CaseRecord>> {
    let file = File::open(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = from_reader(BufReader::new(file))?;
    info!(path = %path.display(), records = records.len(), "loaded case table");
    Ok(records)
}

/// Parse a case table. The header must name every required column; anything
/// else is rejected before a single row is read.
///
/// Cells missing from short rows are treated as empty.
pub fn from_reader<R: Read>(reader: R) -> CoreResult<Vec<CaseRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let (Some(title_col), Some(text_col), Some(outcome_col)) =
        (position(TITLE_COLUMN), position(TEXT_COLUMN), position(OUTCOME_COLUMN))
    else {
        let missing = REQUIRED_COLUMNS
            .iter()
            .filter(|&&c| position(c).is_none())
            .map(|c| c.to_string())
            .collect();
        return Err(CoreError::MissingColumns(missing));
    };
    let id_col = position(ID_COLUMN);

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for (index, row) in csv_reader.records().enumerate() {
        let row = row?;
        let cell = |col: usize| row.get(col).unwrap_or("");

        let id = match id_col.map(cell).map(str::trim) {
            Some(raw) if !raw.is_empty() => RecordId(raw.to_string()),
            _ => RecordId::from_index(index),
        };
        if !seen.insert(id.clone()) {
            return Err(CoreError::DuplicateRecordId(id.0));
        }

        records.push(CaseRecord::new(
            id,
            cell(title_col),
            cell(text_col),
            cell(outcome_col).trim(),
        ));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_required_columns_in_any_order() {
        let data = "case_outcome,extra,case_text,case_title\n\
                    dismissed,x,The appeal failed,Smith v Jones\n";
        let records = from_reader(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, RecordId::from_index(0));
        assert_eq!(records[0].combined_text(), "Smith v Jones The appeal failed");
        assert_eq!(records[0].outcome_label, "dismissed");
    }

    #[test]
    fn missing_columns_are_named() {
        let err = from_reader("case_title,body\nA,B\n".as_bytes()).unwrap_err();
        match err {
            CoreError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["case_text", "case_outcome"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_cells_and_short_rows_become_empty_text() {
        let data = "case_title,case_text,case_outcome\n,Body only,\nTitle only\n";
        let records = from_reader(data.as_bytes()).unwrap();
        assert_eq!(records[0].combined_text(), " Body only");
        assert!(!records[0].has_label());
        assert_eq!(records[1].combined_text(), "Title only ");
    }

    #[test]
    fn case_id_column_overrides_row_index() {
        let data = "case_id,case_title,case_text,case_outcome\n\
                    C-17,T,B,cited\n\
                    ,T2,B2,cited\n";
        let records = from_reader(data.as_bytes()).unwrap();
        assert_eq!(records[0].id, RecordId("C-17".into()));
        assert_eq!(records[1].id, RecordId::from_index(1));
    }

    #[test]
    fn duplicate_case_ids_are_rejected() {
        let data = "case_id,case_title,case_text,case_outcome\nA,t,b,x\nA,t,b,y\n";
        assert!(matches!(
            from_reader(data.as_bytes()),
            Err(CoreError::DuplicateRecordId(id)) if id == "A"
        ));
    }
}
