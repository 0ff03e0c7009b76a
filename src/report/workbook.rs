use crate::error::{Result, SeqSortError};
use crate::report::action_log::{ActionLog, RecordLayout};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<usize> for CellValue {
    fn from(value: usize) -> Self {
        CellValue::Number(value as f64)
    }
}

#[derive(Debug, Clone)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// A multi-sheet output workbook: header row in bold, one row per record.
#[derive(Debug, Clone, Default)]
pub struct RecordWorkbook {
    sheets: Vec<SheetTable>,
}

impl RecordWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet<R, C>(mut self, name: &str, headers: &[&str], rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<C>>,
        C: Into<CellValue>,
    {
        self.sheets.push(SheetTable {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        });
        self
    }

    /// Adds the `Summary` sheet: one row with the run date and a total.
    pub fn with_summary(self, date: &str, label: &str, total: usize) -> Self {
        self.with_sheet(
            "Summary",
            &["Date", label],
            vec![vec![CellValue::from(date), CellValue::from(total)]],
        )
    }

    /// Data sheet built from an action log plus the summary sheet.
    pub fn from_actions(log: &ActionLog, layout: &RecordLayout, date: &str, timestamp_format: &str) -> Self {
        Self::new()
            .with_sheet(layout.sheet, &layout.headers(), log.rows(layout, timestamp_format))
            .with_summary(date, layout.summary_label, log.len())
    }

    /// Writes the workbook, creating the parent directory. An existing file
    /// at `path` is replaced.
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SeqSortError::record_write(path, e))?;
        }

        self.write(path).map_err(|e| SeqSortError::record_write(path, e))?;
        tracing::info!(path = %path.display(), sheets = self.sheets.len(), "wrote record workbook");
        Ok(path.to_path_buf())
    }

    fn write(&self, path: &Path) -> std::result::Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string_with_format(0, col as u16, header, &bold)?;
            }

            for (index, row) in sheet.rows.iter().enumerate() {
                let row_num = index as u32 + 1;
                for (col, cell) in row.iter().enumerate() {
                    match cell {
                        CellValue::Text(text) if !text.is_empty() => {
                            worksheet.write_string(row_num, col as u16, text)?;
                        }
                        CellValue::Text(_) => {}
                        CellValue::Number(number) => {
                            worksheet.write_number(row_num, col as u16, *number)?;
                        }
                    }
                }
            }

            worksheet.autofit();
        }

        workbook.save(path)
    }
}

/// `{date} {title} Record.xlsx` inside `directory`.
pub fn record_path(directory: &Path, date: &str, title: &str) -> PathBuf {
    directory.join(format!("{} {} Record.xlsx", date, title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::loader::{cell_text, open_sheet, SheetSelector};
    use crate::report::action_log::{ActionKind, ActionRecord};
    use tempfile::TempDir;

    #[test]
    fn test_record_workbook_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut log = ActionLog::new();
        log.push(ActionRecord::new(
            ActionKind::Renamed,
            "123456789_old",
            Path::new("/data/123456789_old"),
            Some(Path::new("/data/123456789.BB1 in pUC19 2024-01-01")),
        ));

        let path = record_path(&temp_dir.path().join("records"), "2024-01-01", "Rename");
        RecordWorkbook::from_actions(&log, &RecordLayout::ACTIONS, "2024-01-01", "%Y-%m-%d %H:%M:%S")
            .save(&path)
            .unwrap();

        assert!(path.ends_with("2024-01-01 Rename Record.xlsx"));

        let (sheet, range) = open_sheet(&path, &SheetSelector::First).unwrap();
        assert_eq!(sheet, "Actions");
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(cell_text).collect())
            .collect();
        assert_eq!(rows[0][0], "Action");
        assert_eq!(rows[1][0], "Renamed");
        assert_eq!(rows[1][1], "123456789_old");

        let (_, summary) = open_sheet(&path, &SheetSelector::Named("Summary".to_string())).unwrap();
        let summary: Vec<Vec<String>> = summary
            .rows()
            .map(|r| r.iter().map(cell_text).collect())
            .collect();
        assert_eq!(summary[0], vec!["Date", "Total Actions"]);
        assert_eq!(summary[1], vec!["2024-01-01", "1"]);
    }

    #[test]
    fn test_save_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.xlsx");

        RecordWorkbook::new()
            .with_sheet("Data", &["A"], vec![vec!["one"], vec!["two"]])
            .save(&path)
            .unwrap();
        RecordWorkbook::new()
            .with_sheet("Data", &["A"], vec![vec!["three"]])
            .save(&path)
            .unwrap();

        let (_, range) = open_sheet(&path, &SheetSelector::First).unwrap();
        assert_eq!(range.rows().count(), 2);
    }
}
