use crate::error::{Result, SeqSortError};
use crate::reference::table::{ReferenceRecord, ReferenceTable};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    First,
    Named(String),
}

impl SheetSelector {
    pub fn from_option(name: Option<&str>) -> Self {
        match name {
            Some(name) if !name.trim().is_empty() => SheetSelector::Named(name.to_string()),
            _ => SheetSelector::First,
        }
    }
}

/// Trimmed, inner whitespace collapsed, lower-cased. Used for header and
/// sheet names only; cell values are never normalized this way.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Renders a cell as the text used for key comparison. Integral numbers lose
/// their fractional part so `123456789.0` and `"123456789"` compare equal.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Opens a workbook of any supported format and returns the selected sheet's
/// name and cell range.
pub fn open_sheet(path: &Path, selector: &SheetSelector) -> Result<(String, Range<Data>)> {
    if !path.is_file() {
        return Err(SeqSortError::WorkbookNotFound {
            path: path.display().to_string(),
        });
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| SeqSortError::workbook(path, e))?;
    let sheet_names = workbook.sheet_names();

    let sheet = match selector {
        SheetSelector::First => sheet_names.first().cloned(),
        SheetSelector::Named(wanted) => sheet_names
            .iter()
            .find(|name| *name == wanted)
            .or_else(|| {
                let wanted = normalize_label(wanted);
                sheet_names.iter().find(|name| normalize_label(name) == wanted)
            })
            .cloned(),
    };

    let sheet = sheet.ok_or_else(|| SeqSortError::SheetNotFound {
        path: path.display().to_string(),
        sheet: match selector {
            SheetSelector::First => "<first sheet>".to_string(),
            SheetSelector::Named(name) => name.clone(),
        },
        available: sheet_names.clone(),
    })?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| SeqSortError::workbook(path, e))?;

    Ok((sheet, range))
}

/// Column positions of a header row, looked up by normalized name.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    labels: Vec<String>,
}

impl HeaderIndex {
    pub fn from_row(row: &[Data]) -> Self {
        Self {
            labels: row.iter().map(|c| normalize_label(&cell_text(c))).collect(),
        }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        let wanted = normalize_label(column);
        self.labels.iter().position(|label| *label == wanted)
    }

    /// Every name in `required` that has no column, in the order given.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|name| self.position(name).is_none())
            .copied()
            .collect()
    }
}

/// Loads a sheet into a [`ReferenceTable`] keyed by one column.
#[derive(Debug, Clone)]
pub struct ReferenceLoader {
    sheet: SheetSelector,
    key_column: String,
    attribute_columns: Vec<String>,
}

impl ReferenceLoader {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            sheet: SheetSelector::First,
            key_column: key_column.into(),
            attribute_columns: Vec::new(),
        }
    }

    pub fn with_sheet(mut self, sheet: SheetSelector) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn with_attribute(mut self, column: impl Into<String>) -> Self {
        self.attribute_columns.push(column.into());
        self
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn load(&self, path: &Path) -> Result<ReferenceTable> {
        let (sheet, range) = open_sheet(path, &self.sheet)?;
        let table = self.from_range(&range, path)?;

        tracing::info!(
            workbook = %path.display(),
            sheet = %sheet,
            records = table.len(),
            duplicates = table.duplicates(),
            "loaded reference table"
        );
        Ok(table)
    }

    pub fn from_range(&self, range: &Range<Data>, path: &Path) -> Result<ReferenceTable> {
        let mut rows = range.rows();
        let header = rows.next().map(HeaderIndex::from_row).unwrap_or(HeaderIndex {
            labels: Vec::new(),
        });

        let mut required: Vec<&str> = vec![self.key_column.as_str()];
        required.extend(self.attribute_columns.iter().map(String::as_str));

        let missing = header.missing(&required);
        if !missing.is_empty() {
            return Err(SeqSortError::MissingColumns {
                path: path.display().to_string(),
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }

        // Presence was checked above.
        let key_pos = header.position(&self.key_column).unwrap_or_default();
        let attribute_pos: Vec<(&str, usize)> = self
            .attribute_columns
            .iter()
            .filter_map(|c| header.position(c).map(|p| (c.as_str(), p)))
            .collect();

        let mut table = ReferenceTable::new();
        for row in rows {
            let key = row.get(key_pos).map(cell_text).unwrap_or_default();
            if key.is_empty() {
                continue;
            }

            let record = attribute_pos.iter().fold(ReferenceRecord::new(key), |record, (name, pos)| {
                let value = row.get(*pos).map(cell_text).unwrap_or_default();
                record.with_attribute(*name, value)
            });

            if !table.insert(record) {
                tracing::debug!(key = %row.get(key_pos).map(cell_text).unwrap_or_default(), "duplicate reference key ignored");
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_workbook(dir: &Path, sheet: &str, header: &[&str], rows: &[Vec<Data>]) -> PathBuf {
        let path = dir.join("reference.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet).unwrap();
        for (col, title) in header.iter().enumerate() {
            worksheet.write_string(0, col as u16, *title).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32 + 1, c as u16);
                match cell {
                    Data::String(s) => {
                        worksheet.write_string(r, c, s.as_str()).unwrap();
                    }
                    Data::Float(f) => {
                        worksheet.write_number(r, c, *f).unwrap();
                    }
                    _ => {}
                }
            }
        }
        workbook.save(&path).unwrap();
        path
    }

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_cell_text_coercion() {
        assert_eq!(cell_text(&Data::Float(123456789.0)), "123456789");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&text(" J1 ")), " J1 ");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Work   Number "), "work number");
        assert_eq!(normalize_label("JOB (WORK) ID"), "job (work) id");
    }

    #[test]
    fn test_load_with_numeric_keys_and_messy_headers() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_workbook(
            temp_dir.path(),
            "Sheet1",
            &[" Work Number ", "bbid", "Vector  "],
            &[
                vec![Data::Float(123456789.0), text("BB1"), text("pUC19")],
                vec![text("987654321"), text("BB2"), text("pET28")],
                vec![Data::Float(123456789.0), text("BB3"), text("other")],
            ],
        );

        let table = ReferenceLoader::new("Work Number")
            .with_attribute("BBID")
            .with_attribute("Vector")
            .load(&path)
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.duplicates(), 1);
        let record = table.lookup("123456789").unwrap();
        assert_eq!(record.get("BBID"), "BB1");
        assert_eq!(record.get("Vector"), "pUC19");
        assert_eq!(table.lookup("987654321").unwrap().get("BBID"), "BB2");
    }

    #[test]
    fn test_missing_columns_reported_together() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_workbook(
            temp_dir.path(),
            "Sheet1",
            &["Work Number", "Notes"],
            &[vec![text("123456789"), text("n")]],
        );

        let err = ReferenceLoader::new("Work Number")
            .with_attribute("BBID")
            .with_attribute("Vector")
            .load(&path)
            .unwrap_err();

        match err {
            SeqSortError::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["BBID".to_string(), "Vector".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_named_sheet_selection() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_workbook(
            temp_dir.path(),
            "WGK - Initiated",
            &["JOB (WORK) ID", "BBID"],
            &[vec![text("JOB001"), text("BB99")]],
        );

        let table = ReferenceLoader::new("JOB (WORK) ID")
            .with_sheet(SheetSelector::Named("wgk -  initiated".to_string()))
            .with_attribute("BBID")
            .load(&path)
            .unwrap();
        assert_eq!(table.lookup("JOB001").unwrap().get("BBID"), "BB99");

        let err = ReferenceLoader::new("JOB (WORK) ID")
            .with_sheet(SheetSelector::Named("Archive".to_string()))
            .load(&path)
            .unwrap_err();
        assert!(matches!(err, SeqSortError::SheetNotFound { .. }));
    }

    #[test]
    fn test_missing_workbook() {
        let temp_dir = TempDir::new().unwrap();
        let err = ReferenceLoader::new("BBID")
            .load(&temp_dir.path().join("nope.xlsx"))
            .unwrap_err();
        assert!(matches!(err, SeqSortError::WorkbookNotFound { .. }));
    }

    #[test]
    fn test_sheet_selector_from_option() {
        assert_eq!(SheetSelector::from_option(None), SheetSelector::First);
        assert_eq!(SheetSelector::from_option(Some(" ")), SheetSelector::First);
        assert_eq!(
            SheetSelector::from_option(Some("Data")),
            SheetSelector::Named("Data".to_string())
        );
    }
}
