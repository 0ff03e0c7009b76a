use crate::error::{EntryError, EntryFailure, Result};
use crate::matcher::{require_directory, EntryScanner, KeyRule};
use crate::reference::loader::{open_sheet, SheetSelector};
use crate::reference::ReferenceTable;
use crate::report::workbook::RecordWorkbook;
use crate::runner::RunContext;
use anyhow::{bail, Context};
use calamine::{Data, Range};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const LOG_COLUMNS: [&str; 9] = [
    "Seq Plate",
    "Folder name",
    "Job ID",
    "Vector ID",
    "BBID",
    "Sg SS OK",
    "Sg DS OK",
    "Sg Mutation or FAIL",
    "Sg Primer to repeat",
];

const PLATE_EXTENSIONS: [&str; 2] = ["xls", "xlsx"];

/// One line of the combined sequencing log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateRow {
    pub plate: String,
    pub folder_name: String,
    pub job_id: String,
    pub vector_id: String,
    pub bbid: String,
}

impl PlateRow {
    fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.plate.clone(),
            self.folder_name.clone(),
            self.job_id.clone(),
            self.vector_id.clone(),
            self.bbid.clone(),
        ];
        // Review columns are filled in by hand.
        cells.resize(LOG_COLUMNS.len(), String::new());
        cells
    }
}

/// Builds the daily log from sequencing plate sheets whose sample cells read
/// `vector._.job[._.more]`.
#[derive(Debug, Clone)]
pub struct SequencingLog {
    skip_rows: usize,
    rule: KeyRule,
    bbid_column: String,
}

impl SequencingLog {
    pub fn new(skip_rows: usize, delimiter: impl Into<String>, bbid_column: impl Into<String>) -> Self {
        Self {
            skip_rows,
            rule: KeyRule::Delimited(delimiter.into()),
            bbid_column: bbid_column.into(),
        }
    }

    pub fn log_path(log_dir: &Path, date: &str) -> PathBuf {
        log_dir.join(format!("{} - log.xlsx", date))
    }

    /// Data rows of a plate sheet: everything below the header row, which
    /// itself sits right after the skipped rows.
    fn data_rows<'a>(&self, range: &'a Range<Data>) -> impl Iterator<Item = &'a [Data]> + 'a {
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let header_row = self.skip_rows;
        range
            .rows()
            .enumerate()
            .filter(move |(index, _)| first_row + index > header_row)
            .map(|(_, row)| row)
    }

    fn is_sample_cell(&self, cell: &Data) -> bool {
        matches!(cell, Data::String(text) if self.rule.extract(text).is_some())
    }

    /// Job/vector pairs of one plate in sheet order, duplicates removed.
    /// `None` when no column holds sample cells.
    pub fn plate_samples(&self, range: &Range<Data>) -> Option<Vec<(String, String)>> {
        let width = range.width();
        let column = (0..width).find(|&col| {
            self.data_rows(range)
                .any(|row| row.get(col).is_some_and(|cell| self.is_sample_cell(cell)))
        })?;

        let mut seen = HashSet::new();
        let samples = self
            .data_rows(range)
            .filter_map(|row| match row.get(column) {
                Some(Data::String(text)) => self.rule.extract(text),
                _ => None,
            })
            .map(|key| (key.key, key.qualifier.unwrap_or_default()))
            .filter(|pair| seen.insert(pair.clone()))
            .collect();

        Some(samples)
    }

    pub fn read_plate(&self, path: &Path, table: &ReferenceTable) -> anyhow::Result<Vec<PlateRow>> {
        let plate = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let (_, range) = open_sheet(path, &SheetSelector::First)
            .with_context(|| format!("could not open plate {}", path.display()))?;

        let Some(samples) = self.plate_samples(&range) else {
            bail!("no column contains sample names");
        };

        Ok(samples
            .into_iter()
            .map(|(job_id, vector_id)| PlateRow {
                plate: plate.clone(),
                folder_name: format!("{}.{}", job_id, vector_id),
                bbid: table
                    .lookup(&job_id)
                    .map(|r| r.get(&self.bbid_column).to_string())
                    .unwrap_or_default(),
                job_id,
                vector_id,
            })
            .collect())
    }

    pub fn run(&self, source: &Path, log_dir: &Path, table: &ReferenceTable, ctx: &mut RunContext) -> Result<()> {
        require_directory(source)?;

        let plates: Vec<_> = EntryScanner::new()
            .scan(source)?
            .into_iter()
            .filter(|e| e.is_file() && PLATE_EXTENSIONS.contains(&e.extension.as_str()))
            .collect();

        ctx.progress_start("Reading plates", plates.len());
        let mut rows = Vec::new();

        for plate in &plates {
            ctx.advance(&plate.name);
            match self.read_plate(&plate.path, table) {
                Ok(plate_rows) if plate_rows.is_empty() => {
                    ctx.skip(&plate.name, "no sample rows");
                }
                Ok(plate_rows) => {
                    ctx.info(format!("Processed {} ({} rows)", plate.stem(), plate_rows.len()));
                    rows.extend(plate_rows);
                }
                Err(err) => {
                    ctx.entry_error(EntryError::new(
                        &plate.name,
                        "reading plate",
                        EntryFailure::Io {
                            message: format!("{:#}", err),
                        },
                    ));
                }
            }
        }

        if rows.is_empty() {
            ctx.warn("No data processed. Log file not created.");
            return Ok(());
        }

        let date = ctx.started_at().format("%Y-%m-%d").to_string();
        let path = Self::log_path(log_dir, &date);

        if ctx.dry_run() {
            ctx.info(format!("Would write {} rows to {}", rows.len(), path.display()));
            return Ok(());
        }

        let total = rows.len();
        let path = RecordWorkbook::new()
            .with_sheet("Combined Log", &LOG_COLUMNS, rows.iter().map(PlateRow::cells))
            .with_summary(&date, "Total Rows", total)
            .save(&path)?;
        ctx.add_record_file(path);
        Ok(())
    }
}
