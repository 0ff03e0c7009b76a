use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Renamed,
    Moved,
    Zipped,
    Unzipped,
    Copied,
    Deleted,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Renamed => "Renamed",
            ActionKind::Moved => "Moved",
            ActionKind::Zipped => "Zipped",
            ActionKind::Unzipped => "Unzipped",
            ActionKind::Copied => "Copied",
            ActionKind::Deleted => "Deleted",
        }
    }
}

/// One file-system action that succeeded (or, in a dry run, would be taken).
#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub kind: ActionKind,
    pub entry: String,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub timestamp: DateTime<Local>,
}

impl ActionRecord {
    pub fn new(kind: ActionKind, entry: impl Into<String>, source: &Path, destination: Option<&Path>) -> Self {
        Self {
            kind,
            entry: entry.into(),
            source: source.to_path_buf(),
            destination: destination.map(Path::to_path_buf),
            timestamp: Local::now(),
        }
    }

    pub fn describe(&self) -> String {
        match &self.destination {
            Some(destination) => format!(
                "{} '{}' -> {}",
                self.kind.label(),
                self.entry,
                destination.display()
            ),
            None => format!("{} '{}'", self.kind.label(), self.entry),
        }
    }
}

/// Column source for a record sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordColumn {
    Action,
    Entry,
    Source,
    Destination,
    Timestamp,
}

/// Sheet name, column titles and summary label of a record workbook.
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    pub sheet: &'static str,
    pub columns: &'static [(&'static str, RecordColumn)],
    pub summary_label: &'static str,
}

impl RecordLayout {
    pub const ACTIONS: RecordLayout = RecordLayout {
        sheet: "Actions",
        columns: &[
            ("Action", RecordColumn::Action),
            ("Entry", RecordColumn::Entry),
            ("Source Path", RecordColumn::Source),
            ("Destination Path", RecordColumn::Destination),
            ("Timestamp", RecordColumn::Timestamp),
        ],
        summary_label: "Total Actions",
    };

    pub const MOVED_FOLDERS: RecordLayout = RecordLayout {
        sheet: "Moved Folders",
        columns: &[
            ("Folder Name", RecordColumn::Entry),
            ("Original Path", RecordColumn::Source),
            ("New Path", RecordColumn::Destination),
            ("Date Moved", RecordColumn::Timestamp),
        ],
        summary_label: "Total Folders Moved",
    };

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(title, _)| *title).collect()
    }

    pub fn row(&self, record: &ActionRecord, timestamp_format: &str) -> Vec<String> {
        self.columns
            .iter()
            .map(|(_, column)| match column {
                RecordColumn::Action => record.kind.label().to_string(),
                RecordColumn::Entry => record.entry.clone(),
                RecordColumn::Source => record.source.display().to_string(),
                RecordColumn::Destination => record
                    .destination
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
                RecordColumn::Timestamp => record.timestamp.format(timestamp_format).to_string(),
            })
            .collect()
    }
}

/// In-memory log of a run's actions, flushed to a workbook at the end.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionLog {
    records: Vec<ActionRecord>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    pub fn rows(&self, layout: &RecordLayout, timestamp_format: &str) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|record| layout.row(record, timestamp_format))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_rows() {
        let mut log = ActionLog::new();
        log.push(ActionRecord::new(
            ActionKind::Moved,
            "123456789 project",
            Path::new("/sorted/123456789 project"),
            Some(Path::new("/done/123456789 project")),
        ));
        log.push(ActionRecord::new(
            ActionKind::Deleted,
            "old.seq",
            Path::new("/src/old.seq"),
            None,
        ));

        let rows = log.rows(&RecordLayout::MOVED_FOLDERS, "%Y");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "123456789 project");
        assert_eq!(rows[0][2], "/done/123456789 project");
        assert_eq!(rows[1][2], "");
        assert_eq!(rows[0][3].len(), 4);

        assert_eq!(RecordLayout::ACTIONS.headers()[0], "Action");
        assert_eq!(log.count(ActionKind::Moved), 1);
    }

    #[test]
    fn test_describe() {
        let record = ActionRecord::new(ActionKind::Zipped, "plate1", Path::new("/d/plate1"), Some(Path::new("/d/plate1.zip")));
        assert_eq!(record.describe(), "Zipped 'plate1' -> /d/plate1.zip");
    }
}
