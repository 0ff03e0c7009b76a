use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Failures that stop a run before it touches the file system.
///
/// Anything that goes wrong for a single directory entry during a batch is an
/// [`EntryError`] instead and never aborts the run.
#[derive(Error, Debug)]
pub enum SeqSortError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("Workbook not found: {path}")]
    WorkbookNotFound { path: String },

    #[error("Failed to read workbook {path}: {message}")]
    Workbook { path: String, message: String },

    #[error("Sheet '{sheet}' not found in {path}")]
    SheetNotFound {
        path: String,
        sheet: String,
        available: Vec<String>,
    },

    #[error("Missing required columns in {path}: {}", missing.join(", "))]
    MissingColumns { path: String, missing: Vec<String> },

    #[error("Failed to write record {path}: {message}")]
    RecordWrite { path: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("A {tool} run is already in progress")]
    Busy { tool: String },

    #[error("Worker failed: {message}")]
    Worker { message: String },
}

impl SeqSortError {
    pub fn directory_not_found(path: &Path) -> Self {
        SeqSortError::DirectoryNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn workbook(path: &Path, message: impl fmt::Display) -> Self {
        SeqSortError::Workbook {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    pub fn record_write(path: &Path, message: impl fmt::Display) -> Self {
        SeqSortError::RecordWrite {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for SeqSortError {
    fn user_message(&self) -> String {
        match self {
            SeqSortError::DirectoryNotFound { path } => {
                format!("The folder does not exist: {}", path)
            }
            SeqSortError::WorkbookNotFound { path } => {
                format!("Excel file not found at {}", path)
            }
            SeqSortError::SheetNotFound {
                sheet, available, ..
            } => {
                format!(
                    "Sheet '{}' not found (available sheets: {})",
                    sheet,
                    available.join(", ")
                )
            }
            SeqSortError::MissingColumns { missing, .. } => {
                format!(
                    "The following required columns are missing from the Excel file: {}",
                    missing.join(", ")
                )
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            SeqSortError::DirectoryNotFound { .. } => Some(
                "Check the folder path, or that the network drive is mounted.".to_string()
            ),
            SeqSortError::WorkbookNotFound { .. } => Some(
                "Pass the reference workbook with --workbook or set it in the configuration file.".to_string()
            ),
            SeqSortError::Workbook { .. } => Some(
                "Close the workbook in Excel and make sure it is a valid .xlsx/.xls file.".to_string()
            ),
            SeqSortError::SheetNotFound { .. } => Some(
                "Select the sheet with --sheet or fix the sheet name in the configuration file.".to_string()
            ),
            SeqSortError::MissingColumns { .. } => Some(
                "Column names are matched ignoring case and surrounding spaces; check the header row of the sheet.".to_string()
            ),
            SeqSortError::RecordWrite { .. } => Some(
                "Close any open copy of the record workbook and check write permissions for the output folder.".to_string()
            ),
            SeqSortError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            SeqSortError::Busy { .. } => Some(
                "Wait for the running batch to finish before starting another one.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for SeqSortError {
    fn from(error: toml::de::Error) -> Self {
        SeqSortError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SeqSortError>;

/// Why a single entry could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryFailure {
    PermissionDenied,
    NameCollision { target: String },
    Archive { message: String },
    Io { message: String },
}

impl fmt::Display for EntryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryFailure::PermissionDenied => write!(f, "permission denied"),
            EntryFailure::NameCollision { target } => {
                write!(f, "a file or folder named '{}' already exists", target)
            }
            EntryFailure::Archive { message } => write!(f, "archive error: {}", message),
            EntryFailure::Io { message } => write!(f, "{}", message),
        }
    }
}

impl From<std::io::Error> for EntryFailure {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => EntryFailure::PermissionDenied,
            _ => EntryFailure::Io {
                message: error.to_string(),
            },
        }
    }
}

impl From<zip::result::ZipError> for EntryFailure {
    fn from(error: zip::result::ZipError) -> Self {
        match error {
            zip::result::ZipError::Io(e) => EntryFailure::from(e),
            other => EntryFailure::Archive {
                message: other.to_string(),
            },
        }
    }
}

impl From<walkdir::Error> for EntryFailure {
    fn from(error: walkdir::Error) -> Self {
        match error.into_io_error() {
            Some(e) => EntryFailure::from(e),
            None => EntryFailure::Io {
                message: "filesystem loop detected".to_string(),
            },
        }
    }
}

/// A failure scoped to one directory entry; the batch continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryError {
    pub entry: String,
    pub action: &'static str,
    pub failure: EntryFailure,
}

impl EntryError {
    pub fn new(entry: impl Into<String>, action: &'static str, failure: EntryFailure) -> Self {
        Self {
            entry: entry.into(),
            action,
            failure,
        }
    }
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {} '{}': {}", self.action, self.entry, self.failure)
    }
}

pub type EntryResult<T> = std::result::Result<T, EntryFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_lists_every_name() {
        let error = SeqSortError::MissingColumns {
            path: "ref.xlsx".to_string(),
            missing: vec!["BBID".to_string(), "Vector".to_string()],
        };
        assert!(error.user_message().contains("BBID, Vector"));
        assert!(error.to_string().contains("BBID, Vector"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_io_error_classification() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(EntryFailure::from(denied), EntryFailure::PermissionDenied);

        let other = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        assert!(matches!(EntryFailure::from(other), EntryFailure::Io { .. }));
    }

    #[test]
    fn test_entry_error_display() {
        let error = EntryError::new(
            "123456789_old",
            "renaming",
            EntryFailure::NameCollision {
                target: "123456789.BB1".to_string(),
            },
        );
        let text = error.to_string();
        assert!(text.contains("renaming"));
        assert!(text.contains("123456789_old"));
        assert!(text.contains("already exists"));
    }
}
