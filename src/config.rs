use crate::error::{Result, SeqSortError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub reference: ReferenceConfig,
    pub rename: RenameConfig,
    pub organize: OrganizeConfig,
    pub distribute: DistributeConfig,
    pub cleanup: CleanupConfig,
    pub sequencing_log: SequencingLogConfig,
    pub records: RecordsConfig,
}

/// The job-tracking workbook shared by `organize` and `seq-log`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub workbook: Option<PathBuf>,
    pub sheet: String,
    pub job_id_column: String,
    pub bbid_column: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenameConfig {
    pub workbook: Option<PathBuf>,
    /// First sheet when unset.
    pub sheet: Option<String>,
    pub work_number_column: String,
    pub bbid_column: String,
    pub vector_column: String,
    pub prefix_len: usize,
    pub date_format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrganizeConfig {
    pub sequence_extensions: Vec<String>,
    pub purge_extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DistributeConfig {
    pub reference_dir: Option<PathBuf>,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub prefix_len: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SequencingLogConfig {
    pub skip_rows: usize,
    pub delimiter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordsConfig {
    pub directory: Option<PathBuf>,
    pub date_format: String,
    pub timestamp_format: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            workbook: None,
            sheet: "WGK - Initiated".to_string(),
            job_id_column: "JOB (WORK) ID".to_string(),
            bbid_column: "BBID".to_string(),
        }
    }
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            workbook: None,
            sheet: None,
            work_number_column: "Work Number".to_string(),
            bbid_column: "BBID".to_string(),
            vector_column: "Vector".to_string(),
            prefix_len: 9,
            date_format: "%Y-%m-%d".to_string(),
        }
    }
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            sequence_extensions: vec!["ab1".to_string(), "fasta".to_string()],
            purge_extensions: vec!["seq".to_string()],
        }
    }
}

impl Default for DistributeConfig {
    fn default() -> Self {
        Self {
            reference_dir: None,
            extensions: vec!["txt".to_string()],
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self { prefix_len: 9 }
    }
}

impl Default for SequencingLogConfig {
    fn default() -> Self {
        Self {
            skip_rows: 5,
            delimiter: "._.".to_string(),
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            directory: None,
            date_format: "%Y-%m-%d".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SeqSortError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SeqSortError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| SeqSortError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["seqsort.toml", ".seqsort.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref workbook) = cli_args.workbook {
            self.rename.workbook = Some(workbook.clone());
            self.reference.workbook = Some(workbook.clone());
        }

        if let Some(ref sheet) = cli_args.sheet {
            self.rename.sheet = Some(sheet.clone());
            self.reference.sheet = sheet.clone();
        }

        if let Some(ref reference_dir) = cli_args.reference_dir {
            self.distribute.reference_dir = Some(reference_dir.clone());
        }

        if let Some(ref record_dir) = cli_args.record_dir {
            self.records.directory = Some(record_dir.clone());
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| SeqSortError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| SeqSortError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rename.prefix_len == 0 || self.cleanup.prefix_len == 0 {
            return Err(SeqSortError::Config {
                message: "Work number prefix length must be greater than 0".to_string(),
            });
        }

        if self.organize.sequence_extensions.is_empty() {
            return Err(SeqSortError::Config {
                message: "At least one sequence file extension must be specified".to_string(),
            });
        }

        if self.distribute.extensions.is_empty() {
            return Err(SeqSortError::Config {
                message: "At least one reference file extension must be specified".to_string(),
            });
        }

        if self.sequencing_log.delimiter.is_empty() {
            return Err(SeqSortError::Config {
                message: "Plate cell delimiter must not be empty".to_string(),
            });
        }

        for (name, column) in [
            ("rename.work_number_column", &self.rename.work_number_column),
            ("rename.bbid_column", &self.rename.bbid_column),
            ("rename.vector_column", &self.rename.vector_column),
            ("reference.job_id_column", &self.reference.job_id_column),
            ("reference.bbid_column", &self.reference.bbid_column),
        ] {
            if column.trim().is_empty() {
                return Err(SeqSortError::Config {
                    message: format!("{} must not be empty", name),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub workbook: Option<PathBuf>,
    pub sheet: Option<String>,
    pub reference_dir: Option<PathBuf>,
    pub record_dir: Option<PathBuf>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workbook(mut self, workbook: Option<PathBuf>) -> Self {
        self.workbook = workbook;
        self
    }

    pub fn with_sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn with_reference_dir(mut self, reference_dir: Option<PathBuf>) -> Self {
        self.reference_dir = reference_dir;
        self
    }

    pub fn with_record_dir(mut self, record_dir: Option<PathBuf>) -> Self {
        self.record_dir = record_dir;
        self
    }
}
