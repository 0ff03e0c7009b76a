use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::ToolRequest;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "seqsort")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rename, archive, sort and catalog sequencing data folders")]
#[command(
    long_about = "SeqSort runs batch file-system tools over one directory level at a time, \
                  matching folder and file names against lab job spreadsheets and recording \
                  every action in a dated Excel workbook."
)]
#[command(before_help = "🧬 SeqSort - Sequencing Data Organizer")]
#[command(after_help = "EXAMPLES:\n  \
    seqsort rename ./Sequencing --workbook progress.xlsx\n  \
    seqsort zip ./Finished --record-dir ./records\n  \
    seqsort organize ./Incoming ./Sorted --workbook jobs.xlsx --dry-run\n  \
    seqsort distribute ./Sorted --reference-dir ./Reference\n  \
    seqsort cleanup ./Uploaded ./Sorted ./Archive\n  \
    seqsort seq-log ./Plates ./Logs --workbook jobs.xlsx\n  \
    seqsort generate-config --config seqsort.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report what would be done without touching any file
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Reference workbook (overrides rename.workbook and reference.workbook)
    #[arg(short, long, global = true, env = "SEQSORT_WORKBOOK")]
    pub workbook: Option<PathBuf>,

    /// Sheet to read from the reference workbook
    #[arg(long, global = true)]
    pub sheet: Option<String>,

    /// Directory holding the reference files for `distribute`
    #[arg(long, global = true)]
    pub reference_dir: Option<PathBuf>,

    /// Directory for per-run action records
    #[arg(long, global = true)]
    pub record_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rename work-number folders to `{work}.{bbid} in {vector} {date}`
    Rename {
        /// Directory whose sub-folders are renamed
        directory: PathBuf,
    },
    /// Archive every sub-folder into a zip and remove the folder
    Zip {
        /// Directory whose sub-folders are archived
        directory: PathBuf,
    },
    /// Extract every zip into a same-named folder and delete the archive
    Unzip {
        /// Directory holding the archives
        directory: PathBuf,
    },
    /// Sort sequencing reads into `{job}.{plasmid}.{bbid}` folders
    Organize {
        /// Directory holding the reads
        source: PathBuf,
        /// Directory receiving the job folders
        destination: PathBuf,
    },
    /// Copy reference files into every folder with a matching base name
    Distribute {
        /// Directory whose sub-folders receive the files
        target: PathBuf,
    },
    /// Move folders of completed projects out of the working area
    Cleanup {
        /// Directory of uploaded project archives
        uploaded: PathBuf,
        /// Directory of sorted sequencing folders
        sorted: PathBuf,
        /// Directory receiving completed folders and the records
        output: PathBuf,
    },
    /// Combine sequencing plate sheets into the daily log workbook
    SeqLog {
        /// Directory holding the plate workbooks
        source: PathBuf,
        /// Directory receiving the log workbook
        log_dir: PathBuf,
    },
    /// Write a sample configuration file (to --config or seqsort.toml)
    GenerateConfig,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Command {
    /// The tool run this command asks for; `None` for utility commands.
    pub fn tool_request(&self) -> Option<ToolRequest> {
        let request = match self.clone() {
            Command::Rename { directory } => ToolRequest::Rename { directory },
            Command::Zip { directory } => ToolRequest::Zip { directory },
            Command::Unzip { directory } => ToolRequest::Unzip { directory },
            Command::Organize { source, destination } => ToolRequest::Organize { source, destination },
            Command::Distribute { target } => ToolRequest::Distribute { target },
            Command::Cleanup {
                uploaded,
                sorted,
                output,
            } => ToolRequest::Cleanup {
                uploaded,
                sorted,
                output,
            },
            Command::SeqLog { source, log_dir } => ToolRequest::SeqLog { source, log_dir },
            Command::GenerateConfig => return None,
        };
        Some(request)
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_workbook(self.workbook.clone())
            .with_sheet(self.sheet.clone())
            .with_reference_dir(self.reference_dir.clone())
            .with_record_dir(self.record_dir.clone())
    }

    pub fn config_output_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from("seqsort.toml"))
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommand_with_global_flags() {
        let cli = Cli::try_parse_from([
            "seqsort",
            "organize",
            "in",
            "out",
            "--workbook",
            "jobs.xlsx",
            "--dry-run",
            "-vv",
        ])
        .unwrap();

        assert!(cli.dry_run);
        assert_eq!(cli.verbosity_level(), 2);
        assert_eq!(
            cli.command.tool_request(),
            Some(ToolRequest::Organize {
                source: PathBuf::from("in"),
                destination: PathBuf::from("out"),
            })
        );
        assert_eq!(cli.workbook, Some(PathBuf::from("jobs.xlsx")));
    }

    #[test]
    fn test_seq_log_subcommand_name() {
        let cli = Cli::try_parse_from(["seqsort", "seq-log", "plates", "logs"]).unwrap();
        assert!(matches!(cli.command, Command::SeqLog { .. }));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["seqsort", "zip", "d", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_missing_positional_is_rejected() {
        assert!(Cli::try_parse_from(["seqsort", "cleanup", "a", "b"]).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "seqsort",
            "distribute",
            "sorted",
            "--reference-dir",
            "ref",
            "--record-dir",
            "records",
            "--sheet",
            "Jobs",
        ])
        .unwrap();

        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.reference_dir, Some(PathBuf::from("ref")));
        assert_eq!(overrides.record_dir, Some(PathBuf::from("records")));
        assert_eq!(overrides.sheet.as_deref(), Some("Jobs"));
        assert!(overrides.workbook.is_none() || std::env::var("SEQSORT_WORKBOOK").is_ok());
    }

    #[test]
    fn test_generate_config_has_no_tool() {
        let cli = Cli::try_parse_from(["seqsort", "generate-config"]).unwrap();
        assert_eq!(cli.command.tool_request(), None);
        assert_eq!(cli.config_output_path(), PathBuf::from("seqsort.toml"));
    }
}
