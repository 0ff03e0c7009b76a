pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod reference;
pub mod reorganizer;
pub mod report;
pub mod runner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{CliOverrides, Config};
pub use error::{EntryError, EntryFailure, Result, SeqSortError, UserFriendlyError};

// Core functionality re-exports
pub use matcher::{DirectoryEntry, EntryScanner, KeyRule, NameKey};
pub use reference::{ReferenceLoader, ReferenceRecord, ReferenceTable, SheetSelector};
pub use reorganizer::{
    ArchiveExtractor, DataCleanup, FolderRenamer, FolderZipper, ReferenceDistributor, SequenceOrganizer,
};
pub use report::{ActionKind, ActionLog, ActionRecord, RecordLayout, RecordWorkbook, SequencingLog};
pub use runner::{RunContext, RunEvent, RunHandle, RunReport, Tool, ToolSlot};
pub use ui::{OutputFormatter, OutputMode, ProgressManager};

use matcher::require_directory;
use report::record_path;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use ui::{ProgressAwareOutput, RunProgress};

/// One tool invocation with its directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    Rename { directory: PathBuf },
    Zip { directory: PathBuf },
    Unzip { directory: PathBuf },
    Organize { source: PathBuf, destination: PathBuf },
    Distribute { target: PathBuf },
    Cleanup { uploaded: PathBuf, sorted: PathBuf, output: PathBuf },
    SeqLog { source: PathBuf, log_dir: PathBuf },
}

impl ToolRequest {
    pub fn tool(&self) -> Tool {
        match self {
            ToolRequest::Rename { .. } => Tool::Rename,
            ToolRequest::Zip { .. } => Tool::Zip,
            ToolRequest::Unzip { .. } => Tool::Unzip,
            ToolRequest::Organize { .. } => Tool::Organize,
            ToolRequest::Distribute { .. } => Tool::Distribute,
            ToolRequest::Cleanup { .. } => Tool::Cleanup,
            ToolRequest::SeqLog { .. } => Tool::SeqLog,
        }
    }

    /// Directories that must exist before the run starts.
    fn required_directories(&self) -> Vec<&Path> {
        match self {
            ToolRequest::Rename { directory } | ToolRequest::Zip { directory } | ToolRequest::Unzip { directory } => {
                vec![directory.as_path()]
            }
            ToolRequest::Organize { source, .. } => vec![source.as_path()],
            ToolRequest::Distribute { target } => vec![target.as_path()],
            ToolRequest::Cleanup {
                uploaded,
                sorted,
                output,
            } => vec![uploaded.as_path(), sorted.as_path(), output.as_path()],
            ToolRequest::SeqLog { source, .. } => vec![source.as_path()],
        }
    }

    /// Directory receiving the action record when `records.directory` is
    /// unset: the directory the tool worked on.
    fn record_home(&self) -> &Path {
        match self {
            ToolRequest::Rename { directory } | ToolRequest::Zip { directory } | ToolRequest::Unzip { directory } => {
                directory
            }
            ToolRequest::Organize { destination, .. } => destination,
            ToolRequest::Distribute { target } => target,
            ToolRequest::Cleanup { output, .. } => output,
            ToolRequest::SeqLog { log_dir, .. } => log_dir,
        }
    }
}

/// Main library interface: configuration, terminal output and one run slot
/// per tool.
pub struct SeqSort {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    slots: HashMap<Tool, ToolSlot>,
}

impl SeqSort {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let slots = Tool::ALL.iter().map(|tool| (*tool, ToolSlot::new(*tool))).collect();

        Self {
            config,
            output_formatter,
            progress_manager,
            slots,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(config, output_mode, cli_args.verbosity_level(), cli_args.quiet))
    }

    fn slot(&self, tool: Tool) -> Result<&ToolSlot> {
        self.slots.get(&tool).ok_or_else(|| SeqSortError::Worker {
            message: format!("no run slot for {}", tool.name()),
        })
    }

    pub fn is_busy(&self, tool: Tool) -> bool {
        self.slots.get(&tool).is_some_and(|slot| slot.is_busy())
    }

    /// Starts a run on the tool's worker and returns its handle immediately.
    /// Fails with [`SeqSortError::Busy`] while that tool is already running.
    pub fn submit(&self, request: ToolRequest, dry_run: bool) -> Result<RunHandle> {
        let config = self.config.clone();
        self.slot(request.tool())?
            .submit(dry_run, move |ctx| execute(&config, &request, ctx))
    }

    /// Runs a tool to completion, streaming its messages and progress to the
    /// terminal.
    pub async fn run_tool(&self, request: ToolRequest, dry_run: bool) -> Result<RunReport> {
        let tool = request.tool();
        self.output_formatter.start_operation(&format!(
            "{}{}",
            tool.title(),
            if dry_run { " (dry run)" } else { "" }
        ));

        let handle = self.submit(request, dry_run)?;

        let mut progress = RunProgress::new(&self.progress_manager);
        let output = ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager));

        let result = handle
            .drive(|event| match event {
                RunEvent::Log { level, message } => output.log(*level, message),
                RunEvent::ProgressStart { label, total } => progress.start(label, *total),
                RunEvent::ProgressAdvance { entry } => progress.advance(entry),
                RunEvent::Completed(_) => {}
            })
            .await;

        match &result {
            Ok(_) => progress.finish(),
            Err(e) => progress.abandon(&e.to_string()),
        }
        self.progress_manager.clear();

        result
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_to_file(output_path)
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn handle_error(&self, error: &SeqSortError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Body of every run. Configuration problems (missing directories, an
/// unreadable or incomplete workbook) are raised here before any entry is
/// touched.
pub fn execute(config: &Config, request: &ToolRequest, ctx: &mut RunContext) -> Result<()> {
    for directory in request.required_directories() {
        require_directory(directory)?;
    }

    match request {
        ToolRequest::Rename { directory } => {
            let table = load_rename_reference(config)?;
            ctx.info(format!("Loaded {} reference rows", table.len()));
            FolderRenamer::new(
                config.rename.prefix_len,
                config.rename.bbid_column.as_str(),
                config.rename.vector_column.as_str(),
            )
            .with_date_format(config.rename.date_format.as_str())
            .run(directory, &table, ctx)?;
        }
        ToolRequest::Zip { directory } => FolderZipper::new().run(directory, ctx)?,
        ToolRequest::Unzip { directory } => ArchiveExtractor::new().run(directory, ctx)?,
        ToolRequest::Organize { source, destination } => {
            let table = load_job_reference(config)?;
            ctx.info(format!("Loaded {} job rows", table.len()));
            SequenceOrganizer::new(config.reference.bbid_column.as_str())
                .with_sequence_extensions(config.organize.sequence_extensions.clone())
                .with_purge_extensions(config.organize.purge_extensions.clone())
                .run(source, destination, &table, ctx)?;
        }
        ToolRequest::Distribute { target } => {
            let reference_dir = config
                .distribute
                .reference_dir
                .as_deref()
                .ok_or_else(|| SeqSortError::Config {
                    message: "No reference file directory configured (distribute.reference_dir)".to_string(),
                })?;
            require_directory(reference_dir)?;
            ReferenceDistributor::new(reference_dir)
                .with_extensions(config.distribute.extensions.clone())
                .run(target, ctx)?;
        }
        ToolRequest::Cleanup {
            uploaded,
            sorted,
            output,
        } => {
            DataCleanup::new(config.cleanup.prefix_len)
                .with_timestamp_format(config.records.timestamp_format.as_str())
                .run(uploaded, sorted, output, ctx)?;
            return Ok(());
        }
        ToolRequest::SeqLog { source, log_dir } => {
            let table = load_job_reference(config)?;
            SequencingLog::new(
                config.sequencing_log.skip_rows,
                config.sequencing_log.delimiter.as_str(),
                config.reference.bbid_column.as_str(),
            )
            .run(source, log_dir, &table, ctx)?;
            return Ok(());
        }
    }

    write_action_record(config, request.record_home(), ctx)
}

fn require_workbook(path: Option<&Path>, section: &str) -> Result<PathBuf> {
    path.map(Path::to_path_buf).ok_or_else(|| SeqSortError::Config {
        message: format!("No reference workbook configured ({}.workbook)", section),
    })
}

fn load_rename_reference(config: &Config) -> Result<ReferenceTable> {
    let workbook = require_workbook(config.rename.workbook.as_deref(), "rename")?;
    ReferenceLoader::new(config.rename.work_number_column.as_str())
        .with_sheet(SheetSelector::from_option(config.rename.sheet.as_deref()))
        .with_attribute(config.rename.bbid_column.as_str())
        .with_attribute(config.rename.vector_column.as_str())
        .load(&workbook)
}

fn load_job_reference(config: &Config) -> Result<ReferenceTable> {
    let workbook = require_workbook(config.reference.workbook.as_deref(), "reference")?;
    ReferenceLoader::new(config.reference.job_id_column.as_str())
        .with_sheet(SheetSelector::Named(config.reference.sheet.clone()))
        .with_attribute(config.reference.bbid_column.as_str())
        .load(&workbook)
}

/// Writes the per-run action record into `records.directory`, or into
/// `default_directory` when none is configured. Dry runs write nothing.
fn write_action_record(config: &Config, default_directory: &Path, ctx: &mut RunContext) -> Result<()> {
    if ctx.dry_run() {
        return Ok(());
    }
    let directory = config.records.directory.as_deref().unwrap_or(default_directory);

    let date = ctx.started_at().format(&config.records.date_format).to_string();
    let path = RecordWorkbook::from_actions(
        ctx.actions(),
        &RecordLayout::ACTIONS,
        &date,
        &config.records.timestamp_format,
    )
    .save(&record_path(directory, &date, ctx.tool().title()))?;
    ctx.add_record_file(path);
    Ok(())
}
