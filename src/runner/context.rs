use crate::error::{EntryError, Result};
use crate::report::action_log::{ActionLog, ActionRecord};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    Rename,
    Zip,
    Unzip,
    Organize,
    Distribute,
    Cleanup,
    SeqLog,
}

impl Tool {
    pub const ALL: [Tool; 7] = [
        Tool::Rename,
        Tool::Zip,
        Tool::Unzip,
        Tool::Organize,
        Tool::Distribute,
        Tool::Cleanup,
        Tool::SeqLog,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Rename => "rename",
            Tool::Zip => "zip",
            Tool::Unzip => "unzip",
            Tool::Organize => "organize",
            Tool::Distribute => "distribute",
            Tool::Cleanup => "cleanup",
            Tool::SeqLog => "seq-log",
        }
    }

    /// Used in record file names.
    pub fn title(&self) -> &'static str {
        match self {
            Tool::Rename => "Rename",
            Tool::Zip => "Zip",
            Tool::Unzip => "Unzip",
            Tool::Organize => "Organize",
            Tool::Distribute => "Distribute",
            Tool::Cleanup => "Data Clean Up",
            Tool::SeqLog => "Sequencing Log",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

/// Messages a worker sends to the interactive layer.
#[derive(Debug)]
pub enum RunEvent {
    Log { level: LogLevel, message: String },
    ProgressStart { label: String, total: u64 },
    ProgressAdvance { entry: String },
    Completed(Box<Result<RunReport>>),
}

/// Sending half of a run's message channel. Every message is mirrored to
/// `tracing`; a sink without a channel only logs.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<RunEvent>>,
}

impl EventSink {
    pub fn new(sender: UnboundedSender<RunEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn detached() -> Self {
        Self::default()
    }

    fn send(&self, event: RunEvent) {
        if let Some(sender) = &self.sender {
            // The receiver may have gone away; the run still completes.
            let _ = sender.send(event);
        }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info | LogLevel::Success => tracing::info!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        self.send(RunEvent::Log { level, message });
    }

    pub fn progress_start(&self, label: impl Into<String>, total: usize) {
        self.send(RunEvent::ProgressStart {
            label: label.into(),
            total: total as u64,
        });
    }

    pub fn advance(&self, entry: impl Into<String>) {
        self.send(RunEvent::ProgressAdvance {
            entry: entry.into(),
        });
    }

    pub fn complete(&self, result: Result<RunReport>) {
        self.send(RunEvent::Completed(Box::new(result)));
    }
}

/// An entry that was looked at and deliberately left alone.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub entry: String,
    pub reason: String,
}

/// Outcome of one tool run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub tool: Tool,
    pub dry_run: bool,
    pub actions: ActionLog,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<EntryError>,
    pub skipped: Vec<SkippedEntry>,
    pub records: Vec<PathBuf>,
    pub elapsed: Duration,
}

fn serialize_errors<S: serde::Serializer>(errors: &[EntryError], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Per-run state owned by the worker: options, the message sink and the
/// report under construction.
#[derive(Debug)]
pub struct RunContext {
    tool: Tool,
    dry_run: bool,
    started_at: DateTime<Local>,
    start: Instant,
    sink: EventSink,
    actions: ActionLog,
    errors: Vec<EntryError>,
    skipped: Vec<SkippedEntry>,
    records: Vec<PathBuf>,
}

impl RunContext {
    pub fn new(tool: Tool, sink: EventSink, dry_run: bool) -> Self {
        Self {
            tool,
            dry_run,
            started_at: Local::now(),
            start: Instant::now(),
            sink,
            actions: ActionLog::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Context that only logs through `tracing`, for running a tool inline.
    pub fn detached(tool: Tool, dry_run: bool) -> Self {
        Self::new(tool, EventSink::detached(), dry_run)
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Local time the run started; all date stamps of the run derive from it.
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn info(&self, message: impl Into<String>) {
        self.sink.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.sink.log(LogLevel::Warning, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.sink.log(LogLevel::Debug, message);
    }

    pub fn progress_start(&self, label: impl Into<String>, total: usize) {
        self.sink.progress_start(label, total);
    }

    pub fn advance(&self, entry: impl Into<String>) {
        self.sink.advance(entry);
    }

    pub fn record(&mut self, action: ActionRecord) {
        let prefix = if self.dry_run { "Would have " } else { "" };
        let description = action.describe();
        let message = if prefix.is_empty() {
            description
        } else {
            format!("{}{}", prefix, lowercase_first(&description))
        };
        self.sink.log(LogLevel::Success, message);
        self.actions.push(action);
    }

    pub fn entry_error(&mut self, error: EntryError) {
        self.sink.log(LogLevel::Error, error.to_string());
        self.errors.push(error);
    }

    pub fn skip(&mut self, entry: impl Into<String>, reason: impl Into<String>) {
        let skipped = SkippedEntry {
            entry: entry.into(),
            reason: reason.into(),
        };
        self.sink
            .log(LogLevel::Debug, format!("Skipped '{}': {}", skipped.entry, skipped.reason));
        self.skipped.push(skipped);
    }

    pub fn add_record_file(&mut self, path: PathBuf) {
        self.sink
            .log(LogLevel::Info, format!("Record saved to {}", path.display()));
        self.records.push(path);
    }

    pub fn actions(&self) -> &ActionLog {
        &self.actions
    }

    pub fn into_report(self) -> RunReport {
        RunReport {
            tool: self.tool,
            dry_run: self.dry_run,
            actions: self.actions,
            errors: self.errors,
            skipped: self.skipped,
            records: self.records,
            elapsed: self.start.elapsed(),
        }
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntryFailure;
    use crate::report::action_log::ActionKind;
    use std::path::Path;
    use tokio::sync::mpsc;

    #[test]
    fn test_context_builds_report() {
        let mut ctx = RunContext::detached(Tool::Zip, false);
        ctx.record(ActionRecord::new(ActionKind::Zipped, "a", Path::new("/a"), Some(Path::new("/a.zip"))));
        ctx.skip("b.txt", "not a directory");
        ctx.entry_error(EntryError::new("c", "zipping", EntryFailure::PermissionDenied));

        let report = ctx.into_report();
        assert_eq!(report.tool, Tool::Zip);
        assert_eq!(report.actions.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.has_errors());
    }

    #[test]
    fn test_events_reach_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ctx = RunContext::new(Tool::Rename, EventSink::new(tx), true);
        ctx.progress_start("Renaming", 2);
        ctx.advance("one");
        ctx.record(ActionRecord::new(ActionKind::Renamed, "one", Path::new("/one"), Some(Path::new("/two"))));

        assert!(matches!(rx.try_recv(), Ok(RunEvent::ProgressStart { total: 2, .. })));
        assert!(matches!(rx.try_recv(), Ok(RunEvent::ProgressAdvance { .. })));
        match rx.try_recv() {
            Ok(RunEvent::Log { level, message }) => {
                assert_eq!(level, LogLevel::Success);
                assert!(message.starts_with("Would have renamed"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_report_serializes_errors_as_text() {
        let mut ctx = RunContext::detached(Tool::Unzip, false);
        ctx.entry_error(EntryError::new("x.zip", "extracting", EntryFailure::PermissionDenied));
        let json = serde_json::to_value(ctx.into_report()).unwrap();
        assert_eq!(json["tool"], "unzip");
        assert!(json["errors"][0].as_str().unwrap().contains("permission denied"));
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(Tool::SeqLog.name(), "seq-log");
        assert_eq!(Tool::Cleanup.title(), "Data Clean Up");
        assert_eq!(Tool::ALL.len(), 7);
    }
}
