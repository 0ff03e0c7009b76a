use crate::error::{EntryError, Result};
use crate::matcher::{require_directory, EntryScanner, KeyRule};
use crate::reorganizer::fs_ops::{ensure_vacant, move_path};
use crate::report::{ActionKind, ActionRecord, RecordLayout, RecordWorkbook};
use crate::runner::RunContext;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One uploaded project archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedProject {
    pub file_name: String,
    pub date_created: String,
    pub work_number: String,
}

/// Lists completed projects from the uploaded archives and moves their
/// sorted sequencing folders out of the working area.
#[derive(Debug, Clone)]
pub struct DataCleanup {
    rule: KeyRule,
    timestamp_format: String,
}

impl DataCleanup {
    pub fn new(prefix_len: usize) -> Self {
        Self {
            rule: KeyRule::Prefix(prefix_len),
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    pub fn completion_record_path(output: &Path, now: DateTime<Local>) -> PathBuf {
        output.join(format!("{} Project_Completion_Record.xlsx", now.format("%Y-%m")))
    }

    pub fn cleanup_record_path(output: &Path, now: DateTime<Local>) -> PathBuf {
        output.join(format!("{} Data Clean Up Record.xlsx", now.format("%Y-%m-%d")))
    }

    pub fn completed_projects(&self, uploaded: &Path) -> Result<Vec<CompletedProject>> {
        let zip_extension = ["zip".to_string()];

        Ok(EntryScanner::new()
            .scan(uploaded)?
            .into_iter()
            .filter(|e| e.is_file() && e.has_extension(&zip_extension))
            .map(|archive| CompletedProject {
                date_created: DateTime::<Local>::from(archive.created)
                    .format(&self.timestamp_format)
                    .to_string(),
                work_number: self
                    .rule
                    .extract(&archive.name)
                    .map(|k| k.key)
                    .unwrap_or_default(),
                file_name: archive.name,
            })
            .collect())
    }

    pub fn run(&self, uploaded: &Path, sorted: &Path, output: &Path, ctx: &mut RunContext) -> Result<()> {
        require_directory(uploaded)?;
        require_directory(sorted)?;
        require_directory(output)?;

        let now = ctx.started_at();
        let projects = self.completed_projects(uploaded)?;
        ctx.info(format!("Found {} completed project archives", projects.len()));

        if !ctx.dry_run() {
            let rows = projects.iter().map(|p| {
                vec![
                    p.file_name.clone(),
                    p.date_created.clone(),
                    p.work_number.clone(),
                ]
            });
            let path = RecordWorkbook::new()
                .with_sheet("Completed Projects", &["File Name", "Date Created", "Work Number"], rows)
                .save(&Self::completion_record_path(output, now))?;
            ctx.add_record_file(path);
        }

        let completed: HashSet<&str> = projects
            .iter()
            .map(|p| p.work_number.as_str())
            .filter(|w| !w.is_empty())
            .collect();

        let folders: Vec<_> = EntryScanner::new()
            .scan(sorted)?
            .into_iter()
            .filter(|e| e.is_dir())
            .collect();

        ctx.progress_start("Moving completed folders", folders.len());

        for folder in &folders {
            ctx.advance(&folder.name);

            let Some(work_number) = self.rule.extract(&folder.name) else {
                ctx.skip(&folder.name, "name is too short to hold a work number");
                continue;
            };
            if !completed.contains(work_number.key.as_str()) {
                ctx.skip(&folder.name, "project not completed");
                continue;
            }

            let destination = output.join(&folder.name);
            if let Err(failure) = ensure_vacant(&destination) {
                ctx.entry_error(EntryError::new(&folder.name, "moving", failure));
                continue;
            }

            if !ctx.dry_run() {
                if let Err(err) = move_path(&folder.path, &destination) {
                    ctx.entry_error(EntryError::new(&folder.name, "moving", err.into()));
                    continue;
                }
            }

            ctx.record(ActionRecord::new(ActionKind::Moved, &folder.name, &folder.path, Some(&destination)));
        }

        if !ctx.dry_run() {
            let date = now.format("%Y-%m-%d").to_string();
            let path = RecordWorkbook::from_actions(
                ctx.actions(),
                &RecordLayout::MOVED_FOLDERS,
                &date,
                &self.timestamp_format,
            )
            .save(&Self::cleanup_record_path(output, now))?;
            ctx.add_record_file(path);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::loader::{cell_text, open_sheet, SheetSelector};
    use crate::runner::Tool;
    use std::fs;
    use tempfile::TempDir;

    struct Layout {
        _tmp: TempDir,
        uploaded: PathBuf,
        sorted: PathBuf,
        output: PathBuf,
    }

    fn layout() -> Layout {
        let tmp = TempDir::new().unwrap();
        let uploaded = tmp.path().join("uploaded");
        let sorted = tmp.path().join("sorted");
        let output = tmp.path().join("output");
        for dir in [&uploaded, &sorted, &output] {
            fs::create_dir(dir).unwrap();
        }
        fs::write(uploaded.join("123456789 final.zip"), "zip").unwrap();
        fs::write(uploaded.join("tiny.zip"), "zip").unwrap();
        fs::write(uploaded.join("222222222 notes.txt"), "txt").unwrap();

        fs::create_dir(sorted.join("123456789.BB1 in pUC19 2024-01-01")).unwrap();
        fs::create_dir(sorted.join("222222222.BB2")).unwrap();
        Layout {
            _tmp: tmp,
            uploaded,
            sorted,
            output,
        }
    }

    #[test]
    fn test_completed_projects() {
        let l = layout();
        let projects = DataCleanup::new(9).completed_projects(&l.uploaded).unwrap();

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].file_name, "123456789 final.zip");
        assert_eq!(projects[0].work_number, "123456789");
        assert_eq!(projects[1].work_number, "");
        assert_eq!(projects[0].date_created.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_run_moves_completed_folders_and_writes_records() {
        let l = layout();
        let mut ctx = RunContext::detached(Tool::Cleanup, false);
        let now = ctx.started_at();
        DataCleanup::new(9)
            .run(&l.uploaded, &l.sorted, &l.output, &mut ctx)
            .unwrap();
        let report = ctx.into_report();

        assert!(l.output.join("123456789.BB1 in pUC19 2024-01-01").is_dir());
        assert!(l.sorted.join("222222222.BB2").is_dir());
        assert_eq!(report.actions.len(), 1);
        assert_eq!(report.records.len(), 2);

        let completion = DataCleanup::completion_record_path(&l.output, now);
        let (sheet, range) = open_sheet(&completion, &SheetSelector::First).unwrap();
        assert_eq!(sheet, "Completed Projects");
        assert_eq!(range.rows().count(), 3);

        let cleanup = DataCleanup::cleanup_record_path(&l.output, now);
        let (sheet, range) = open_sheet(&cleanup, &SheetSelector::First).unwrap();
        assert_eq!(sheet, "Moved Folders");
        let header: Vec<String> = range.rows().next().unwrap().iter().map(cell_text).collect();
        assert_eq!(header, vec!["Folder Name", "Original Path", "New Path", "Date Moved"]);

        let (_, summary) = open_sheet(&cleanup, &SheetSelector::Named("Summary".to_string())).unwrap();
        let totals: Vec<String> = summary.rows().nth(1).unwrap().iter().map(cell_text).collect();
        assert_eq!(totals[1], "1");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let l = layout();
        let mut ctx = RunContext::detached(Tool::Cleanup, true);
        DataCleanup::new(9)
            .run(&l.uploaded, &l.sorted, &l.output, &mut ctx)
            .unwrap();

        assert_eq!(fs::read_dir(&l.output).unwrap().count(), 0);
        assert!(l.sorted.join("123456789.BB1 in pUC19 2024-01-01").is_dir());
        assert_eq!(ctx.into_report().actions.len(), 1);
    }
}
