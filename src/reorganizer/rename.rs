use crate::error::{EntryError, EntryFailure, Result};
use crate::matcher::{EntryScanner, KeyRule};
use crate::reference::{ReferenceRecord, ReferenceTable};
use crate::reorganizer::fs_ops::{ensure_vacant, sanitize_component};
use crate::report::{ActionKind, ActionRecord};
use crate::runner::RunContext;
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;

/// Renames work-number folders to `{work number}.{BBID} in {vector} {date}`.
#[derive(Debug, Clone)]
pub struct FolderRenamer {
    rule: KeyRule,
    bbid_column: String,
    vector_column: String,
    date_format: String,
}

impl FolderRenamer {
    pub fn new(prefix_len: usize, bbid_column: impl Into<String>, vector_column: impl Into<String>) -> Self {
        Self {
            rule: KeyRule::Prefix(prefix_len),
            bbid_column: bbid_column.into(),
            vector_column: vector_column.into(),
            date_format: "%Y-%m-%d".to_string(),
        }
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn target_name(&self, work_number: &str, record: &ReferenceRecord, now: DateTime<Local>) -> String {
        format!(
            "{}.{} in {} {}",
            work_number,
            sanitize_component(record.get(&self.bbid_column)),
            sanitize_component(record.get(&self.vector_column)),
            now.format(&self.date_format)
        )
    }

    pub fn run(&self, root: &Path, table: &ReferenceTable, ctx: &mut RunContext) -> Result<()> {
        let folders: Vec<_> = EntryScanner::new()
            .scan(root)?
            .into_iter()
            .filter(|e| e.is_dir())
            .collect();

        ctx.progress_start("Renaming folders", folders.len());

        for folder in folders {
            ctx.advance(&folder.name);

            let Some(work_number) = self.rule.extract(&folder.name) else {
                ctx.skip(&folder.name, "name is too short to hold a work number");
                continue;
            };

            let Some(record) = table.lookup(&work_number.key) else {
                ctx.skip(
                    &folder.name,
                    format!("no record found for work number {}", work_number.key),
                );
                continue;
            };

            for column in [&self.bbid_column, &self.vector_column] {
                if record.get(column).trim().is_empty() {
                    ctx.warn(format!(
                        "Work number {} has a blank {} cell; '{}' will be renamed without it",
                        work_number.key, column, folder.name
                    ));
                }
            }

            let new_name = self.target_name(&work_number.key, record, ctx.started_at());
            if new_name == folder.name {
                ctx.skip(&folder.name, "already renamed");
                continue;
            }

            let target = root.join(&new_name);
            if let Err(failure) = ensure_vacant(&target) {
                ctx.entry_error(EntryError::new(&folder.name, "renaming", failure));
                continue;
            }

            if !ctx.dry_run() {
                if let Err(err) = fs::rename(&folder.path, &target) {
                    ctx.entry_error(EntryError::new(&folder.name, "renaming", EntryFailure::from(err)));
                    continue;
                }
            }

            ctx.record(ActionRecord::new(
                ActionKind::Renamed,
                &folder.name,
                &folder.path,
                Some(&target),
            ));
        }

        Ok(())
    }
}
