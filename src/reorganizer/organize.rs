use crate::error::{EntryError, EntryFailure, Result};
use crate::matcher::{join_dotted, require_directory, DirectoryEntry, EntryScanner, KeyRule};
use crate::reference::ReferenceTable;
use crate::reorganizer::fs_ops::{ensure_vacant, move_path, sanitize_component};
use crate::report::{ActionKind, ActionRecord};
use crate::runner::RunContext;
use std::fs;
use std::path::Path;

/// Sorts sequencing reads (`plasmid_job_rest.ab1`) into per-job folders named
/// `{job}.{plasmid}.{bbid}` under a destination directory.
#[derive(Debug, Clone)]
pub struct SequenceOrganizer {
    rule: KeyRule,
    bbid_column: String,
    sequence_extensions: Vec<String>,
    purge_extensions: Vec<String>,
}

impl SequenceOrganizer {
    pub fn new(bbid_column: impl Into<String>) -> Self {
        Self {
            rule: KeyRule::UnderscoreSegments,
            bbid_column: bbid_column.into(),
            sequence_extensions: vec!["ab1".to_string(), "fasta".to_string()],
            purge_extensions: vec!["seq".to_string()],
        }
    }

    pub fn with_sequence_extensions(mut self, extensions: Vec<String>) -> Self {
        self.sequence_extensions = extensions;
        self
    }

    pub fn with_purge_extensions(mut self, extensions: Vec<String>) -> Self {
        self.purge_extensions = extensions;
        self
    }

    /// Destination folder name for a read file, `None` when the name does not
    /// follow the convention or the job is unknown.
    pub fn folder_name(&self, file_name: &str, table: &ReferenceTable) -> Option<String> {
        let key = self.rule.extract(file_name)?;
        let record = table.lookup(&key.key)?;
        let plasmid = key.qualifier.unwrap_or_default();
        let bbid = sanitize_component(record.get(&self.bbid_column));
        Some(join_dotted(&[key.key.as_str(), plasmid.as_str(), bbid.as_str()]))
    }

    pub fn run(&self, source: &Path, destination: &Path, table: &ReferenceTable, ctx: &mut RunContext) -> Result<()> {
        require_directory(source)?;
        let entries = EntryScanner::new().scan(source)?;

        let (purge, rest): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .filter(|e| e.is_file())
            .partition(|e| e.has_extension(&self.purge_extensions));
        let reads: Vec<_> = rest
            .into_iter()
            .filter(|e| e.has_extension(&self.sequence_extensions))
            .collect();

        self.purge(&purge, ctx);

        ctx.progress_start("Organizing sequence files", reads.len());
        for read in &reads {
            ctx.advance(&read.name);
            self.organize_one(read, destination, table, ctx);
        }

        Ok(())
    }

    fn purge(&self, files: &[DirectoryEntry], ctx: &mut RunContext) {
        for file in files {
            if !ctx.dry_run() {
                if let Err(err) = fs::remove_file(&file.path) {
                    ctx.entry_error(EntryError::new(&file.name, "deleting", err.into()));
                    continue;
                }
            }
            ctx.record(ActionRecord::new(ActionKind::Deleted, &file.name, &file.path, None));
        }
    }

    fn organize_one(&self, read: &DirectoryEntry, destination: &Path, table: &ReferenceTable, ctx: &mut RunContext) {
        let Some(key) = self.rule.extract(&read.name) else {
            ctx.skip(&read.name, "name does not match plasmid_job_rest");
            return;
        };
        let Some(folder) = self.folder_name(&read.name, table) else {
            ctx.skip(&read.name, format!("job {} not found in reference", key.key));
            return;
        };

        let folder_path = destination.join(&folder);
        let target = folder_path.join(&read.name);

        if let Err(failure) = ensure_vacant(&target) {
            ctx.entry_error(EntryError::new(&read.name, "moving", failure));
            return;
        }

        if !ctx.dry_run() {
            if let Err(failure) = Self::relocate(&read.path, &folder_path, &target) {
                ctx.entry_error(EntryError::new(&read.name, "moving", failure));
                return;
            }
        }

        ctx.record(ActionRecord::new(ActionKind::Moved, &read.name, &read.path, Some(&target)));
    }

    fn relocate(source: &Path, folder: &Path, target: &Path) -> std::result::Result<(), EntryFailure> {
        fs::create_dir_all(folder)?;
        move_path(source, target)?;
        Ok(())
    }
}
