use crate::error::{EntryError, Result};
use crate::matcher::{require_directory, DirectoryEntry, EntryScanner, KeyRule};
use crate::reorganizer::fs_ops::copy_preserving_mtime;
use crate::report::{ActionKind, ActionRecord};
use crate::runner::RunContext;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Copies reference files into every folder whose base name they share.
#[derive(Debug, Clone)]
pub struct ReferenceDistributor {
    reference_dir: PathBuf,
    extensions: Vec<String>,
    file_rule: KeyRule,
    folder_rule: KeyRule,
}

impl ReferenceDistributor {
    pub fn new(reference_dir: impl Into<PathBuf>) -> Self {
        Self {
            reference_dir: reference_dir.into(),
            extensions: vec!["txt".to_string()],
            file_rule: KeyRule::reference_base_name(),
            folder_rule: KeyRule::folder_base_name(),
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Base name to reference files, each list in name order.
    pub fn index(&self) -> Result<BTreeMap<String, Vec<DirectoryEntry>>> {
        let mut index: BTreeMap<String, Vec<DirectoryEntry>> = BTreeMap::new();

        for file in EntryScanner::new().scan(&self.reference_dir)? {
            if !file.is_file() || !file.has_extension(&self.extensions) {
                continue;
            }
            if let Some(base) = self.file_rule.extract(&file.name) {
                index.entry(base.key).or_default().push(file);
            }
        }

        tracing::debug!(
            reference_dir = %self.reference_dir.display(),
            base_names = index.len(),
            "indexed reference files"
        );
        Ok(index)
    }

    pub fn run(&self, target: &Path, ctx: &mut RunContext) -> Result<()> {
        require_directory(target)?;
        let index = self.index()?;

        let folders: Vec<_> = EntryScanner::new()
            .scan(target)?
            .into_iter()
            .filter(|e| e.is_dir())
            .collect();

        let mut sharing: HashMap<String, usize> = HashMap::new();
        for folder in &folders {
            if let Some(base) = self.folder_rule.extract(&folder.name) {
                *sharing.entry(base.key).or_default() += 1;
            }
        }
        for (base, count) in &sharing {
            if *count > 1 && index.contains_key(base) {
                ctx.warn(format!(
                    "{} folders share the base name '{}'; each receives its reference files",
                    count, base
                ));
            }
        }

        ctx.progress_start("Distributing reference files", folders.len());

        for folder in &folders {
            ctx.advance(&folder.name);

            let Some(base) = self.folder_rule.extract(&folder.name) else {
                ctx.skip(&folder.name, "folder name has no base name");
                continue;
            };
            let Some(files) = index.get(&base.key) else {
                ctx.skip(&folder.name, format!("no reference files for '{}'", base.key));
                continue;
            };

            for file in files {
                let destination = folder.path.join(&file.name);
                if !ctx.dry_run() {
                    if let Err(err) = copy_preserving_mtime(&file.path, &destination) {
                        ctx.entry_error(EntryError::new(
                            format!("{} -> {}", file.name, folder.name),
                            "copying",
                            err.into(),
                        ));
                        continue;
                    }
                }
                ctx.record(ActionRecord::new(ActionKind::Copied, &file.name, &file.path, Some(&destination)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeqSortError;
    use crate::runner::Tool;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let reference = temp_dir.path().join("reference");
        let target = temp_dir.path().join("sorted");
        fs::create_dir_all(&reference).unwrap();
        fs::create_dir_all(&target).unwrap();

        fs::write(reference.join("JOB1+F.txt"), "forward").unwrap();
        fs::write(reference.join("JOB1.R.txt"), "reverse").unwrap();
        fs::write(reference.join("JOB2.txt"), "two").unwrap();
        fs::write(reference.join("JOB1.pdf"), "ignored").unwrap();
        (temp_dir, reference, target)
    }

    #[test]
    fn test_index_groups_by_base_name() {
        let (_tmp, reference, _) = setup();
        let index = ReferenceDistributor::new(&reference).index().unwrap();

        let names: Vec<_> = index["JOB1"].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["JOB1+F.txt", "JOB1.R.txt"]);
        assert_eq!(index["JOB2"].len(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_copies_fan_out() {
        let (_tmp, reference, target) = setup();
        fs::create_dir(target.join("JOB1.P1.BB9")).unwrap();
        fs::create_dir(target.join("JOB1.P2")).unwrap();
        fs::create_dir(target.join("JOB3.P1")).unwrap();
        fs::write(target.join("JOB1.P1.BB9").join("JOB1+F.txt"), "stale").unwrap();

        let mut ctx = RunContext::detached(Tool::Distribute, false);
        ReferenceDistributor::new(&reference).run(&target, &mut ctx).unwrap();
        let report = ctx.into_report();

        for folder in ["JOB1.P1.BB9", "JOB1.P2"] {
            assert_eq!(fs::read_to_string(target.join(folder).join("JOB1+F.txt")).unwrap(), "forward");
            assert!(target.join(folder).join("JOB1.R.txt").is_file());
        }
        assert_eq!(fs::read_dir(target.join("JOB3.P1")).unwrap().count(), 0);
        assert_eq!(report.actions.len(), 4);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_missing_reference_dir_is_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut ctx = RunContext::detached(Tool::Distribute, false);
        let result = ReferenceDistributor::new(temp_dir.path().join("none")).run(temp_dir.path(), &mut ctx);
        assert!(matches!(result, Err(SeqSortError::DirectoryNotFound { .. })));
    }
}
