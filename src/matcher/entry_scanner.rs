use crate::error::{Result, SeqSortError};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One name in a source directory, captured before the batch starts.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub path: PathBuf,
    pub name: String,
    pub extension: String,
    pub kind: EntryKind,
    pub created: SystemTime,
}

impl DirectoryEntry {
    pub fn new(path: PathBuf, kind: EntryKind, created: SystemTime) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        Self {
            path,
            name,
            extension,
            kind,
            created,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn has_extension(&self, extensions: &[String]) -> bool {
        !self.extension.is_empty()
            && extensions
                .iter()
                .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&self.extension))
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) if pos > 0 => &self.name[..pos],
            _ => &self.name,
        }
    }
}

/// Lists one directory level. Each run works from this snapshot, so entries
/// created during the run (archives, moved folders) are never revisited.
#[derive(Debug, Default)]
pub struct EntryScanner {
    include_hidden: bool,
}

impl EntryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    pub fn scan<P: AsRef<Path>>(&self, root: P) -> Result<Vec<DirectoryEntry>> {
        let root = root.as_ref();
        require_directory(root)?;

        let mut entries = Vec::new();
        for item in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
            let item = match item {
                Ok(item) => item,
                Err(err) if err.depth() == 0 => {
                    return Err(err.into_io_error().map_or_else(
                        || SeqSortError::directory_not_found(root),
                        SeqSortError::Io,
                    ));
                }
                Err(err) => {
                    tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            let file_type = item.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                // Symlinks and special files are left alone.
                continue;
            };

            let created = item
                .metadata()
                .ok()
                .and_then(|m| m.created().or_else(|_| m.modified()).ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            let entry = DirectoryEntry::new(item.into_path(), kind, created);
            if !self.include_hidden && entry.name.starts_with('.') {
                continue;
            }
            entries.push(entry);
        }

        tracing::debug!(root = %root.display(), count = entries.len(), "scanned directory");
        Ok(entries)
    }
}

pub fn require_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(SeqSortError::directory_not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_entry_metadata() {
        let entry = DirectoryEntry::new(
            PathBuf::from("/data/Plate 7.XLSX"),
            EntryKind::File,
            SystemTime::UNIX_EPOCH,
        );
        assert_eq!(entry.name, "Plate 7.XLSX");
        assert_eq!(entry.extension, "xlsx");
        assert_eq!(entry.stem(), "Plate 7");
        assert!(entry.has_extension(&["xls".to_string(), ".xlsx".to_string()]));
        assert!(!entry.has_extension(&["zip".to_string()]));
    }

    #[test]
    fn test_stem_of_dotless_and_hidden_names() {
        let entry = DirectoryEntry::new(PathBuf::from("folder"), EntryKind::Directory, SystemTime::UNIX_EPOCH);
        assert_eq!(entry.stem(), "folder");
        let entry = DirectoryEntry::new(PathBuf::from(".zip"), EntryKind::File, SystemTime::UNIX_EPOCH);
        assert_eq!(entry.stem(), ".zip");
    }

    #[test]
    fn test_scan_is_one_level_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("b_folder")).unwrap();
        fs::create_dir_all(root.join("a_folder").join("nested")).unwrap();
        fs::write(root.join("c.ab1"), "x").unwrap();
        fs::write(root.join("a_folder").join("nested").join("deep.txt"), "x").unwrap();
        fs::write(root.join(".hidden"), "x").unwrap();

        let entries = EntryScanner::new().scan(root).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a_folder", "b_folder", "c.ab1"]);
        assert!(entries[0].is_dir());
        assert!(entries[2].is_file());

        let with_hidden = EntryScanner::new().with_hidden(true).scan(root).unwrap();
        assert_eq!(with_hidden.len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("real")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let entries = EntryScanner::new().scan(root).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["real"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let result = EntryScanner::new().scan(&missing);
        assert!(matches!(result, Err(SeqSortError::DirectoryNotFound { .. })));
    }
}
