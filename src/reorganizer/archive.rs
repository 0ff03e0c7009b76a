use crate::error::{EntryError, EntryFailure, EntryResult, Result};
use crate::matcher::EntryScanner;
use crate::report::{ActionKind, ActionRecord};
use crate::runner::RunContext;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Writes `directory` into a deflate-compressed archive at `archive_path`,
/// entries named relative to `directory` with `/` separators. Returns the
/// number of files stored.
///
/// A failure after the archive file was created removes that partial file;
/// a failure to create it leaves whatever was at `archive_path` alone.
/// Symbolic links inside `directory` fail the archive, since they would be
/// lost when the folder is removed.
pub fn zip_directory(directory: &Path, archive_path: &Path) -> EntryResult<usize> {
    let file = File::create(archive_path)?;

    write_archive(directory, file).inspect_err(|_| {
        if let Err(err) = fs::remove_file(archive_path) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(archive = %archive_path.display(), error = %err, "could not remove partial archive");
            }
        }
    })
}

fn write_archive(directory: &Path, file: File) -> EntryResult<usize> {
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0;

    for entry in WalkDir::new(directory).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(directory)
            .map_err(|e| EntryFailure::Archive {
                message: e.to_string(),
            })?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            writer.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut writer)?;
            files += 1;
        } else {
            return Err(EntryFailure::Archive {
                message: format!("'{}' is a symbolic link or special file and cannot be archived", name),
            });
        }
    }

    let mut inner = writer.finish()?;
    inner.flush()?;
    Ok(files)
}

/// Extracts `archive_path` into `target`. Entry names that would land outside
/// `target` fail the whole archive.
pub fn extract_archive(archive_path: &Path, target: &Path) -> EntryResult<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    fs::create_dir_all(target)?;
    let mut files = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let relative = entry.enclosed_name().ok_or_else(|| EntryFailure::Archive {
            message: format!("unsafe entry name '{}'", entry.name()),
        })?;
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = File::create(&out_path)?;
            io::copy(&mut entry, &mut out_file)?;
            files += 1;
        }
    }

    Ok(files)
}

/// If `target` holds exactly one entry and it is a directory, lifts that
/// directory's children into `target` and removes it. Returns whether a
/// collapse happened.
pub fn collapse_single_directory(target: &Path) -> io::Result<bool> {
    let children = fs::read_dir(target)?.collect::<io::Result<Vec<_>>>()?;
    let [only] = children.as_slice() else {
        return Ok(false);
    };
    if !only.file_type()?.is_dir() {
        return Ok(false);
    }

    // Park the wrapper under a temporary name so a child sharing its name
    // can be lifted into place.
    let parking = tempfile::Builder::new()
        .prefix(".seqsort-collapse-")
        .tempdir_in(target)?;
    let wrapper = parking.path().join("wrapper");
    fs::rename(only.path(), &wrapper)?;

    for child in fs::read_dir(&wrapper)? {
        let child = child?;
        fs::rename(child.path(), target.join(child.file_name()))?;
    }

    parking.close()?;
    Ok(true)
}

/// Replaces every sub-directory of a folder with a zip archive of it.
#[derive(Debug, Default)]
pub struct FolderZipper;

impl FolderZipper {
    pub fn new() -> Self {
        Self
    }

    pub fn archive_path(directory: &Path) -> PathBuf {
        let mut name = directory.as_os_str().to_os_string();
        name.push(".zip");
        PathBuf::from(name)
    }

    pub fn run(&self, root: &Path, ctx: &mut RunContext) -> Result<()> {
        let folders: Vec<_> = EntryScanner::new()
            .scan(root)?
            .into_iter()
            .filter(|e| e.is_dir())
            .collect();

        ctx.progress_start("Zipping folders", folders.len());

        for folder in folders {
            ctx.advance(&folder.name);
            let archive = Self::archive_path(&folder.path);

            if ctx.dry_run() {
                ctx.record(ActionRecord::new(ActionKind::Zipped, &folder.name, &folder.path, Some(&archive)));
                continue;
            }

            match zip_directory(&folder.path, &archive) {
                Ok(files) => {
                    ctx.debug(format!("Archived {} files from {}", files, folder.name));
                }
                Err(failure) => {
                    ctx.entry_error(EntryError::new(&folder.name, "zipping", failure));
                    continue;
                }
            }

            if let Err(err) = fs::remove_dir_all(&folder.path) {
                ctx.entry_error(EntryError::new(&folder.name, "removing zipped folder", err.into()));
                continue;
            }

            ctx.record(ActionRecord::new(ActionKind::Zipped, &folder.name, &folder.path, Some(&archive)));
        }

        Ok(())
    }
}

/// Extracts every `.zip` in a folder next to itself and deletes the archive.
#[derive(Debug, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }

    fn unpack(archive: &Path, target: &Path) -> EntryResult<bool> {
        extract_archive(archive, target)?;
        let collapsed = collapse_single_directory(target)?;
        fs::remove_file(archive)?;
        Ok(collapsed)
    }

    pub fn run(&self, root: &Path, ctx: &mut RunContext) -> Result<()> {
        let zip_extension = ["zip".to_string()];
        let archives: Vec<_> = EntryScanner::new()
            .scan(root)?
            .into_iter()
            .filter(|e| e.is_file() && e.has_extension(&zip_extension))
            .collect();

        ctx.progress_start("Extracting archives", archives.len());

        for archive in archives {
            ctx.advance(&archive.name);
            let target = root.join(archive.stem());

            if ctx.dry_run() {
                ctx.record(ActionRecord::new(ActionKind::Unzipped, &archive.name, &archive.path, Some(&target)));
                continue;
            }

            match Self::unpack(&archive.path, &target) {
                Ok(collapsed) => {
                    if collapsed {
                        ctx.debug(format!("Collapsed single top-level folder in {}", archive.stem()));
                    }
                    ctx.record(ActionRecord::new(ActionKind::Unzipped, &archive.name, &archive.path, Some(&target)));
                }
                Err(failure) => {
                    ctx.entry_error(EntryError::new(&archive.name, "extracting", failure));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Tool;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn snapshot(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap())
            .map(|e| {
                let rel = e
                    .path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/");
                let content = if e.file_type().is_file() {
                    Some(fs::read(e.path()).unwrap())
                } else {
                    None
                };
                (rel, content)
            })
            .collect()
    }

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("reads").join("empty")).unwrap();
        fs::write(root.join("a.ab1"), b"trace").unwrap();
        fs::write(root.join("reads").join("b.fasta"), b">seq\nACGT").unwrap();
    }

    #[test]
    fn test_zip_then_unzip_restores_tree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let plate = root.join("plate1");
        build_tree(&plate);
        let before = snapshot(&plate);

        let mut ctx = RunContext::detached(Tool::Zip, false);
        FolderZipper::new().run(root, &mut ctx).unwrap();
        assert!(!plate.exists());
        assert!(root.join("plate1.zip").is_file());
        assert_eq!(ctx.into_report().actions.len(), 1);

        let mut ctx = RunContext::detached(Tool::Unzip, false);
        ArchiveExtractor::new().run(root, &mut ctx).unwrap();
        assert!(!root.join("plate1.zip").exists());
        assert_eq!(snapshot(&plate), before);
    }

    #[test]
    fn test_archive_names_are_relative() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("d");
        build_tree(&dir);
        let archive_path = temp_dir.path().join("d.zip");
        assert_eq!(zip_directory(&dir, &archive_path).unwrap(), 2);

        let archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["a.ab1", "reads/", "reads/b.fasta", "reads/empty/"]);
    }

    #[test]
    fn test_single_wrapper_is_collapsed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        // Wrapper shares its name with one of its children.
        let staging = root.join("staging");
        fs::create_dir_all(staging.join("job").join("job")).unwrap();
        fs::write(staging.join("job").join("x.ab1"), "x").unwrap();
        fs::write(staging.join("job").join("job").join("y.ab1"), "y").unwrap();
        zip_directory(&staging, &root.join("job.zip")).unwrap();
        fs::remove_dir_all(&staging).unwrap();

        let mut ctx = RunContext::detached(Tool::Unzip, false);
        ArchiveExtractor::new().run(root, &mut ctx).unwrap();

        let target = root.join("job");
        assert!(target.join("x.ab1").is_file());
        assert!(target.join("job").join("y.ab1").is_file());
        let names: Vec<_> = fs::read_dir(&target)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_collapse_leaves_multiple_entries() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("a")).unwrap();
        fs::write(temp_dir.path().join("b.txt"), "b").unwrap();
        assert!(!collapse_single_directory(temp_dir.path()).unwrap());
        assert!(temp_dir.path().join("a").is_dir());
    }

    #[test]
    fn test_corrupt_archive_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("bad.zip"), "not a zip").unwrap();

        let mut ctx = RunContext::detached(Tool::Unzip, false);
        ArchiveExtractor::new().run(root, &mut ctx).unwrap();
        let report = ctx.into_report();

        assert!(root.join("bad.zip").is_file());
        assert_eq!(report.errors.len(), 1);
        assert!(report.actions.is_empty());
    }

    #[test]
    fn test_unsafe_entry_name_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let archive_path = temp_dir.path().join("evil.zip");
        {
            let mut writer = ZipWriter::new(File::create(&archive_path).unwrap());
            writer
                .start_file("../escape.txt", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"x").unwrap();
            writer.finish().unwrap();
        }

        let result = extract_archive(&archive_path, &temp_dir.path().join("evil"));
        assert!(matches!(result, Err(EntryFailure::Archive { .. })));
        assert!(!temp_dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_unwritable_archive_path_keeps_existing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        build_tree(&root.join("p"));
        // A directory already sits where the archive would go.
        fs::create_dir(root.join("p.zip")).unwrap();
        fs::write(root.join("p.zip").join("keep.txt"), "keep").unwrap();

        let result = zip_directory(&root.join("p"), &root.join("p.zip"));

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(root.join("p.zip").join("keep.txt")).unwrap(), "keep");
        assert!(root.join("p").join("a.ab1").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_fails_folder_and_keeps_it() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let folder = root.join("p");
        build_tree(&folder);
        std::os::unix::fs::symlink(folder.join("a.ab1"), folder.join("link.ab1")).unwrap();

        let mut ctx = RunContext::detached(Tool::Zip, false);
        FolderZipper::new().run(root, &mut ctx).unwrap();
        let report = ctx.into_report();

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].to_string().contains("link.ab1"));
        assert!(report.actions.is_empty());
        assert!(folder.join("link.ab1").exists());
        assert!(!root.join("p.zip").exists());
    }

    #[test]
    fn test_zip_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        build_tree(&temp_dir.path().join("p"));

        let mut ctx = RunContext::detached(Tool::Zip, true);
        FolderZipper::new().run(temp_dir.path(), &mut ctx).unwrap();

        assert!(temp_dir.path().join("p").is_dir());
        assert!(!temp_dir.path().join("p.zip").exists());
        assert_eq!(ctx.into_report().actions.len(), 1);
    }
}
