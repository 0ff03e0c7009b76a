use crate::error::{EntryFailure, EntryResult};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Makes a looked-up spreadsheet value safe to embed in a single path
/// component.
pub fn sanitize_component(value: &str) -> String {
    let mut sanitized = String::with_capacity(value.len());

    for ch in value.trim().chars() {
        match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => sanitized.push('_'),
            '/' | '\\' => sanitized.push('_'),
            c if c.is_control() => sanitized.push('_'),
            c => sanitized.push(c),
        }
    }

    sanitized.trim_end_matches(&['.', ' '][..]).to_string()
}

/// Fails with a name collision when `target` is already taken.
pub fn ensure_vacant(target: &Path) -> EntryResult<()> {
    if target.exists() {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| target.display().to_string());
        return Err(EntryFailure::NameCollision { target: name });
    }
    Ok(())
}

/// True when a rename failed only because source and target live on
/// different file systems.
pub fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

/// Renames `source` to `target`, copying then deleting when the two paths are
/// on different file systems.
pub fn move_path(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => {
            tracing::debug!(
                source = %source.display(),
                destination = %target.display(),
                "cross-device move, falling back to copy"
            );
            if source.is_dir() {
                copy_tree(source, target)?;
                fs::remove_dir_all(source)
            } else {
                copy_preserving_mtime(source, target)?;
                fs::remove_file(source)
            }
        }
        Err(err) => Err(err),
    }
}

/// Copies a file (overwriting `target`) and carries the modification time over.
pub fn copy_preserving_mtime(source: &Path, target: &Path) -> io::Result<u64> {
    let bytes = fs::copy(source, target)?;

    if let Err(err) = preserve_mtime(source, target) {
        tracing::warn!(
            source = %source.display(),
            destination = %target.display(),
            error = %err,
            "could not preserve modification time"
        );
    }

    Ok(bytes)
}

fn preserve_mtime(source: &Path, target: &Path) -> io::Result<()> {
    let modified = fs::metadata(source)?.modified()?;
    filetime::set_file_mtime(target, filetime::FileTime::from_system_time(modified))
}

fn copy_tree(source: &Path, target: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else if entry.file_type().is_file() {
            copy_preserving_mtime(entry.path(), &destination)?;
        }
    }
    Ok(())
}
