pub mod archive;
pub mod cleanup;
pub mod distribute;
pub mod fs_ops;
pub mod organize;
pub mod rename;

pub use archive::{collapse_single_directory, extract_archive, zip_directory, ArchiveExtractor, FolderZipper};
pub use cleanup::{CompletedProject, DataCleanup};
pub use distribute::ReferenceDistributor;
pub use fs_ops::{copy_preserving_mtime, move_path, sanitize_component};
pub use organize::SequenceOrganizer;
pub use rename::FolderRenamer;
