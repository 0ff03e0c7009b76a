pub mod entry_scanner;
pub mod key_rule;

pub use entry_scanner::{require_directory, DirectoryEntry, EntryKind, EntryScanner};
pub use key_rule::{join_dotted, KeyRule, NameKey};
