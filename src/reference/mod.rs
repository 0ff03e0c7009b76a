pub mod loader;
pub mod table;

pub use loader::{cell_text, normalize_label, open_sheet, HeaderIndex, ReferenceLoader, SheetSelector};
pub use table::{ReferenceRecord, ReferenceTable};
