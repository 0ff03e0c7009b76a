pub mod action_log;
pub mod sequencing_log;
pub mod workbook;

pub use action_log::{ActionKind, ActionLog, ActionRecord, RecordColumn, RecordLayout};
pub use sequencing_log::{PlateRow, SequencingLog};
pub use workbook::{record_path, CellValue, RecordWorkbook, SheetTable};
