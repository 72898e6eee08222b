//! Persistence layer: client rows kept in a spreadsheet.

pub mod adapter;
pub mod google;
pub mod memory;
pub mod range;
pub mod record;
pub mod sheet;

pub use adapter::{RecordStore, SheetStore};
pub use google::GoogleSheetsClient;
pub use memory::MemorySheet;
pub use record::{ClientRecord, OrderStatus, RowPosition, StatusView};
pub use sheet::{AppendOutcome, SheetClient};
