//! Row-level access to a remote spreadsheet.

use async_trait::async_trait;

use crate::error::StoreError;

/// Result of an append: where the rows landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    /// A1 range actually written, e.g. `Клиенты!A7:I7`.
    pub updated_range: String,
    pub updated_rows: u32,
}

/// The three value operations the record store needs. All values are text.
#[async_trait]
pub trait SheetClient: Send + Sync {
    /// Read every row in `range`. Trailing blank cells may be omitted.
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Append `rows` after the last non-empty row of the table in `range`.
    async fn append_values(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<AppendOutcome, StoreError>;

    /// Overwrite the cells of `range` with `rows`.
    async fn update_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError>;
}
