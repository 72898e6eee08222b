//! In-process spreadsheet with the same value semantics as the Sheets API.
//!
//! Backs local runs (`INTAKE_LOCAL_SHEET=1`) and the tests. Can be switched
//! offline to simulate an unreachable service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::range::{A1Range, column_letter, quote_sheet};
use super::record::RowPosition;
use super::sheet::{AppendOutcome, SheetClient};
use crate::error::StoreError;

/// A grid of text cells per sheet name. Row 1 is index 0.
#[derive(Default)]
pub struct MemorySheet {
    sheets: RwLock<HashMap<String, Vec<Vec<String>>>>,
    offline: AtomicBool,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a transport error until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of a sheet's rows, trailing blanks trimmed.
    pub async fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        let sheets = self.sheets.read().await;
        sheets
            .get(sheet)
            .map(|grid| trim_grid(grid.clone()))
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Transport("sheet offline".into()))
        } else {
            Ok(())
        }
    }
}

fn parse_range(range: &str) -> Result<A1Range, StoreError> {
    A1Range::parse(range).ok_or_else(|| StoreError::InvalidResponse(format!("bad range {range}")))
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.is_empty())
}

fn trim_row(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

fn trim_grid(grid: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = grid.into_iter().map(trim_row).collect();
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

fn write_cells(grid: &mut Vec<Vec<String>>, first_row: usize, first_col: usize, rows: Vec<Vec<String>>) {
    for (offset, values) in rows.into_iter().enumerate() {
        let row_index = first_row + offset;
        if grid.len() <= row_index {
            grid.resize_with(row_index + 1, Vec::new);
        }
        let target = &mut grid[row_index];
        for (col_offset, value) in values.into_iter().enumerate() {
            let col = first_col + col_offset;
            if target.len() <= col {
                target.resize(col + 1, String::new());
            }
            target[col] = value;
        }
    }
}

#[async_trait]
impl SheetClient for MemorySheet {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.check_online()?;
        let parsed = parse_range(range)?;
        let sheets = self.sheets.read().await;
        let Some(grid) = sheets.get(&parsed.sheet) else {
            return Ok(Vec::new());
        };

        let start = parsed.first_row.map(|r| r as usize - 1).unwrap_or(0);
        let end = parsed
            .last_row
            .map(|r| r as usize)
            .unwrap_or(grid.len())
            .min(grid.len());

        let rows = grid
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|row| {
                row.iter()
                    .skip(parsed.first_col)
                    .take(parsed.last_col + 1 - parsed.first_col)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(trim_grid(rows))
    }

    async fn append_values(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<AppendOutcome, StoreError> {
        self.check_online()?;
        let parsed = parse_range(range)?;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let count = rows.len() as u32;

        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(parsed.sheet.clone()).or_default();
        let next_index = grid
            .iter()
            .rposition(|row| !is_blank_row(row))
            .map(|i| i + 1)
            .unwrap_or(0);
        write_cells(grid, next_index, parsed.first_col, rows);

        let first = RowPosition::from_index(next_index);
        let last = RowPosition(first.number() + count.max(1) - 1);
        let updated_range = format!(
            "{}!{}{}:{}{}",
            quote_sheet(&parsed.sheet),
            column_letter(parsed.first_col),
            first,
            column_letter(parsed.first_col + width - 1),
            last
        );

        Ok(AppendOutcome {
            updated_range,
            updated_rows: count,
        })
    }

    async fn update_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        self.check_online()?;
        let parsed = parse_range(range)?;
        let first_row = parsed
            .first_row
            .ok_or_else(|| StoreError::InvalidResponse(format!("update needs a row: {range}")))?;

        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(parsed.sheet.clone()).or_default();
        write_cells(grid, first_row as usize - 1, parsed.first_col, rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn append_lands_after_last_row() {
        let sheet = MemorySheet::new();
        sheet
            .update_values("S!A1:B1", vec![strings(&["h1", "h2"])])
            .await
            .unwrap();

        let outcome = sheet
            .append_values("S!A:I", vec![strings(&["a", "b"])])
            .await
            .unwrap();
        assert_eq!(outcome.updated_range, "S!A2:B2");
        assert_eq!(outcome.updated_rows, 1);

        let outcome = sheet
            .append_values("S!A:I", vec![strings(&["c"]), strings(&["d"])])
            .await
            .unwrap();
        assert_eq!(outcome.updated_range, "S!A3:A4");

        assert_eq!(sheet.rows("S").await.len(), 4);
    }

    #[tokio::test]
    async fn reversed_range_is_an_error() {
        let sheet = MemorySheet::new();
        let err = sheet.get_values("S!I1:A1").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidResponse(_)));
        assert!(sheet.update_values("S!I1:A1", vec![strings(&["x"])]).await.is_err());
    }

    #[tokio::test]
    async fn get_values_trims_trailing_blanks() {
        let sheet = MemorySheet::new();
        sheet
            .append_values("S!A:I", vec![strings(&["x", "", "", ""])])
            .await
            .unwrap();
        let rows = sheet.get_values("S!A:I").await.unwrap();
        assert_eq!(rows, vec![strings(&["x"])]);
    }

    #[tokio::test]
    async fn update_writes_partial_row() {
        let sheet = MemorySheet::new();
        sheet
            .append_values("S!A:I", vec![strings(&["a", "b", "c"])])
            .await
            .unwrap();
        sheet
            .update_values("S!G1:I1", vec![strings(&["s", "t", "u"])])
            .await
            .unwrap();
        let rows = sheet.get_values("S!A:I").await.unwrap();
        assert_eq!(rows[0], strings(&["a", "b", "c", "", "", "", "s", "t", "u"]));
    }

    #[tokio::test]
    async fn missing_sheet_reads_empty() {
        let sheet = MemorySheet::new();
        assert!(sheet.get_values("Nope!A:I").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_sheet_fails_with_transport_error() {
        let sheet = MemorySheet::new();
        sheet.set_offline(true);
        let err = sheet.get_values("S!A:I").await.unwrap_err();
        assert!(err.is_transient());
        sheet.set_offline(false);
        assert!(sheet.get_values("S!A:I").await.is_ok());
    }
}
