//! A1-notation helpers for addressing the client sheet.

use super::record::{COLUMN_COUNT, RowPosition};

/// Column letter for a zero-based index (0 → A). Single letters only; the
/// client sheet never goes past column Z.
pub fn column_letter(index: usize) -> char {
    debug_assert!(index < 26, "column index {index} out of range");
    (b'A' + index as u8) as char
}

/// Zero-based index for a column letter.
pub fn column_index(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase();
    upper
        .is_ascii_uppercase()
        .then(|| (upper as u8 - b'A') as usize)
}

/// Sheet name as it must appear in front of `!`. Names with anything other
/// than letters, digits or underscores are single-quoted.
pub fn quote_sheet(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Whole-column range covering every client row, e.g. `Клиенты!A:I`.
pub fn full_range(sheet: &str) -> String {
    format!(
        "{}!A:{}",
        quote_sheet(sheet),
        column_letter(COLUMN_COUNT - 1)
    )
}

/// Header row range, e.g. `Клиенты!A1:I1`.
pub fn header_range(sheet: &str) -> String {
    row_span(sheet, RowPosition(1), 0, COLUMN_COUNT - 1)
}

/// Cells `first_col..=last_col` of a single row, e.g. `Клиенты!G5:I5`.
pub fn row_span(sheet: &str, row: RowPosition, first_col: usize, last_col: usize) -> String {
    format!(
        "{}!{}{}:{}{}",
        quote_sheet(sheet),
        column_letter(first_col),
        row.number(),
        column_letter(last_col),
        row.number()
    )
}

/// A parsed `Sheet!A5:I5`-style range. Row bounds are `None` for whole columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub first_col: usize,
    pub first_row: Option<u32>,
    pub last_col: usize,
    pub last_row: Option<u32>,
}

impl A1Range {
    pub fn parse(range: &str) -> Option<Self> {
        let (sheet_part, cells) = range.rsplit_once('!')?;
        let sheet = unquote_sheet(sheet_part);
        let (start, end) = match cells.split_once(':') {
            Some((s, e)) => (s, e),
            None => (cells, cells),
        };
        let (first_col, first_row) = parse_cell(start)?;
        let (last_col, last_row) = parse_cell(end)?;
        if last_col < first_col {
            return None;
        }
        if let (Some(first), Some(last)) = (first_row, last_row) {
            if last < first {
                return None;
            }
        }
        Some(Self {
            sheet,
            first_col,
            first_row,
            last_col,
            last_row,
        })
    }
}

/// Row of the first cell in an API `updatedRange` such as `Клиенты!A7:I7`.
pub fn first_row_of(range: &str) -> Option<RowPosition> {
    A1Range::parse(range)?.first_row.map(RowPosition)
}

fn unquote_sheet(raw: &str) -> String {
    match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

fn parse_cell(cell: &str) -> Option<(usize, Option<u32>)> {
    let mut chars = cell.chars();
    let col = column_index(chars.next()?)?;
    let digits: String = chars.collect();
    if digits.is_empty() {
        return Some((col, None));
    }
    let row: u32 = digits.parse().ok()?;
    (row > 0).then_some((col, Some(row)))
}
