// store/memory.rs
//
// In-memory test double for the range boundary. Keeps one grid per sheet
// (index 0 is spreadsheet row 1) and understands the same `Sheet!A2:G`
// addressing as the real API, including open-ended column ranges and single
// cells. Trailing blank cells and rows are trimmed from reads the way the
// live API omits them.
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{RangeStore, RangeWrite, ValueRender};
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    sheets: HashMap<String, Vec<Vec<Value>>>,
    batch_calls: usize,
    fail_fragments: Vec<String>,
}

struct ParsedRange {
    sheet: String,
    start_col: usize,
    start_row: u32,
    end_col: usize,
    end_row: Option<u32>,
}

fn parse_cell(s: &str) -> (usize, Option<u32>) {
    let letters: String = s.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits = &s[letters.len()..];
    let col = letters
        .chars()
        .fold(0usize, |acc, c| {
            acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1)
        })
        .saturating_sub(1);
    (col, digits.parse().ok())
}

fn parse_range(range: &str) -> ParsedRange {
    let (sheet, cells) = range.split_once('!').expect("range must name a sheet");
    let (start, end) = match cells.split_once(':') {
        Some((s, e)) => (s, Some(e)),
        None => (cells, None),
    };
    let (start_col, start_row) = parse_cell(start);
    let start_row = start_row.expect("range start must include a row");
    let (end_col, end_row) = match end {
        Some(e) => parse_cell(e),
        None => (start_col, Some(start_row)),
    };
    ParsedRange {
        sheet: sheet.to_string(),
        start_col,
        start_row,
        end_col,
        end_row,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a data row below the current last row (row 1 is reserved for
    /// the header, as in the live sheets).
    pub fn push_row(&self, sheet: &str, cells: Vec<Value>) {
        let mut inner = self.inner.lock().unwrap();
        let grid = inner.sheets.entry(sheet.to_string()).or_default();
        if grid.is_empty() {
            grid.push(Vec::new());
        }
        grid.push(cells);
    }

    pub fn set_cell(&self, sheet: &str, row: u32, col: usize, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        let grid = inner.sheets.entry(sheet.to_string()).or_default();
        let row_idx = row as usize - 1;
        while grid.len() <= row_idx {
            grid.push(Vec::new());
        }
        let cells = &mut grid[row_idx];
        while cells.len() <= col {
            cells.push(Value::Null);
        }
        cells[col] = value;
    }

    pub fn cell(&self, sheet: &str, row: u32, col: usize) -> Value {
        let inner = self.inner.lock().unwrap();
        inner
            .sheets
            .get(sheet)
            .and_then(|grid| grid.get(row as usize - 1))
            .and_then(|cells| cells.get(col))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Data rows (row 2 downward) with trailing blank cells trimmed.
    pub fn data_rows(&self, sheet: &str) -> Vec<Vec<Value>> {
        let inner = self.inner.lock().unwrap();
        let Some(grid) = inner.sheets.get(sheet) else {
            return Vec::new();
        };
        grid.iter()
            .skip(1)
            .map(|row| {
                let mut cells = row.clone();
                while cells.last().is_some_and(is_blank) {
                    cells.pop();
                }
                cells
            })
            .collect()
    }

    pub fn batch_calls(&self) -> usize {
        self.inner.lock().unwrap().batch_calls
    }

    /// Makes every read or update whose range contains `fragment` fail, to
    /// exercise partial-failure paths.
    pub fn fail_on(&self, fragment: &str) {
        self.inner.lock().unwrap().fail_fragments.push(fragment.to_string());
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().fail_fragments.clear();
    }

    fn injected_failure(inner: &Inner, range: &str) -> Option<AppError> {
        if inner.fail_fragments.iter().any(|f| range.contains(f)) {
            return Some(AppError::Api {
                status: 503,
                body: format!("injected failure for {range}"),
            });
        }
        None
    }

    fn apply_write(inner: &mut Inner, range: &str, values: &[Vec<Value>]) {
        let parsed = parse_range(range);
        let grid = inner.sheets.entry(parsed.sheet).or_default();
        for (i, row_values) in values.iter().enumerate() {
            let row_idx = parsed.start_row as usize - 1 + i;
            while grid.len() <= row_idx {
                grid.push(Vec::new());
            }
            let row = &mut grid[row_idx];
            for (j, value) in row_values.iter().enumerate() {
                let col = parsed.start_col + j;
                while row.len() <= col {
                    row.push(Value::Null);
                }
                row[col] = value.clone();
            }
        }
    }
}

#[async_trait]
impl RangeStore for MemoryStore {
    async fn read_range(
        &self,
        range: &str,
        _render: ValueRender,
    ) -> Result<Vec<Vec<Value>>, AppError> {
        let inner = self.inner.lock().unwrap();
        if let Some(err) = Self::injected_failure(&inner, range) {
            return Err(err);
        }
        let parsed = parse_range(range);
        let Some(grid) = inner.sheets.get(&parsed.sheet) else {
            return Ok(Vec::new());
        };
        let start = parsed.start_row as usize - 1;
        let end = parsed
            .end_row
            .map(|r| r as usize)
            .unwrap_or(grid.len())
            .min(grid.len());

        let mut out = Vec::new();
        for row in grid.iter().take(end).skip(start) {
            let from = parsed.start_col.min(row.len());
            let to = (parsed.end_col + 1).min(row.len());
            let mut cells: Vec<Value> = row[from..to].to_vec();
            while cells.last().is_some_and(is_blank) {
                cells.pop();
            }
            out.push(cells);
        }
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn update_range(&self, range: &str, values: Vec<Vec<Value>>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = Self::injected_failure(&inner, range) {
            return Err(err);
        }
        Self::apply_write(&mut inner, range, &values);
        Ok(())
    }

    async fn batch_update(&self, writes: Vec<RangeWrite>) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.batch_calls += 1;
        for write in &writes {
            Self::apply_write(&mut inner, &write.range, &write.values);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn open_ended_ranges_read_all_data_rows() {
        let store = MemoryStore::new();
        store.push_row("Referrers", vec![json!("1"), json!("@a")]);
        store.push_row("Referrers", vec![json!("2"), json!("@b")]);

        let rows = store
            .read_range("Referrers!A2:G", ValueRender::Unformatted)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![json!("2"), json!("@b")]);
    }

    #[tokio::test]
    async fn single_column_and_single_cell_ranges() {
        let store = MemoryStore::new();
        store.push_row("Referrers", vec![json!("1"), json!("@a"), json!("CODE01")]);

        let codes = store
            .read_range("Referrers!C2:C", ValueRender::Formatted)
            .await
            .unwrap();
        assert_eq!(codes, vec![vec![json!("CODE01")]]);

        store
            .update_range("Referrers!F2", vec![vec![json!(30.0)]])
            .await
            .unwrap();
        assert_eq!(store.cell("Referrers", 2, 5), json!(30.0));
    }

    #[tokio::test]
    async fn trailing_blanks_are_trimmed() {
        let store = MemoryStore::new();
        store.push_row("Withdrawals", vec![json!("D1"), json!("2"), json!(""), json!("")]);

        let rows = store
            .read_range("Withdrawals!A2:D", ValueRender::Unformatted)
            .await
            .unwrap();
        assert_eq!(rows[0].len(), 2);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_api_errors() {
        let store = MemoryStore::new();
        store.fail_on("Invited");
        let err = store
            .read_range("Invited!A2:B", ValueRender::Formatted)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api { status: 503, .. }));

        let err = store
            .update_range("Invited!A2:B2", vec![vec![json!("1"), json!("X")]])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api { status: 503, .. }));

        store.clear_failures();
        assert!(store
            .read_range("Invited!A2:B", ValueRender::Formatted)
            .await
            .is_ok());
    }
}
