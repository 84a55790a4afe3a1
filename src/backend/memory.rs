//! In-memory spreadsheet backend
//!
//! Behaves like the remote service for the range shapes the synchronizer
//! uses: reads trim trailing empty rows, appends go after the last used row,
//! writes grow the grid as needed. Failures can be queued to exercise error
//! handling.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use super::{Rows, SheetsBackend};
use crate::error::{Result, SyncError};
use crate::range::{CellRef, SheetRange};
use crate::types::SheetRef;

#[derive(Debug, Default)]
struct Spreadsheet {
    name: String,
    /// sheet name -> grid, row 0 is sheet row 1
    sheets: HashMap<String, Vec<Vec<String>>>,
}

/// Spreadsheet store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    spreadsheets: Mutex<HashMap<String, Spreadsheet>>,
    failures: Mutex<VecDeque<SyncError>>,
    calls: Mutex<Vec<String>>,
    rejected_tokens: Mutex<HashSet<String>>,
    next_id: Mutex<u64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spreadsheet with one sheet holding `rows`, starting at row 1
    pub fn insert_sheet(&self, id: &str, name: &str, sheet_name: &str, rows: Rows) {
        let mut spreadsheet = Spreadsheet {
            name: name.to_string(),
            ..Default::default()
        };
        spreadsheet.sheets.insert(sheet_name.to_string(), rows);
        self.lock_spreadsheets().insert(id.to_string(), spreadsheet);
    }

    /// Current grid of a sheet, if it exists
    pub fn rows(&self, id: &str, sheet_name: &str) -> Option<Rows> {
        self.lock_spreadsheets()
            .get(id)
            .and_then(|s| s.sheets.get(sheet_name))
            .cloned()
    }

    /// Make the next call fail with `error`. Queued errors are used in order.
    pub fn fail_next(&self, error: SyncError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    /// Answer every call made with `token` with a 401, as for an expired credential
    pub fn reject_token(&self, token: &str) {
        self.rejected_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.to_string());
    }

    /// Names of the operations performed so far, e.g. `get Sheet1!A1:C1`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_spreadsheets(&self) -> std::sync::MutexGuard<'_, HashMap<String, Spreadsheet>> {
        self.spreadsheets.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);

        match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn check_token(&self, token: &str) -> Result<()> {
        let rejected = self
            .rejected_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(token);

        if token.is_empty() || rejected {
            return Err(SyncError::from_status(401, "Request had invalid authentication credentials."));
        }
        Ok(())
    }

    fn with_sheet<T>(
        &self,
        spreadsheet_id: &str,
        range: &SheetRange,
        f: impl FnOnce(&mut Vec<Vec<String>>) -> T,
    ) -> Result<T> {
        let mut spreadsheets = self.lock_spreadsheets();
        let spreadsheet = spreadsheets.get_mut(spreadsheet_id).ok_or_else(|| {
            SyncError::from_status(404, "Requested entity was not found.")
        })?;

        let sheet_name = range.sheet.clone().unwrap_or_default();
        let grid = spreadsheet.sheets.get_mut(&sheet_name).ok_or_else(|| {
            SyncError::from_status(400, format!("Unable to parse range: {}", range))
        })?;

        Ok(f(grid))
    }
}

/// Zero-based (first_col, last_col, first_row, last_row) covered by a range.
/// Open ends are `None`.
fn bounds(range: &SheetRange) -> (usize, Option<usize>, usize, Option<usize>) {
    let end = range.end.unwrap_or(range.start);
    let zero = |n: Option<u32>| n.map(|n| n.saturating_sub(1) as usize);

    (
        zero(range.start.column).unwrap_or(0),
        zero(end.column),
        zero(range.start.row).unwrap_or(0),
        zero(end.row),
    )
}

fn trim_row(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl SheetsBackend for MemoryBackend {
    async fn list_spreadsheets(&self, token: &str) -> Result<Vec<SheetRef>> {
        self.check_token(token)?;
        self.record("list".to_string())?;

        let mut refs: Vec<SheetRef> = self
            .lock_spreadsheets()
            .iter()
            .map(|(id, s)| SheetRef {
                id: id.clone(),
                name: s.name.clone(),
            })
            .collect();
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    async fn create_spreadsheet(&self, token: &str, title: &str, sheet_name: &str) -> Result<String> {
        self.check_token(token)?;
        self.record(format!("create {}", title))?;

        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            format!("sheet-{}", next)
        };
        self.insert_sheet(&id, title, sheet_name, Vec::new());
        Ok(id)
    }

    async fn get_values(&self, token: &str, spreadsheet_id: &str, range: &SheetRange) -> Result<Rows> {
        self.check_token(token)?;
        self.record(format!("get {}", range))?;

        let (first_col, last_col, first_row, last_row) = bounds(range);
        self.with_sheet(spreadsheet_id, range, |grid| {
            let last_row = last_row.map_or(grid.len(), |r| (r + 1).min(grid.len()));
            let mut rows: Rows = grid
                .iter()
                .take(last_row)
                .skip(first_row)
                .map(|row| {
                    let end = last_col.map_or(row.len(), |c| (c + 1).min(row.len()));
                    trim_row(row.iter().take(end).skip(first_col).cloned().collect())
                })
                .collect();

            while rows.last().is_some_and(|r| r.is_empty()) {
                rows.pop();
            }
            rows
        })
    }

    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: Rows,
    ) -> Result<()> {
        self.check_token(token)?;
        self.record(format!("update {}", range))?;

        let (first_col, _, first_row, _) = bounds(range);
        self.with_sheet(spreadsheet_id, range, |grid| {
            for (r, row) in values.into_iter().enumerate() {
                let r = first_row + r;
                if grid.len() <= r {
                    grid.resize(r + 1, Vec::new());
                }
                for (c, value) in row.into_iter().enumerate() {
                    let c = first_col + c;
                    if grid[r].len() <= c {
                        grid[r].resize(c + 1, String::new());
                    }
                    grid[r][c] = value;
                }
            }
        })
    }

    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: Rows,
    ) -> Result<SheetRange> {
        self.check_token(token)?;
        self.record(format!("append {}", range))?;

        let (first_col, _, _, _) = bounds(range);
        let sheet = range.sheet.clone();

        self.with_sheet(spreadsheet_id, range, |grid| {
            while grid.last().is_some_and(|r| r.iter().all(|c| c.is_empty())) {
                grid.pop();
            }

            let start_row = grid.len();
            let width = values.iter().map(Vec::len).max().unwrap_or(0).max(1);

            for row in values.iter() {
                let mut cells = vec![String::new(); first_col];
                cells.extend(row.iter().cloned());
                grid.push(cells);
            }

            let first_col = first_col as u32 + 1;
            SheetRange {
                sheet,
                start: CellRef::new(first_col, start_row as u32 + 1),
                end: Some(CellRef::new(
                    first_col + width as u32 - 1,
                    grid.len() as u32,
                )),
            }
        })
    }
}
