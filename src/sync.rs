use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::backend::SheetsBackend;
use crate::error::{Result, SyncError};
use crate::range::SheetRange;
use crate::types::{SheetRef, TaskRecord, FIRST_DATA_ROW, HEADER};

const TASK_COLUMN: u32 = 1;
const DONE_COLUMN: u32 = 3;

/// Today's calendar date, taken from the UTC ISO-8601 timestamp
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `YYYY-MM-DD`
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// True when the first row is exactly the task header
pub fn header_matches(row: Option<&Vec<String>>) -> bool {
    let Some(row) = row else {
        return false;
    };
    row.len() >= HEADER.len() && row.iter().zip(HEADER).all(|(cell, expected)| cell == expected)
}

/// Keeps a to-do list in a spreadsheet: one task per row below a fixed header
pub struct ListSynchronizer<B: SheetsBackend> {
    backend: B,
    sheet_name: String,
    today: fn() -> NaiveDate,
}

impl<B: SheetsBackend> ListSynchronizer<B> {
    pub fn new(backend: B, sheet_name: impl Into<String>) -> Self {
        Self {
            backend,
            sheet_name: sheet_name.into(),
            today: utc_today,
        }
    }

    /// Replace the clock used for created/completed dates
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn header_range(&self) -> SheetRange {
        SheetRange::row(&self.sheet_name, TASK_COLUMN, DONE_COLUMN, 1)
    }

    fn today_string(&self) -> String {
        iso_date((self.today)())
    }

    fn task_row(&self, id: u32) -> Result<u32> {
        if id < FIRST_DATA_ROW {
            return Err(SyncError::Range {
                range: format!("{}!{}", self.sheet_name, id),
                reason: "row 1 holds the header".to_string(),
            });
        }
        Ok(id)
    }

    /// List spreadsheets the credential can see
    pub async fn list_sheets(&self, token: &str) -> Result<Vec<SheetRef>> {
        let sheets = self.backend.list_spreadsheets(token).await?;
        debug!(count = sheets.len(), "listed spreadsheets");
        Ok(sheets)
    }

    /// Create a spreadsheet ready to hold tasks and return its id
    pub async fn create_sheet(&self, token: &str, title: &str) -> Result<String> {
        let id = self.new_spreadsheet(token, title).await?;
        self.write_header(token, &id).await?;
        Ok(id)
    }

    /// Create an empty spreadsheet with the task sheet but no header yet
    pub async fn new_spreadsheet(&self, token: &str, title: &str) -> Result<String> {
        let id = self
            .backend
            .create_spreadsheet(token, title, &self.sheet_name)
            .await?;

        info!(spreadsheet_id = %id, title, "created spreadsheet");
        Ok(id)
    }

    /// Overwrite row 1 with the task header
    pub async fn write_header(&self, token: &str, spreadsheet_id: &str) -> Result<()> {
        let header = vec![HEADER.iter().map(|h| h.to_string()).collect()];
        self.backend
            .update_values(token, spreadsheet_id, &self.header_range(), header)
            .await
    }

    /// Rewrite row 1 unless it already holds the task header.
    /// Returns whether the header was rewritten.
    pub async fn ensure_header(&self, token: &str, spreadsheet_id: &str) -> Result<bool> {
        let rows = self
            .backend
            .get_values(token, spreadsheet_id, &self.header_range())
            .await?;

        if header_matches(rows.first()) {
            return Ok(false);
        }

        info!(spreadsheet_id, found = ?rows.first(), "repairing header row");
        self.write_header(token, spreadsheet_id).await?;
        Ok(true)
    }

    /// Active tasks in sheet order
    pub async fn list(&self, token: &str, spreadsheet_id: &str) -> Result<Vec<TaskRecord>> {
        // Header first, so a foreign or damaged sheet is repaired before rows are read
        self.ensure_header(token, spreadsheet_id).await?;

        let range = SheetRange::columns(&self.sheet_name, TASK_COLUMN, DONE_COLUMN, Some(FIRST_DATA_ROW));
        let rows = self.backend.get_values(token, spreadsheet_id, &range).await?;

        // Row i of the response is sheet row i + 2
        let tasks: Vec<TaskRecord> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| TaskRecord::from_row(FIRST_DATA_ROW + i as u32, row))
            .filter(TaskRecord::is_active)
            .collect();

        debug!(rows = rows.len(), active = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    /// Append a new task dated today. Returns the row it landed in.
    pub async fn append_task(&self, token: &str, spreadsheet_id: &str, text: &str) -> Result<Option<u32>> {
        let range = SheetRange::columns(&self.sheet_name, TASK_COLUMN, DONE_COLUMN, None);
        let row = vec![text.to_string(), self.today_string(), String::new()];

        let written = self
            .backend
            .append_values(token, spreadsheet_id, &range, vec![row])
            .await?;
        info!(row = ?written.first_row(), "added task");

        Ok(written.first_row())
    }

    /// Overwrite the text cell of the task at row `id`
    pub async fn write_text(&self, token: &str, spreadsheet_id: &str, id: u32, text: &str) -> Result<()> {
        let range = SheetRange::cell(&self.sheet_name, TASK_COLUMN, self.task_row(id)?);
        self.backend
            .update_values(token, spreadsheet_id, &range, vec![vec![text.to_string()]])
            .await?;
        info!(row = id, "updated task");
        Ok(())
    }

    /// Write today's date into the done cell of the task at row `id`
    pub async fn mark_done(&self, token: &str, spreadsheet_id: &str, id: u32) -> Result<()> {
        let range = SheetRange::cell(&self.sheet_name, DONE_COLUMN, self.task_row(id)?);
        self.backend
            .update_values(token, spreadsheet_id, &range, vec![vec![self.today_string()]])
            .await?;
        info!(row = id, "completed task");
        Ok(())
    }

    /// Append a new task dated today, then return the refreshed list.
    ///
    /// Not safe to repeat as a whole: a retry after the append landed adds
    /// the row again. Callers that re-authenticate on a 401 go through
    /// [`TodoClient`](crate::TodoClient), which retries each step on its own.
    pub async fn add(&self, token: &str, spreadsheet_id: &str, text: &str) -> Result<Vec<TaskRecord>> {
        self.append_task(token, spreadsheet_id, text).await?;
        self.list(token, spreadsheet_id).await
    }

    /// Replace the text of the task at row `id`
    pub async fn update(
        &self,
        token: &str,
        spreadsheet_id: &str,
        id: u32,
        text: &str,
    ) -> Result<Vec<TaskRecord>> {
        self.write_text(token, spreadsheet_id, id, text).await?;
        self.list(token, spreadsheet_id).await
    }

    /// Mark the task at row `id` done today
    pub async fn complete(&self, token: &str, spreadsheet_id: &str, id: u32) -> Result<Vec<TaskRecord>> {
        self.mark_done(token, spreadsheet_id, id).await?;
        self.list(token, spreadsheet_id).await
    }
}
