use serde::{Deserialize, Serialize};

/// Fixed header expected in row 1 of every task sheet
pub const HEADER: [&str; 3] = ["Task", "Date Created", "Date Done"];

/// First row holding task data; row 1 is the header
pub const FIRST_DATA_ROW: u32 = 2;

/// A single task row from the backing sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Row index in the sheet (>= 2)
    pub id: u32,
    pub text: String,
    pub created_date: String,
    /// Empty while the task is still open
    pub completed_date: String,
}

/// A spreadsheet available to the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRef {
    pub id: String,
    pub name: String,
}

/// Where a session stands in the sign-in / sheet selection flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// Signed in but no spreadsheet chosen yet
    Authenticated,
    SheetSelected(String),
}

impl TaskRecord {
    /// Build a record from a raw sheet row. Missing cells default to empty.
    pub fn from_row(id: u32, row: &[String]) -> Self {
        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();

        Self {
            id,
            text: cell(0),
            created_date: cell(1),
            completed_date: cell(2),
        }
    }

    pub fn is_active(&self) -> bool {
        self.completed_date.is_empty()
    }
}
