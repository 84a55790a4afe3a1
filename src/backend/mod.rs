use async_trait::async_trait;

use crate::error::Result;
use crate::range::SheetRange;
use crate::types::SheetRef;

pub mod google;
pub mod memory;

/// Rows of cell values as returned by a range read
pub type Rows = Vec<Vec<String>>;

/// Backend trait for spreadsheet access.
///
/// Every call carries the bearer credential so a caller can swap it after
/// re-authentication without rebuilding the backend.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// List the spreadsheets visible to the credential
    async fn list_spreadsheets(&self, token: &str) -> Result<Vec<SheetRef>>;

    /// Create a spreadsheet with a single sheet, returning its id
    async fn create_spreadsheet(&self, token: &str, title: &str, sheet_name: &str) -> Result<String>;

    /// Read a range. Trailing empty rows and cells may be omitted.
    async fn get_values(&self, token: &str, spreadsheet_id: &str, range: &SheetRange) -> Result<Rows>;

    /// Overwrite a range with raw (unparsed) values
    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: Rows,
    ) -> Result<()>;

    /// Insert rows after the last used row of a range.
    /// Returns the range that was written.
    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: Rows,
    ) -> Result<SheetRange>;
}
