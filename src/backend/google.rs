use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{Rows, SheetsBackend};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::range::{parse_range, SheetRange};
use crate::types::SheetRef;

const SPREADSHEET_MIME_FILTER: &str = "mimeType='application/vnd.google-apps.spreadsheet'";

/// Google Sheets + Drive backend over reqwest
pub struct GoogleBackend {
    client: Client,
    sheets_url: Url,
    drive_url: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<SheetRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct ValuesBody {
    values: Rows,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

impl GoogleBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            sheets_url: parse_base_url(&config.sheets_api_url)?,
            drive_url: parse_base_url(&config.drive_api_url)?,
        })
    }

    /// `{sheets}/spreadsheets/{id}/values/{range}{suffix}`
    fn values_url(&self, spreadsheet_id: &str, range: &SheetRange, suffix: &str) -> Result<Url> {
        let segment = format!("{}{}", range, suffix);
        extend_url(
            &self.sheets_url,
            &["spreadsheets", spreadsheet_id, "values", &segment],
        )
    }

    async fn send(&self, request: RequestBuilder, token: &str) -> Result<Response> {
        let response = request.bearer_auth(token).send().await?;
        check_status(response).await
    }
}

fn parse_base_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| SyncError::Remote {
        status: 0,
        message: format!("Invalid API url {}: {}", url, e),
    })
}

/// Append path segments to a base url, percent-encoding each one
fn extend_url(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SyncError::Remote {
            status: 0,
            message: format!("API url {} cannot take a path", base),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turn a non-2xx response into an error carrying the provider's message
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status.as_u16(), &body);
    debug!(status = status.as_u16(), %message, "request failed");

    Err(SyncError::from_status(status.as_u16(), message))
}

/// Prefer `error.message` from the provider's envelope, otherwise describe
/// the status the way an HTTP client would.
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("Request failed with status code {}", status))
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Decode a `ValueRange` body into plain string rows
pub fn parse_value_range(body: &str) -> Result<Rows> {
    let range: ValueRange = serde_json::from_str(body).map_err(|e| SyncError::Remote {
        status: 200,
        message: format!("Unexpected values response: {}", e),
    })?;

    Ok(range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect())
}

#[async_trait]
impl SheetsBackend for GoogleBackend {
    async fn list_spreadsheets(&self, token: &str) -> Result<Vec<SheetRef>> {
        let url = extend_url(&self.drive_url, &["files"])?;
        debug!(%url, "listing spreadsheets");

        let request = self
            .client
            .get(url)
            .query(&[("q", SPREADSHEET_MIME_FILTER), ("fields", "files(id, name)")]);

        let list: FileList = self.send(request, token).await?.json().await?;
        Ok(list.files)
    }

    async fn create_spreadsheet(&self, token: &str, title: &str, sheet_name: &str) -> Result<String> {
        let url = extend_url(&self.sheets_url, &["spreadsheets"])?;
        debug!(%url, title, "creating spreadsheet");

        let body = json!({
            "properties": { "title": title },
            "sheets": [{ "properties": { "title": sheet_name } }],
        });

        let created: CreatedSpreadsheet = self
            .send(self.client.post(url).json(&body), token)
            .await?
            .json()
            .await?;

        Ok(created.spreadsheet_id)
    }

    async fn get_values(&self, token: &str, spreadsheet_id: &str, range: &SheetRange) -> Result<Rows> {
        let url = self.values_url(spreadsheet_id, range, "")?;
        debug!(%url, "reading values");

        let body = self.send(self.client.get(url), token).await?.text().await?;
        parse_value_range(&body)
    }

    async fn update_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: Rows,
    ) -> Result<()> {
        let url = self.values_url(spreadsheet_id, range, "")?;
        debug!(%url, "writing values");

        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&ValuesBody { values });

        self.send(request, token).await?;
        Ok(())
    }

    async fn append_values(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &SheetRange,
        values: Rows,
    ) -> Result<SheetRange> {
        let url = self.values_url(spreadsheet_id, range, ":append")?;
        debug!(%url, "appending values");

        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&ValuesBody { values });

        let appended: AppendResponse = self.send(request, token).await?.json().await?;
        parse_range(&appended.updates.updated_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GoogleBackend {
        GoogleBackend::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(403, body), "The caller does not have permission");
    }

    #[test]
    fn test_error_message_without_envelope() {
        assert_eq!(
            error_message(502, "<html>Bad Gateway</html>"),
            "Request failed with status code 502"
        );
    }

    #[test]
    fn test_values_url() {
        let range = SheetRange::columns("Sheet1", 1, 3, None);
        let url = backend().values_url("abc123", &range, ":append").unwrap();

        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Sheet1!A:C:append"
        );
    }

    #[test]
    fn test_values_url_encodes_sheet_name() {
        let range = SheetRange::cell("To do", 1, 5);
        let url = backend().values_url("abc123", &range, "").unwrap();

        assert!(url.as_str().ends_with("/values/'To%20do'!A5"));
    }

    #[test]
    fn test_parse_value_range_stringifies_cells() {
        let rows = parse_value_range(r#"{"range":"Sheet1!A2:C3","values":[["Call mum",20240301,null]]}"#)
            .unwrap();
        assert_eq!(rows, vec![vec!["Call mum", "20240301", ""]]);
    }

    #[test]
    fn test_parse_value_range_without_values() {
        let rows = parse_value_range(r#"{"range":"Sheet1!A2:C1000","majorDimension":"ROWS"}"#).unwrap();
        assert!(rows.is_empty());
    }

    fn response(status: u16, body: &'static str) -> Response {
        Response::from(
            http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_check_status_passes_success_through() {
        let response = check_status(response(200, "{}")).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_check_status_401_is_unauthorized() {
        let body = r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#;
        let err = check_status(response(401, body)).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "Request had invalid authentication credentials.");
    }

    #[tokio::test]
    async fn test_check_status_other_failures_keep_status_and_message() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        let err = check_status(response(403, body)).await.unwrap_err();

        match err {
            SyncError::Remote { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "The caller does not have permission");
            }
            other => panic!("expected Remote, got {:?}", other),
        }

        let err = check_status(response(503, "upstream down")).await.unwrap_err();
        assert!(matches!(err, SyncError::Remote { status: 503, .. }));
        assert_eq!(err.to_string(), "Request failed with status code 503");
    }
}
