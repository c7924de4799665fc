//! Google Sheets API v4 Client

use serde_json::{json, Value};
use tracing::info;

use super::client::GoogleClient;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// OAuth scopes required for Sheets operations.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

pub struct SheetsApi {
    client: GoogleClient,
}

super::google_api_wrapper!(SheetsApi);

impl SheetsApi {
    /// Create an empty spreadsheet
    pub async fn create_spreadsheet(&self, title: &str) -> Result<Value, String> {
        info!("Creating spreadsheet: {}", title);

        let url = format!("{}/spreadsheets", SHEETS_API_BASE);
        self.client
            .post(&url, &json!({ "properties": { "title": title } }))
            .await
    }

    /// Read a range of cell values (A1 notation, e.g. "Sheet1!A1:C10")
    pub async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Value, String> {
        info!("Reading range {} of spreadsheet {}", range, spreadsheet_id);

        let url = format!(
            "{}/spreadsheets/{}/values/{}",
            SHEETS_API_BASE,
            spreadsheet_id,
            urlencoding::encode(range)
        );
        self.client.get(&url, &[]).await
    }

    /// Overwrite a range with the given rows (array of arrays)
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Value,
    ) -> Result<Value, String> {
        info!("Updating range {} of spreadsheet {}", range, spreadsheet_id);

        let url = format!(
            "{}/spreadsheets/{}/values/{}?valueInputOption=USER_ENTERED",
            SHEETS_API_BASE,
            spreadsheet_id,
            urlencoding::encode(range)
        );
        self.client
            .put(&url, &json!({ "range": range, "values": values }))
            .await
    }

    /// Append rows after the last row of the given range's table
    pub async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Value,
    ) -> Result<Value, String> {
        info!("Appending to range {} of spreadsheet {}", range, spreadsheet_id);

        let url = format!(
            "{}/spreadsheets/{}/values/{}:append?valueInputOption=USER_ENTERED",
            SHEETS_API_BASE,
            spreadsheet_id,
            urlencoding::encode(range)
        );
        self.client.post(&url, &json!({ "values": values })).await
    }
}
