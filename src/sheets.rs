//! Google Sheets v4 implementation of [`TabularStore`].
//!
//! Authentication uses the service-account JWT bearer grant; the access
//! token is cached until shortly before it expires.

use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::ServiceAccountKey;
use crate::error::StoreError;
use crate::store::{TableHandle, TabularStore};

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Reply>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reply {
    add_sheet: Option<Sheet>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// A spreadsheet reached through the Google Sheets API
pub struct GoogleSheetsStore {
    client: Client,
    spreadsheet_id: String,
    key: ServiceAccountKey,
    token: Mutex<Option<AccessToken>>,
}

impl GoogleSheetsStore {
    pub fn new(spreadsheet_id: &str, key: ServiceAccountKey) -> Result<Self, StoreError> {
        // Reject an unusable key at startup instead of on the first request.
        EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;

        Ok(GoogleSheetsStore {
            client: Client::new(),
            spreadsheet_id: spreadsheet_id.to_string(),
            key,
            token: Mutex::new(None),
        })
    }

    /// A valid access token, fetching a new one when needed
    async fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?,
        )?;

        let response: TokenResponse = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let lifetime = Duration::from_secs(response.expires_in.unwrap_or(TOKEN_LIFETIME_SECS as u64));
        debug!("fetched access token for {}", self.key.client_email);
        let value = response.access_token;
        *cached = Some(AccessToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        Ok(value)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        Ok(request.bearer_auth(self.access_token().await?))
    }

    fn spreadsheet_url(&self) -> String {
        format!("{API_BASE}/{}", self.spreadsheet_id)
    }

    fn values_url(&self, table: &TableHandle) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(&a1_range(&table.name))
        )
    }
}

/// A1 notation for a whole sheet, quoting the title
fn a1_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

impl TabularStore for GoogleSheetsStore {
    async fn find_table(&self, name: &str) -> Result<Option<TableHandle>, StoreError> {
        let request = self
            .client
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties(sheetId,title)")]);
        let meta: SpreadsheetMeta = self
            .authorized(request)
            .await?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(meta
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .find(|props| props.title == name)
            .map(|props| TableHandle {
                id: props.sheet_id,
                name: props.title,
            }))
    }

    async fn create_table(&self, name: &str, rows: u32, cols: u32) -> Result<TableHandle, StoreError> {
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": name,
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]
        });
        let request = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .json(&body);
        let response: BatchUpdateResponse = self
            .authorized(request)
            .await?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let props = response
            .replies
            .into_iter()
            .find_map(|reply| reply.add_sheet)
            .map(|sheet| sheet.properties)
            .ok_or_else(|| StoreError::Unavailable("addSheet returned no sheet".into()))?;

        Ok(TableHandle {
            id: props.sheet_id,
            name: props.title,
        })
    }

    async fn append_row(&self, table: &TableHandle, row: Vec<String>) -> Result<(), StoreError> {
        let request = self
            .client
            .post(format!("{}:append", self.values_url(table)))
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }));
        self.authorized(request)
            .await?
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn read_rows(&self, table: &TableHandle) -> Result<Vec<Vec<String>>, StoreError> {
        let request = self
            .client
            .get(self.values_url(table))
            .query(&[("majorDimension", "ROWS"), ("valueRenderOption", "FORMATTED_VALUE")]);
        let range: ValueRange = self
            .authorized(request)
            .await?
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(range.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_titles_are_quoted() {
        assert_eq!(a1_range("records"), "'records'");
        assert_eq!(a1_range("Ali's log"), "'Ali''s log'");
    }

    #[test]
    fn value_range_without_values_is_empty() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"'records'!A1:Z1000","majorDimension":"ROWS"}"#).unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn sheet_metadata_parses() {
        let meta: SpreadsheetMeta = serde_json::from_str(
            r#"{"sheets":[{"properties":{"sheetId":0,"title":"Sheet1"}},{"properties":{"sheetId":917,"title":"records"}}]}"#,
        )
        .unwrap();
        let ids: Vec<(i64, String)> = meta
            .sheets
            .into_iter()
            .map(|s| (s.properties.sheet_id, s.properties.title))
            .collect();
        assert_eq!(ids, vec![(0, "Sheet1".to_string()), (917, "records".to_string())]);
    }

    #[test]
    fn add_sheet_reply_parses() {
        let response: BatchUpdateResponse = serde_json::from_str(
            r#"{"spreadsheetId":"x","replies":[{"addSheet":{"properties":{"sheetId":42,"title":"records","index":1}}}]}"#,
        )
        .unwrap();
        let sheet = response.replies.into_iter().find_map(|r| r.add_sheet).unwrap();
        assert_eq!(sheet.properties.sheet_id, 42);
    }

    #[test]
    fn invalid_private_key_is_rejected_up_front() {
        let key = ServiceAccountKey {
            client_email: "svc@example.iam.gserviceaccount.com".into(),
            private_key: "not a pem".into(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        };
        assert!(matches!(
            GoogleSheetsStore::new("sheet-id", key),
            Err(StoreError::Unavailable(_))
        ));
    }
}
