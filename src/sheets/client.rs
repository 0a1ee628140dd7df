//! Google Sheets Client
//!
//! Appends submission rows to one worksheet of one spreadsheet.
//!
//! # Connection
//! 1. Authenticate as the service account
//! 2. Resolve the spreadsheet id (configured, or looked up by title through Drive)
//! 3. Check that the worksheet exists
//!
//! A connection failure is fatal for the process; an append failure is reported
//! to the caller and nothing is retried.

use crate::{
    SheetRow,
    config::{ServiceAccountKey, SheetConfig},
    sheets::{SheetStore, StoreError, TokenSource},
};
use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Connected handle to the target worksheet
pub struct GoogleSheetsStore {
    http: reqwest::Client,
    auth: TokenSource,
    config: SheetConfig,
    spreadsheet_id: String,
}

impl GoogleSheetsStore {
    /// Authenticate and locate the worksheet
    pub async fn connect(config: SheetConfig, key: &ServiceAccountKey) -> Result<Self, StoreError> {
        let http = reqwest::Client::new();
        let auth = TokenSource::new(key, http.clone())?;

        let mut store = Self {
            http,
            auth,
            config,
            spreadsheet_id: String::new(),
        };

        store.spreadsheet_id = match store.config.spreadsheet_id.clone() {
            Some(id) => id,
            None => store.find_spreadsheet().await?,
        };
        store.check_worksheet().await?;

        info!(
            "Connected to worksheet {:?} of spreadsheet {:?} ({})",
            store.config.worksheet, store.config.spreadsheet, store.spreadsheet_id
        );
        Ok(store)
    }

    async fn find_spreadsheet(&self) -> Result<String, StoreError> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            self.config.spreadsheet.replace('\'', "\\'"),
            SPREADSHEET_MIME_TYPE
        );
        let request = self
            .http
            .get(format!("{}/files", self.config.drive_api))
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);

        let list: DriveFileList = self.send(request).await?.json().await?;
        list.files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| StoreError::NotFound(format!("spreadsheet {:?}", self.config.spreadsheet)))
    }

    async fn check_worksheet(&self) -> Result<(), StoreError> {
        let request = self
            .http
            .get(format!(
                "{}/spreadsheets/{}",
                self.config.sheets_api, self.spreadsheet_id
            ))
            .query(&[("fields", "sheets.properties.title")]);

        let meta: SpreadsheetMeta = self.send(request).await?.json().await?;
        if meta
            .sheets
            .iter()
            .any(|sheet| sheet.properties.title == self.config.worksheet)
        {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!(
                "worksheet {:?} in spreadsheet {:?}",
                self.config.worksheet, self.config.spreadsheet
            )))
        }
    }

    /// Attach a bearer token, send, and turn non-success statuses into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let token = self.auth.token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("Spreadsheet backend rejected the access token, will re-authenticate");
            self.auth.invalidate().await;
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or(body);
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), StoreError> {
        let request = self
            .http
            .post(format!(
                "{}/spreadsheets/{}/values/{}:append",
                self.config.sheets_api,
                self.spreadsheet_id,
                append_range(&self.config.worksheet)
            ))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({
                "majorDimension": "ROWS",
                "values": rows,
            }));

        if let Err(e) = self.send(request).await {
            error!("Appending {} rows failed: {}", rows.len(), e);
            return Err(e);
        }

        info!("Appended {} rows to {:?}", rows.len(), self.config.worksheet);
        Ok(())
    }
}

/// A1 range naming a whole worksheet, path-encoded
fn append_range(worksheet: &str) -> String {
    let quoted = format!("'{}'", worksheet.replace('\'', "''"));
    utf8_percent_encode(&quoted, NON_ALPHANUMERIC).to_string()
}
