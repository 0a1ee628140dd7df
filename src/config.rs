//! Configuration Module
//!
//! This module defines the configuration structures for the intake service.
//! Settings and secrets live in two separate TOML files, both parsed with serde.

use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL_SECS};
use serde::Deserialize;
use std::fs;

/// Organization bound to sessions opened without a signed link
pub const DEFAULT_ORGANIZATION: &str = "Instituto Wedja de Socionomia";

/// Main configuration structure
///
/// Loaded from a TOML file (e.g., config/default.toml).
///
/// # Example TOML
/// ```toml
/// [api]
/// host = "127.0.0.1"
/// port = 8080
///
/// [form]
/// default_organization = "Instituto Wedja de Socionomia"
/// session_ttl_secs = 14400
/// max_sessions = 10000
///
/// [sheet]
/// spreadsheet = "formularios_pessoais"
/// worksheet = "mentores_avaliacoes"
///
/// [secrets]
/// path = "config/secrets.toml"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub sheet: SheetConfig,
    pub secrets: SecretsConfig,
}

/// API server configuration
///
/// # Fields
/// - `host`: IP address to bind to (e.g., "127.0.0.1" or "0.0.0.0")
/// - `port`: TCP port to listen on (e.g., 8080)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Form behaviour settings
#[derive(Debug, Clone, Deserialize)]
pub struct FormConfig {
    /// Organization used when the request carries no link parameters
    #[serde(default = "default_organization")]
    pub default_organization: String,
    /// Seconds a session may stay idle before it is dropped
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,
    /// Upper bound on simultaneously open sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            default_organization: default_organization(),
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Spreadsheet location
///
/// # Fields
/// - `spreadsheet`: Spreadsheet title, resolved through the Drive API when `spreadsheet_id` is unset
/// - `spreadsheet_id`: Optional explicit spreadsheet id, skips the title lookup
/// - `worksheet`: Title of the tab rows are appended to
/// - `sheets_api` / `drive_api`: Base URLs, overridable for testing against a stub
#[derive(Debug, Clone, Deserialize)]
pub struct SheetConfig {
    #[serde(default = "default_spreadsheet")]
    pub spreadsheet: String,
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    #[serde(default = "default_sheets_api")]
    pub sheets_api: String,
    #[serde(default = "default_drive_api")]
    pub drive_api: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet: default_spreadsheet(),
            spreadsheet_id: None,
            worksheet: default_worksheet(),
            sheets_api: default_sheets_api(),
            drive_api: default_drive_api(),
        }
    }
}

/// Where the secrets file lives
#[derive(Debug, Clone, Deserialize)]
pub struct SecretsConfig {
    pub path: String,
}

/// Secret material, read once at startup
///
/// Kept out of `Config` so it never ends up in the startup log line.
#[derive(Clone, Deserialize)]
pub struct Secrets {
    #[serde(rename = "LINK_SECRET_KEY")]
    pub link_secret_key: String,
    pub google_credentials: ServiceAccountKey,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("link_secret_key", &"<redacted>")
            .field("client_email", &self.google_credentials.client_email)
            .finish()
    }
}

/// Service-account credential bundle for the spreadsheet backend
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// PEM private key with literal `\n` sequences turned into real newlines
    pub fn private_key_pem(&self) -> String {
        self.private_key.replace("\\n", "\n")
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Returns
    /// * `Ok(Config)` if the file was successfully loaded and parsed
    /// * `Err` if the file couldn't be read or the TOML is invalid
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Secrets {
    /// Load secrets from the TOML file named in `[secrets] path`
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read secrets file {path}: {e}"))?;
        let secrets: Secrets = toml::from_str(&content)?;
        if secrets.link_secret_key.is_empty() {
            anyhow::bail!("LINK_SECRET_KEY is empty");
        }
        Ok(secrets)
    }
}

fn default_organization() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

fn default_session_ttl_secs() -> i64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_spreadsheet() -> String {
    "formularios_pessoais".to_string()
}

fn default_worksheet() -> String {
    "mentores_avaliacoes".to_string()
}

fn default_sheets_api() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_drive_api() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}
