//! Sheet Store Module
//!
//! This module is the seam to the external spreadsheet that receives submissions:
//! - SheetStore: the append-only interface the batch submitter writes through
//! - GoogleSheetsStore: Google Sheets implementation using a service account
//! - TokenSource: OAuth2 access tokens for the service account, cached until near expiry

mod auth;
mod client;
#[cfg(test)]
pub mod memory;

pub use auth::TokenSource;
pub use client::GoogleSheetsStore;

use crate::SheetRow;
use async_trait::async_trait;
use thiserror::Error;

/// Failures talking to the spreadsheet backend
///
/// The display text is what the respondent sees when a submission fails.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to spreadsheet backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("spreadsheet backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{0} not found")]
    NotFound(String),
}

/// Destination for submitted rows
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Append all rows in a single call, interpreting values as if typed by a user
    async fn append_rows(&self, rows: &[SheetRow]) -> Result<(), StoreError>;
}
