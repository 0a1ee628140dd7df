//! This crate implements the intake service for the meeting-synthesis form.
//! Respondents reach it through signed distribution links, build up a list of
//! synthesis records in a session, and submit the list as rows to a spreadsheet.

pub mod types; // Records, respondents, link parameters and form errors.
pub mod config; // Settings and secrets loading.
pub mod error; // HTTP-facing error type.
pub mod link; // Signed link validation.
pub mod session; // Per-respondent sessions and their synthesis lists.
pub mod batch; // Turning a list into worksheet rows and submitting them.
pub mod sheets; // The spreadsheet backend behind a narrow trait.
pub mod api; // HTTP routes for the form.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use batch::BatchSubmitter;
