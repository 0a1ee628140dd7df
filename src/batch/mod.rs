//! Batch Submission Module
//!
//! This module turns a session's synthesis list into worksheet rows and sends
//! them to the sheet store in a single call:
//! - organization_id: short fingerprint grouping submissions by organization
//! - build_rows: one 9-column row per record, sharing timestamp and organization id
//! - BatchSubmitter: runs a submission and updates the list according to the outcome

mod submitter;


pub use submitter::{BatchSubmitter, SubmitError, batch_timestamp, build_rows, organization_id};
