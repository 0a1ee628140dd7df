//! Batch Submitter
//!
//! Sends every listed record as one batch of rows. The list is only trimmed
//! once the store has accepted the batch, so a failed submission can be
//! retried without re-entering anything.

use crate::{
    DATE_FORMAT, FormError, Respondent, SheetRow, SubmissionReceipt, SynthesisRecord,
    session::SynthesisList,
    sheets::{SheetStore, StoreError},
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use md5::{Digest, Md5};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Why a submission did not reach the worksheet
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error("error sending data to the spreadsheet: {0}")]
    Store(#[from] StoreError),
}

/// First 8 hex characters (uppercase) of the MD5 of the trimmed, uppercased name
pub fn organization_id(organization: &str) -> String {
    let normalized = organization.trim().to_uppercase();
    let digest = Md5::digest(normalized.as_bytes());
    hex::encode_upper(&digest[..4])
}

/// ISO-8601 local timestamp with second precision and no offset
pub fn batch_timestamp(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// One row per record, in worksheet column order
pub fn build_rows(
    timestamp: &str,
    organization_id: &str,
    respondent: &Respondent,
    records: &[SynthesisRecord],
) -> Vec<SheetRow> {
    let birthdate = respondent.birthdate.format(DATE_FORMAT).to_string();

    records
        .iter()
        .map(|record| {
            [
                timestamp.to_string(),
                organization_id.to_string(),
                respondent.full_name.clone(),
                birthdate.clone(),
                respondent.contact.clone(),
                respondent.company.clone(),
                respondent.role.clone(),
                record.formatted_date(),
                record.synthesis.clone(),
            ]
        })
        .collect()
}

/// Submits synthesis lists through a shared sheet store
#[derive(Clone)]
pub struct BatchSubmitter {
    store: Arc<dyn SheetStore>,
}

impl BatchSubmitter {
    pub fn new(store: Arc<dyn SheetStore>) -> Self {
        Self { store }
    }

    /// Submit the list using the current local time
    pub async fn submit(
        &self,
        organization: &str,
        list: &mut SynthesisList,
        respondent: &Respondent,
    ) -> Result<SubmissionReceipt, SubmitError> {
        self.submit_at(organization, list, respondent, Local::now().naive_local())
            .await
    }

    /// Submit the list as of `now`
    ///
    /// # Steps
    /// 1. Refuse an empty list or an out-of-range birthdate without calling the store
    /// 2. Derive the organization id and one timestamp for the whole batch
    /// 3. Append all rows in a single store call
    /// 4. On success drop the submitted records; on failure leave the list untouched
    pub async fn submit_at(
        &self,
        organization: &str,
        list: &mut SynthesisList,
        respondent: &Respondent,
        now: NaiveDateTime,
    ) -> Result<SubmissionReceipt, SubmitError> {
        if list.is_empty() {
            warn!("Submission refused: list is empty");
            return Err(FormError::EmptyList.into());
        }
        check_birthdate(respondent.birthdate, now.date())?;

        let organization_id = organization_id(organization);
        let timestamp = batch_timestamp(now);
        let rows = build_rows(&timestamp, &organization_id, respondent, list.records());

        info!(
            "Submitting {} records for organization {} at {}",
            rows.len(),
            organization_id,
            timestamp
        );

        if let Err(e) = self.store.append_rows(&rows).await {
            error!(
                "Submission of {} records for organization {} failed: {}",
                rows.len(),
                organization_id,
                e
            );
            return Err(e.into());
        }

        list.drain_submitted(rows.len());
        info!("{} records submitted successfully", rows.len());

        Ok(SubmissionReceipt {
            submitted: rows.len(),
            timestamp,
            organization_id,
        })
    }
}

fn check_birthdate(birthdate: NaiveDate, today: NaiveDate) -> Result<(), FormError> {
    let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    if birthdate < earliest || birthdate > today {
        return Err(FormError::BirthdateOutOfRange(birthdate));
    }
    Ok(())
}
