//! Synthesis List Module
//!
//! This module implements the temporary list of synthesis records a respondent
//! builds up before submitting. Records keep their insertion order.

use crate::{FormError, SynthesisRecord};
use chrono::NaiveDate;

/// Ordered records waiting to be submitted
#[derive(Debug, Clone, Default)]
pub struct SynthesisList {
    records: Vec<SynthesisRecord>,
}

impl SynthesisList {
    /// Creates a new empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the back of the list
    ///
    /// Blank or whitespace-only text is refused and leaves the list unchanged.
    ///
    /// # Returns
    /// The new length of the list
    pub fn add(&mut self, meeting_date: NaiveDate, synthesis: &str) -> Result<usize, FormError> {
        if synthesis.trim().is_empty() {
            return Err(FormError::EmptySynthesis);
        }

        self.records.push(SynthesisRecord {
            meeting_date,
            synthesis: synthesis.to_string(),
        });
        Ok(self.records.len())
    }

    /// Remove every record
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Remove the first `count` records, used once they reached the worksheet
    ///
    /// Records appended after a submission started stay in the list.
    pub fn drain_submitted(&mut self, count: usize) {
        let count = count.min(self.records.len());
        self.records.drain(..count);
    }

    pub fn records(&self) -> &[SynthesisRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
