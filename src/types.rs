use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date format used for every date that leaves the service (DD/MM/YYYY)
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Number of columns in every row appended to the worksheet
pub const ROW_WIDTH: usize = 9;

/// One worksheet row, in column order:
/// timestamp, organization id, name, birthdate, contact, area/company, role,
/// meeting date, synthesis text
pub type SheetRow = [String; ROW_WIDTH];

/// Signed link parameters as they arrive on the query string
///
/// All three are optional together. An empty value is treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkParams {
    pub org: Option<String>,
    pub exp: Option<String>,
    pub sig: Option<String>,
}

/// Outcome of a successful link check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessGrant {
    /// Organization bound to the session
    pub organization: String,
    /// `true` when the grant came from a verified signature, `false` in open mode
    pub signed: bool,
}

/// Reasons a link is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("invalid link")]
    Incomplete,
    #[error("invalid or tampered link")]
    Tampered,
    #[error("expired link")]
    Expired { expired_at: i64 },
    #[error("malformed link")]
    Malformed,
}

/// A single meeting evaluation entered by the respondent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRecord {
    pub meeting_date: NaiveDate,
    pub synthesis: String,
}

impl SynthesisRecord {
    /// Meeting date rendered as DD/MM/YYYY
    pub fn formatted_date(&self) -> String {
        self.meeting_date.format(DATE_FORMAT).to_string()
    }

    /// Rebuild a record from the last two columns of a submitted row
    pub fn from_row(row: &SheetRow) -> Option<Self> {
        let meeting_date = NaiveDate::parse_from_str(&row[7], DATE_FORMAT).ok()?;
        Some(Self {
            meeting_date,
            synthesis: row[8].clone(),
        })
    }
}

/// Identification fields filled once per submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Respondent {
    #[serde(default)]
    pub full_name: String,
    pub birthdate: NaiveDate,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub role: String,
}

/// Recoverable input problems reported inline to the respondent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("please fill in the synthesis/evaluation field")]
    EmptySynthesis,
    #[error("the list is empty; add at least one record before submitting")]
    EmptyList,
    #[error("birthdate {0} is outside the accepted range")]
    BirthdateOutOfRange(NaiveDate),
}

/// Result of a successful batch submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub submitted: usize,
    pub timestamp: String,
    pub organization_id: String,
}
