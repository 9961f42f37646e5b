//! Case entity as reported by the backend

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend-assigned case identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub u64);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CaseId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(CaseId)
    }
}

impl From<u64> for CaseId {
    fn from(id: u64) -> Self {
        CaseId(id)
    }
}

/// Processing status
///
/// Values the backend may add later are kept verbatim in `Unknown` and
/// treated like `Pending`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CaseStatus {
    Pending,
    Processing,
    Complete,
    Unknown(String),
}

impl From<String> for CaseStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => CaseStatus::Pending,
            "processing" => CaseStatus::Processing,
            "complete" => CaseStatus::Complete,
            _ => CaseStatus::Unknown(s),
        }
    }
}

impl From<CaseStatus> for String {
    fn from(status: CaseStatus) -> Self {
        status.as_str().to_string()
    }
}

impl CaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::Processing => "processing",
            CaseStatus::Complete => "complete",
            CaseStatus::Unknown(raw) => raw.as_str(),
        }
    }

    /// Position in the pending -> processing -> complete lifecycle
    fn rank(&self) -> u8 {
        match self {
            CaseStatus::Pending | CaseStatus::Unknown(_) => 0,
            CaseStatus::Processing => 1,
            CaseStatus::Complete => 2,
        }
    }

    /// Whether a later observation of the same case may report `next`
    pub fn can_advance_to(&self, next: &CaseStatus) -> bool {
        next.rank() >= self.rank()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, CaseStatus::Complete)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which evidence panel a case gets in the detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    /// Stored image plus the backend's static analysis
    Image,
    /// Knowledge graph plus generated narrative simulation
    Text,
}

/// An explicit change to a working copy of a case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasePatch {
    SuspectImage(String),
}

/// One uploaded item under analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,

    pub filename: String,

    pub status: CaseStatus,

    /// Backend-relative path to the stored original
    #[serde(default)]
    pub file_path: Option<String>,

    /// Present only for image cases
    #[serde(default)]
    pub image_analysis: Option<String>,

    #[serde(default)]
    pub suspect_image: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<NaiveDateTime>,
}

impl Case {
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn kind(&self) -> CaseKind {
        if self.image_analysis.is_some() {
            CaseKind::Image
        } else {
            CaseKind::Text
        }
    }

    pub fn is_image_case(&self) -> bool {
        self.kind() == CaseKind::Image
    }

    /// Apply a patch to this copy only
    pub fn merge(&mut self, patch: &CasePatch) {
        match patch {
            CasePatch::SuspectImage(url) => self.suspect_image = Some(url.clone()),
        }
    }
}

/// Parse a backend timestamp: RFC 3339, or naive ISO-8601 taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}
