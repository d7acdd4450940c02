use serde::{Deserialize, Serialize};

/// On-disk tag record, one JSON file per card UID.
///
/// Records are provisioned by the management UI; every field is optional
/// on disk and defaults to the denying value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Display name of the card holder
    #[serde(default)]
    pub user: Option<String>,

    /// Raw access class (1 standard, 99 admin, anything else denies)
    #[serde(default)]
    pub acctype: i64,

    /// Expiry as epoch seconds; access requires `now < validuntil`
    #[serde(default)]
    pub validuntil: i64,
}

/// Access class decoded from a record's raw `acctype`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    None,
    Standard,
    Admin,
    /// Any raw value outside the known set, kept for diagnostics
    Other(i64),
}

impl AccessType {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Standard,
            99 => Self::Admin,
            other => Self::Other(other),
        }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            Self::None => 0,
            Self::Standard => 1,
            Self::Admin => 99,
            Self::Other(raw) => *raw,
        }
    }

    /// Only the standard and admin classes ever grant access
    pub fn grants_access(&self) -> bool {
        matches!(self, Self::Standard | Self::Admin)
    }
}

/// Outcome of a single tag authorization lookup
#[derive(Debug, Clone, PartialEq)]
pub enum AccessResult {
    /// No record for this UID
    Unknown,

    /// Record exists but does not authorize charging right now
    Denied { username: String },

    /// Record authorizes charging
    Granted {
        username: String,
        access_type: AccessType,
        valid_until: i64,
    },
}

impl AccessResult {
    /// True when a record exists for the UID, authorized or not
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Unknown => None,
            Self::Denied { username } => Some(username),
            Self::Granted { username, .. } => Some(username),
        }
    }
}

/// One consumed scan event, shaped for the UI transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub read: bool,
    pub uid: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub known: bool,
    pub authorized: bool,
    pub username: String,
}

impl ScanResult {
    /// The no-event result: nothing read, every flag down
    pub fn not_read() -> Self {
        Self {
            read: false,
            uid: String::new(),
            card_type: String::new(),
            known: false,
            authorized: false,
            username: String::new(),
        }
    }
}

/// One row of the paged tag listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessListEntry {
    pub uid: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub acctype: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validuntil: Option<i64>,
}

/// One page of the tag listing, shaped for the UI transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPage {
    pub page: u32,
    pub list: Vec<AccessListEntry>,
    #[serde(rename = "haspages")]
    pub total_pages: u32,
    #[serde(rename = "hasmore")]
    pub has_more: bool,
}

/// Format raw UID bytes the way record files are named: lowercase hex
/// without zero padding, so `[0x04, 0xa1]` becomes `"4a1"`.
pub fn format_uid(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:x}", byte)).collect()
}

/// Resolve the name shown for a tag. Empty names and the literal
/// `"undefined"` (written by older UIs) fall back to the UID.
pub fn display_name(uid: &str, user: Option<&str>) -> String {
    match user {
        Some(name) if !name.is_empty() && name != "undefined" => name.to_string(),
        _ => uid.to_string(),
    }
}
