use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One row extracted from an uploaded termination file.
///
/// Records are immutable once parsed; later stages only classify them
/// (already known vs. new) and, when new, hand them to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationRecord {
    pub external_id: String,
    pub full_name: String,
    pub job_title: String,
    pub cost_center: String,
    pub termination_date: String,
    pub hierarchy_id: String,
    /// Remaining columns carried through unchanged, keyed by layout field name.
    #[serde(default)]
    pub passthrough: BTreeMap<String, String>,
}

impl TerminationRecord {
    /// A record without an external id or a full name never leaves the parser.
    pub fn is_identifiable(&self) -> bool {
        !self.external_id.is_empty() && !self.full_name.is_empty()
    }
}

/// Lightweight projection returned by the employee directory for records it
/// already knows about. Display-only; never merged into the workflow output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingEmployeeRef {
    pub external_id: String,
    pub full_name: String,
    #[serde(default)]
    pub first_included_on: Option<NaiveDate>,
}

/// Identity of the operator driving an import session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub name: String,
    #[serde(default)]
    pub registration: Option<String>,
}

/// Approval as stored by the backend. The wire value is loosely typed: a
/// bool, or the literal string "declined" for rejected requisitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    #[default]
    Pending,
    Approved,
    Declined,
}

impl<'de> Deserialize<'de> for ApprovalState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::Bool(true)) => ApprovalState::Approved,
            Some(serde_json::Value::Bool(false)) => ApprovalState::Pending,
            Some(serde_json::Value::String(text)) => {
                match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "approved" => ApprovalState::Approved,
                    "declined" => ApprovalState::Declined,
                    _ => ApprovalState::Pending,
                }
            }
            _ => ApprovalState::Pending,
        })
    }
}

/// The five fixed kanban columns. Declaration order is display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BoardStage {
    Open,
    InSelection,
    Finalized,
    Frozen,
    Cancelled,
}

impl BoardStage {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Open,
            Self::InSelection,
            Self::Finalized,
            Self::Frozen,
            Self::Cancelled,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InSelection => "In Selection",
            Self::Finalized => "Finalized",
            Self::Frozen => "Frozen",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Parses an explicit stage label from the backend. Anything outside the
    /// five known labels yields `None` and the flags decide instead.
    pub fn from_label(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "open" => Some(Self::Open),
            "in selection" => Some(Self::InSelection),
            "finalized" => Some(Self::Finalized),
            "frozen" => Some(Self::Frozen),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Every status a requisition can derive to, including the legacy and
/// transitional labels that exist only before a requisition reaches a
/// kanban column of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedStatus {
    Open,
    InSelection,
    InHiring,
    Finalized,
    Frozen,
    Cancelled,
    Draft,
    PendingApproval,
    Declined,
}

impl DerivedStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InSelection => "In Selection",
            Self::InHiring => "In Hiring",
            Self::Finalized => "Finalized",
            Self::Frozen => "Frozen",
            Self::Cancelled => "Cancelled",
            Self::Draft => "Draft",
            Self::PendingApproval => "Pending Approval",
            Self::Declined => "Declined",
        }
    }

    /// Folds legacy and transitional statuses onto the five display columns:
    /// drafts and pending approvals surface under Open, hiring is a variant
    /// of selection, and declined requisitions land with the cancelled ones.
    pub const fn board_stage(self) -> BoardStage {
        match self {
            Self::Open | Self::Draft | Self::PendingApproval => BoardStage::Open,
            Self::InSelection | Self::InHiring => BoardStage::InSelection,
            Self::Finalized => BoardStage::Finalized,
            Self::Frozen => BoardStage::Frozen,
            Self::Cancelled | Self::Declined => BoardStage::Cancelled,
        }
    }
}

impl From<BoardStage> for DerivedStatus {
    fn from(stage: BoardStage) -> Self {
        match stage {
            BoardStage::Open => Self::Open,
            BoardStage::InSelection => Self::InSelection,
            BoardStage::Finalized => Self::Finalized,
            BoardStage::Frozen => Self::Frozen,
            BoardStage::Cancelled => Self::Cancelled,
        }
    }
}

/// Nested descriptive block of a requisition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionDetails {
    #[serde(default)]
    pub position_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub contracting_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A job requisition as the backend reports it. The lifecycle flags are
/// mutually exclusive in practice but nothing enforces that on the wire,
/// which is why status derivation must stay total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requisition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub approval: ApprovalState,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_finalized: bool,
    #[serde(default)]
    pub is_in_selection: bool,
    #[serde(default)]
    pub is_in_hiring: bool,
    /// Explicit workflow stage; authoritative when present and valid.
    #[serde(default)]
    pub stage_label: Option<String>,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: Option<RequisitionDetails>,
}

impl Requisition {
    /// A creation-response entry must carry at least an id or a code to be
    /// counted as a created requisition.
    pub fn has_identity(&self) -> bool {
        self.id.as_deref().is_some_and(|v| !v.is_empty())
            || self.code.as_deref().is_some_and(|v| !v.is_empty())
    }

    /// Two requisitions refer to the same entity when either identifier
    /// matches. Used for board-wide duplicate detection.
    pub fn same_identity(&self, other: &Requisition) -> bool {
        let id_match = match (self.id.as_deref(), other.id.as_deref()) {
            (Some(a), Some(b)) => !a.is_empty() && a == b,
            _ => false,
        };
        let code_match = match (self.code.as_deref(), other.code.as_deref()) {
            (Some(a), Some(b)) => !a.is_empty() && a == b,
            _ => false,
        };
        id_match || code_match
    }

    pub fn display_key(&self) -> &str {
        self.code
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(self.id.as_deref())
            .unwrap_or("<unidentified>")
    }
}
