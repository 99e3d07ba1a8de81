use super::domain::{ApprovalState, BoardStage, DerivedStatus, Requisition};

/// Maps a requisition's stored flags to exactly one status.
///
/// An explicit, recognized stage label always wins over the flags. The flag
/// precedence below is load-bearing: finalized beats in-selection beats
/// in-hiring, and an approved requisition with no other flag set is Open.
/// The match is total, so every flag combination derives to something.
pub fn derive_status(requisition: &Requisition) -> DerivedStatus {
    if let Some(stage) = requisition
        .stage_label
        .as_deref()
        .and_then(BoardStage::from_label)
    {
        return stage.into();
    }

    match requisition.approval {
        ApprovalState::Pending if requisition.is_draft => DerivedStatus::Draft,
        ApprovalState::Pending => DerivedStatus::PendingApproval,
        ApprovalState::Approved if requisition.is_finalized => DerivedStatus::Finalized,
        ApprovalState::Approved if requisition.is_in_selection => DerivedStatus::InSelection,
        ApprovalState::Approved if requisition.is_in_hiring => DerivedStatus::InHiring,
        ApprovalState::Approved => DerivedStatus::Open,
        ApprovalState::Declined => DerivedStatus::Declined,
    }
}
