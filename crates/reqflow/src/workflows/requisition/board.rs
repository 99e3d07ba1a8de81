use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::domain::{BoardStage, Requisition};
use super::status::derive_status;

/// Stage-partitioned view of the requisitions, newest first within each
/// column. All five stages are always present as keys, empty or not, and a
/// requisition appears in at most one column at a time.
#[derive(Debug, Clone, Serialize)]
pub struct KanbanBoard {
    columns: BTreeMap<BoardStage, Vec<Requisition>>,
}

/// What a batch merge did, for logging and operator feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub merged: usize,
    pub duplicates_dropped: usize,
    pub unidentified_dropped: usize,
}

impl Default for KanbanBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl KanbanBoard {
    pub fn new() -> Self {
        let mut columns = BTreeMap::new();
        for stage in BoardStage::ordered() {
            columns.insert(stage, Vec::new());
        }
        Self { columns }
    }

    /// Rebuilds a board from an authoritative full fetch, bucketing each
    /// requisition by its derived status.
    pub fn from_requisitions<I>(requisitions: I) -> Self
    where
        I: IntoIterator<Item = Requisition>,
    {
        let mut board = Self::new();
        for requisition in requisitions {
            let stage = derive_status(&requisition).board_stage();
            board.columns.entry(stage).or_default().push(requisition);
        }
        board
    }

    pub fn column(&self, stage: BoardStage) -> &[Requisition] {
        self.columns.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Board-wide lookup: a requisition is a duplicate if *any* column holds
    /// an entry matching it by id or by code, not just the target column.
    pub fn locate(&self, requisition: &Requisition) -> Option<BoardStage> {
        for (stage, items) in &self.columns {
            if items.iter().any(|entry| entry.same_identity(requisition)) {
                return Some(*stage);
            }
        }
        None
    }

    pub fn stage_counts(&self) -> Vec<(BoardStage, usize)> {
        BoardStage::ordered()
            .into_iter()
            .map(|stage| (stage, self.column(stage).len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    /// Folds a batch of newly created requisitions into a copy of this board.
    ///
    /// The whole merge is computed against this one snapshot; callers swap
    /// the returned board in atomically so readers never observe a partial
    /// merge. Non-duplicates are prepended to their resolved column with the
    /// batch's relative order preserved.
    pub fn merge_batch(&self, batch: &[Requisition]) -> (Self, MergeReport) {
        let mut next = self.clone();
        for stage in BoardStage::ordered() {
            next.columns.entry(stage).or_default();
        }

        let mut report = MergeReport::default();
        let mut fresh: BTreeMap<BoardStage, Vec<Requisition>> = BTreeMap::new();

        for incoming in batch {
            if !incoming.has_identity() {
                warn!("dropping board entry without id or code");
                report.unidentified_dropped += 1;
                continue;
            }

            let already_in_batch = fresh
                .values()
                .flatten()
                .any(|queued| queued.same_identity(incoming));
            if already_in_batch {
                debug!(key = incoming.display_key(), "duplicate within batch, dropped");
                report.duplicates_dropped += 1;
                continue;
            }

            if let Some(stage) = next.locate(incoming) {
                debug!(
                    key = incoming.display_key(),
                    stage = stage.label(),
                    "requisition already on the board, dropped"
                );
                report.duplicates_dropped += 1;
                continue;
            }

            let stage = derive_status(incoming).board_stage();
            fresh.entry(stage).or_default().push(incoming.clone());
            report.merged += 1;
        }

        for (stage, mut items) in fresh {
            let column = next.columns.entry(stage).or_default();
            items.append(column);
            *column = items;
        }

        (next, report)
    }

    /// Moves a card to another column, removing it from wherever it
    /// currently sits. Returns false when no card carries the code.
    pub fn move_card(&mut self, code: &str, target: BoardStage) -> bool {
        let mut moved: Option<Requisition> = None;
        for items in self.columns.values_mut() {
            if let Some(position) = items
                .iter()
                .position(|entry| entry.code.as_deref() == Some(code))
            {
                moved = Some(items.remove(position));
                break;
            }
        }

        match moved {
            Some(mut requisition) => {
                requisition.stage_label = Some(target.label().to_string());
                self.columns.entry(target).or_default().insert(0, requisition);
                true
            }
            None => false,
        }
    }
}

/// Shared handle over the in-memory board. Merges and resyncs are single
/// atomic state replacements under the lock.
#[derive(Clone, Default)]
pub struct BoardHandle {
    inner: Arc<Mutex<KanbanBoard>>,
}

impl BoardHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> KanbanBoard {
        self.inner.lock().expect("board mutex poisoned").clone()
    }

    pub fn merge_batch(&self, batch: &[Requisition]) -> MergeReport {
        let mut guard = self.inner.lock().expect("board mutex poisoned");
        let (next, report) = guard.merge_batch(batch);
        *guard = next;
        report
    }

    /// Wholesale replacement used by the authoritative resync.
    pub fn replace(&self, board: KanbanBoard) {
        *self.inner.lock().expect("board mutex poisoned") = board;
    }

    pub fn move_card(&self, code: &str, target: BoardStage) -> bool {
        self.inner
            .lock()
            .expect("board mutex poisoned")
            .move_card(code, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::requisition::domain::ApprovalState;

    fn created(code: &str) -> Requisition {
        Requisition {
            code: Some(code.to_string()),
            approval: ApprovalState::Approved,
            ..Requisition::default()
        }
    }

    #[test]
    fn new_board_always_carries_all_five_columns() {
        let board = KanbanBoard::new();
        assert_eq!(board.stage_counts().len(), 5);
        assert_eq!(board.total(), 0);
    }

    #[test]
    fn merge_prepends_and_preserves_batch_order() {
        let board = KanbanBoard::new();
        let (board, _) = board.merge_batch(&[created("REQ-1")]);
        let (board, report) = board.merge_batch(&[created("REQ-2"), created("REQ-3")]);

        assert_eq!(report.merged, 2);
        let open: Vec<_> = board
            .column(BoardStage::Open)
            .iter()
            .map(|r| r.code.clone().expect("code"))
            .collect();
        assert_eq!(open, vec!["REQ-2", "REQ-3", "REQ-1"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let batch = vec![created("REQ-1"), created("REQ-2")];
        let board = KanbanBoard::new();
        let (once, _) = board.merge_batch(&batch);
        let (twice, report) = once.merge_batch(&batch);

        assert_eq!(report.merged, 0);
        assert_eq!(report.duplicates_dropped, 2);
        assert_eq!(twice.total(), 2);
        assert_eq!(twice.column(BoardStage::Open).len(), 2);
    }

    #[test]
    fn duplicate_in_another_column_is_dropped() {
        let mut frozen = created("REQ-9");
        frozen.stage_label = Some("Frozen".to_string());
        let board = KanbanBoard::new();
        let (board, _) = board.merge_batch(&[frozen]);

        // Same code arrives again, this time deriving to Open.
        let (board, report) = board.merge_batch(&[created("REQ-9")]);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(board.column(BoardStage::Frozen).len(), 1);
        assert!(board.column(BoardStage::Open).is_empty());
    }

    #[test]
    fn duplicate_within_one_batch_is_inserted_once() {
        let board = KanbanBoard::new();
        let (board, report) = board.merge_batch(&[created("REQ-1"), created("REQ-1")]);
        assert_eq!(report.merged, 1);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(board.total(), 1);
    }

    #[test]
    fn entries_without_identity_never_reach_the_board() {
        let board = KanbanBoard::new();
        let (board, report) = board.merge_batch(&[Requisition::default()]);
        assert_eq!(report.unidentified_dropped, 1);
        assert_eq!(board.total(), 0);
    }

    #[test]
    fn move_card_relocates_between_columns() {
        let handle = BoardHandle::new();
        handle.merge_batch(&[created("REQ-1")]);

        assert!(handle.move_card("REQ-1", BoardStage::InSelection));
        let snapshot = handle.snapshot();
        assert!(snapshot.column(BoardStage::Open).is_empty());
        assert_eq!(snapshot.column(BoardStage::InSelection).len(), 1);

        assert!(!handle.move_card("REQ-404", BoardStage::Frozen));
    }
}
