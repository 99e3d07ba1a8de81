use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::decode::decode_created_batch;
use super::dedup::{partition_known, DuplicateCheckError};
use super::parser::{parse_termination_file, ParseError};
use crate::workflows::requisition::{
    ActingUser, BoardHandle, BoardStage, EmployeeDirectory, ExistingEmployeeRef, GatewayError,
    KanbanBoard, MergeReport, RequisitionGateway, TerminationRecord,
};

/// Advisory cancellation flag shared between the operator surface and the
/// running workflow. It cannot interrupt a remote call in flight, only stop
/// the workflow from reacting to its result. A token covers one session: a
/// fresh preview replaces a fired token instead of resetting it, so a
/// resync task that captured the old token still sees the cancellation.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// States of the staged import. `Cancelled` is reachable from every
/// non-terminal state, `Failed` from any state on an unrecovered error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    #[default]
    Idle,
    Validating,
    AwaitingDecision,
    Persisting,
    CreatingRequisitions,
    Reconciling,
    Done,
    Cancelled,
    Failed,
}

impl ImportPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Failed)
    }

    /// True while a remote write may already be irreversibly committed,
    /// which is when cancelling needs explicit operator confirmation.
    pub fn remote_write_in_flight(self) -> bool {
        matches!(self, Self::Persisting | Self::CreatingRequisitions)
    }
}

/// Operator choice after reviewing the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitDecision {
    PersistOnly,
    PersistAndCreate,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    DuplicateCheck(#[from] DuplicateCheckError),
    #[error("persisting termination records failed: {0}")]
    Persist(#[source] GatewayError),
    #[error("requisition creation failed: {0}")]
    RequisitionCreation(String),
    #[error("no reviewed batch to commit; run a preview first")]
    NothingToCommit,
    #[error("an import operation is already in progress")]
    OperationInProgress,
}

/// A suspended step resolved either into its result or into a no-op because
/// cancellation had already been requested. The latter is not an error.
#[derive(Debug)]
pub enum WorkflowOutcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> WorkflowOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

/// Validate-only result shown to the operator before anything is written.
#[derive(Debug, Clone, Serialize)]
pub struct ImportPreview {
    pub existing: Vec<ExistingEmployeeRef>,
    pub new: Vec<TerminationRecord>,
}

/// Summary of a finished commit.
#[derive(Debug, Clone, Serialize)]
pub struct CommitReceipt {
    pub decision: CommitDecision,
    pub persisted: usize,
    pub created: usize,
    pub dropped_entries: usize,
    pub merge: Option<MergeReport>,
}

#[derive(Default)]
struct Session {
    phase: ImportPhase,
    new_records: Vec<TerminationRecord>,
    existing_refs: Vec<ExistingEmployeeRef>,
    already_persisted: bool,
}

/// One cancellable import session per operator.
///
/// The acting user and the cancellation token are handed in at construction
/// instead of being read from ambient state. Remote calls are the only
/// suspension points; cancellation is checked immediately before and after
/// each of them. A write that already committed is never rolled back; the
/// workflow just stops advancing.
pub struct ImportWorkflow<D, G> {
    directory: Arc<D>,
    gateway: Arc<G>,
    board: BoardHandle,
    acting_user: ActingUser,
    cancel: Mutex<CancelToken>,
    resync_delay: Duration,
    session: Mutex<Session>,
}

impl<D, G> ImportWorkflow<D, G>
where
    D: EmployeeDirectory + 'static,
    G: RequisitionGateway + 'static,
{
    pub fn new(
        directory: Arc<D>,
        gateway: Arc<G>,
        board: BoardHandle,
        acting_user: ActingUser,
        cancel: CancelToken,
        resync_delay: Duration,
    ) -> Self {
        Self {
            directory,
            gateway,
            board,
            acting_user,
            cancel: Mutex::new(cancel),
            resync_delay,
            session: Mutex::new(Session::default()),
        }
    }

    fn cancel_token(&self) -> CancelToken {
        self.cancel.lock().expect("cancel mutex poisoned").clone()
    }

    pub fn phase(&self) -> ImportPhase {
        self.session.lock().expect("session mutex poisoned").phase
    }

    pub fn board(&self) -> BoardHandle {
        self.board.clone()
    }

    pub fn acting_user(&self) -> &ActingUser {
        &self.acting_user
    }

    /// Cancelling mid-write may leave a committed remote write behind, so
    /// the surface must ask the operator to confirm first.
    pub fn requires_cancel_confirmation(&self) -> bool {
        self.phase().remote_write_in_flight()
    }

    /// Requests cancellation. Takes effect at the next suspension-point
    /// check; an idle or reviewing session terminates immediately.
    pub fn cancel(&self) {
        self.cancel_token().cancel();
        let mut session = self.session.lock().expect("session mutex poisoned");
        if !session.phase.is_terminal() && !session.phase.remote_write_in_flight() {
            session.phase = ImportPhase::Cancelled;
        }
        info!("import cancellation requested");
    }

    /// Parses the file and partitions records against the directory without
    /// persisting anything. Errors surface immediately and keep no partial
    /// state.
    ///
    /// A preview starts a new session, so it is rejected while a commit
    /// still runs: accepting one would swap the reviewed batch out from
    /// under the write in flight. A cancelled session does not block it;
    /// the fired token is replaced and the workflow starts over.
    pub async fn preview(
        &self,
        file_text: &str,
    ) -> Result<WorkflowOutcome<ImportPreview>, ImportError> {
        {
            let mut session = self.session.lock().expect("session mutex poisoned");
            if session.phase.remote_write_in_flight() || session.phase == ImportPhase::Reconciling
            {
                return Err(ImportError::OperationInProgress);
            }
            session.phase = ImportPhase::Validating;
        }
        {
            let mut token = self.cancel.lock().expect("cancel mutex poisoned");
            if token.is_cancelled() {
                *token = CancelToken::new();
            }
        }
        let cancel = self.cancel_token();

        let records = match parse_termination_file(file_text) {
            Ok(records) => records,
            Err(error) => {
                self.fail_and_clear();
                return Err(error.into());
            }
        };

        let partition = match partition_known(self.directory.as_ref(), records).await {
            Ok(partition) => partition,
            Err(error) => {
                self.fail_and_clear();
                return Err(error.into());
            }
        };

        if cancel.is_cancelled() {
            // Late-arriving result; discard it instead of surfacing state.
            self.set_phase(ImportPhase::Cancelled);
            return Ok(WorkflowOutcome::Cancelled);
        }

        let preview = ImportPreview {
            existing: partition.existing_refs.clone(),
            new: partition.new.clone(),
        };
        {
            let mut session = self.session.lock().expect("session mutex poisoned");
            session.phase = ImportPhase::AwaitingDecision;
            session.new_records = partition.new;
            session.existing_refs = partition.existing_refs;
            session.already_persisted = false;
        }

        info!(
            existing = preview.existing.len(),
            new = preview.new.len(),
            "import preview ready"
        );
        Ok(WorkflowOutcome::Completed(preview))
    }

    /// Persists the reviewed batch and, when asked, creates one requisition
    /// per new record in a single batch call, merging the result into the
    /// board and scheduling the authoritative resync.
    ///
    /// Persistence is idempotent per session: a second commit skips the
    /// write, and the board merge drops anything already present, so a
    /// double-committed batch never duplicates entries.
    pub async fn commit(
        &self,
        decision: CommitDecision,
    ) -> Result<WorkflowOutcome<CommitReceipt>, ImportError> {
        let (records, already_persisted) = {
            let mut session = self.session.lock().expect("session mutex poisoned");
            match session.phase {
                ImportPhase::AwaitingDecision | ImportPhase::Done => {}
                phase if phase.remote_write_in_flight() || phase == ImportPhase::Reconciling => {
                    return Err(ImportError::OperationInProgress);
                }
                _ => return Err(ImportError::NothingToCommit),
            }
            session.phase = ImportPhase::Persisting;
            (session.new_records.clone(), session.already_persisted)
        };
        let cancel = self.cancel_token();

        // Cancellation window immediately before the remote write starts.
        if cancel.is_cancelled() {
            self.set_phase(ImportPhase::Cancelled);
            return Ok(WorkflowOutcome::Cancelled);
        }

        let mut persisted = 0usize;
        if already_persisted {
            debug!("records already persisted in this session; skipping write");
        } else {
            if let Err(error) = self.gateway.persist_records(&records).await {
                self.set_phase(ImportPhase::Failed);
                return Err(ImportError::Persist(error));
            }
            persisted = records.len();
            // The write is committed even if cancellation lands right after.
            self.session
                .lock()
                .expect("session mutex poisoned")
                .already_persisted = true;
        }

        // Cancellation window immediately after the write completed, before
        // any state advances. The committed write stays committed.
        if cancel.is_cancelled() {
            self.set_phase(ImportPhase::Cancelled);
            return Ok(WorkflowOutcome::Cancelled);
        }

        if decision == CommitDecision::PersistOnly {
            self.set_phase(ImportPhase::Done);
            info!(persisted, "persist-only commit finished");
            return Ok(WorkflowOutcome::Completed(CommitReceipt {
                decision,
                persisted,
                created: 0,
                dropped_entries: 0,
                merge: None,
            }));
        }

        self.set_phase(ImportPhase::CreatingRequisitions);
        let response = match self
            .gateway
            .create_requisitions(&records, &self.acting_user)
            .await
        {
            Ok(response) => response,
            Err(error) => {
                self.set_phase(ImportPhase::Failed);
                return Err(ImportError::RequisitionCreation(error.to_string()));
            }
        };
        if !response.success {
            self.set_phase(ImportPhase::Failed);
            let message = response
                .message
                .unwrap_or_else(|| "backend reported failure without a message".to_string());
            return Err(ImportError::RequisitionCreation(message));
        }

        // Cancellation at any point after creation began skips the merge
        // and the resync both.
        if cancel.is_cancelled() {
            self.set_phase(ImportPhase::Cancelled);
            return Ok(WorkflowOutcome::Cancelled);
        }

        let (created, dropped_entries) = decode_created_batch(&response.body);
        if created.is_empty() {
            warn!("creation succeeded but the response decoded to zero requisitions");
        }

        self.set_phase(ImportPhase::Reconciling);
        let merge = self.board.merge_batch(&created);
        self.schedule_resync();

        self.set_phase(ImportPhase::Done);
        info!(persisted, created = created.len(), "import committed");
        Ok(WorkflowOutcome::Completed(CommitReceipt {
            decision,
            persisted,
            created: created.len(),
            dropped_entries,
            merge: Some(merge),
        }))
    }

    /// Pushes a stage change to the backend and reflects it on the board.
    pub async fn move_requisition(
        &self,
        code: &str,
        stage: BoardStage,
        actor: Option<&str>,
    ) -> Result<bool, GatewayError> {
        self.gateway.update_stage(code, stage, actor).await?;
        Ok(self.board.move_card(code, stage))
    }

    /// Schedules exactly one authoritative full re-fetch that replaces the
    /// optimistic board wholesale. The cancellation flag captured here is
    /// re-checked when the delay elapses.
    fn schedule_resync(&self) {
        let gateway = Arc::clone(&self.gateway);
        let board = self.board.clone();
        let cancel = self.cancel_token();
        let delay = self.resync_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if cancel.is_cancelled() {
                debug!("authoritative resync skipped after cancellation");
                return;
            }
            match gateway.fetch_all(None).await {
                Ok(requisitions) => {
                    board.replace(KanbanBoard::from_requisitions(requisitions));
                    debug!("authoritative resync applied");
                }
                Err(error) => {
                    warn!(%error, "authoritative resync failed; optimistic board kept");
                }
            }
        });
    }

    fn set_phase(&self, phase: ImportPhase) {
        self.session.lock().expect("session mutex poisoned").phase = phase;
    }

    fn fail_and_clear(&self) {
        let mut session = self.session.lock().expect("session mutex poisoned");
        session.phase = ImportPhase::Failed;
        session.new_records.clear();
        session.existing_refs.clear();
        session.already_persisted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_without_preview_is_rejected() {
        use crate::workflows::requisition::{CreationResponse, ExistingCheck, Requisition};
        use async_trait::async_trait;

        struct NoDirectory;
        #[async_trait]
        impl EmployeeDirectory for NoDirectory {
            async fn check_existing(&self, _: &[String]) -> Result<ExistingCheck, GatewayError> {
                Ok(ExistingCheck::default())
            }
        }

        struct NoGateway;
        #[async_trait]
        impl RequisitionGateway for NoGateway {
            async fn persist_records(&self, _: &[TerminationRecord]) -> Result<(), GatewayError> {
                panic!("persist must not be called without a reviewed session");
            }
            async fn create_requisitions(
                &self,
                _: &[TerminationRecord],
                _: &ActingUser,
            ) -> Result<CreationResponse, GatewayError> {
                panic!("create must not be called without a reviewed session");
            }
            async fn fetch_all(
                &self,
                _: Option<&crate::workflows::requisition::RequisitionFilter>,
            ) -> Result<Vec<Requisition>, GatewayError> {
                Ok(Vec::new())
            }
            async fn update_stage(
                &self,
                _: &str,
                _: BoardStage,
                _: Option<&str>,
            ) -> Result<(), GatewayError> {
                Ok(())
            }
        }

        let workflow = ImportWorkflow::new(
            Arc::new(NoDirectory),
            Arc::new(NoGateway),
            BoardHandle::new(),
            ActingUser {
                name: "op".to_string(),
                registration: None,
            },
            CancelToken::new(),
            Duration::from_secs(60),
        );

        let error = workflow
            .commit(CommitDecision::PersistOnly)
            .await
            .expect_err("commit needs a preview first");
        assert!(matches!(error, ImportError::NothingToCommit));
        assert_eq!(workflow.phase(), ImportPhase::Idle);
    }

    #[test]
    fn cancel_before_any_work_terminates_the_session() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn remote_write_phases_need_confirmation() {
        assert!(ImportPhase::Persisting.remote_write_in_flight());
        assert!(ImportPhase::CreatingRequisitions.remote_write_in_flight());
        assert!(!ImportPhase::AwaitingDecision.remote_write_in_flight());
        assert!(ImportPhase::Cancelled.is_terminal());
    }
}
