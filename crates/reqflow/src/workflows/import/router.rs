use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::workflow::{
    CommitDecision, CommitReceipt, ImportError, ImportPhase, ImportWorkflow, WorkflowOutcome,
};
use crate::workflows::requisition::{
    BoardStage, EmployeeDirectory, ExistingEmployeeRef, KanbanBoard, Requisition,
    RequisitionGateway, TerminationRecord,
};

const PREVIEW_SAMPLE_SIZE: usize = 5;

/// Router builder exposing the import workflow and the board to the portal.
pub fn import_router<D, G>(workflow: Arc<ImportWorkflow<D, G>>) -> Router
where
    D: EmployeeDirectory + 'static,
    G: RequisitionGateway + 'static,
{
    Router::new()
        .route("/api/v1/import/preview", post(preview_handler::<D, G>))
        .route("/api/v1/import/commit", post(commit_handler::<D, G>))
        .route("/api/v1/import/cancel", post(cancel_handler::<D, G>))
        .route("/api/v1/board", get(board_handler::<D, G>))
        .route(
            "/api/v1/requisitions/:code/stage",
            post(move_stage_handler::<D, G>),
        )
        .with_state(workflow)
}

#[derive(Debug, Deserialize)]
pub(crate) struct PreviewRequest {
    pub(crate) file_text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub(crate) phase: ImportPhase,
    pub(crate) existing_count: usize,
    pub(crate) new_count: usize,
    pub(crate) existing_sample: Vec<ExistingEmployeeRef>,
    pub(crate) new_sample: Vec<TerminationRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitRequest {
    pub(crate) decision: CommitDecision,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommitResponse {
    pub(crate) phase: ImportPhase,
    pub(crate) receipt: Option<CommitReceipt>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CancelRequest {
    #[serde(default)]
    pub(crate) confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MoveStageRequest {
    pub(crate) stage: BoardStage,
    #[serde(default)]
    pub(crate) actor: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BoardColumnView {
    pub(crate) stage: BoardStage,
    pub(crate) label: &'static str,
    pub(crate) count: usize,
    pub(crate) items: Vec<Requisition>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BoardResponse {
    pub(crate) total: usize,
    pub(crate) columns: Vec<BoardColumnView>,
}

impl BoardResponse {
    pub(crate) fn from_board(board: &KanbanBoard) -> Self {
        let columns = BoardStage::ordered()
            .into_iter()
            .map(|stage| BoardColumnView {
                stage,
                label: stage.label(),
                count: board.column(stage).len(),
                items: board.column(stage).to_vec(),
            })
            .collect();
        Self {
            total: board.total(),
            columns,
        }
    }
}

fn import_error_response(error: ImportError) -> Response {
    let status = match &error {
        ImportError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ImportError::DuplicateCheck(_) => StatusCode::BAD_GATEWAY,
        ImportError::Persist(_) | ImportError::RequisitionCreation(_) => StatusCode::BAD_GATEWAY,
        ImportError::NothingToCommit | ImportError::OperationInProgress => StatusCode::CONFLICT,
    };

    // After a persistence or creation failure a remote write may already be
    // committed; the operator has to be told.
    let payload = match &error {
        ImportError::Persist(_) | ImportError::RequisitionCreation(_) => json!({
            "error": error.to_string(),
            "note": "remote state may already be partially committed",
        }),
        _ => json!({ "error": error.to_string() }),
    };

    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn preview_handler<D, G>(
    State(workflow): State<Arc<ImportWorkflow<D, G>>>,
    axum::Json(request): axum::Json<PreviewRequest>,
) -> Response
where
    D: EmployeeDirectory + 'static,
    G: RequisitionGateway + 'static,
{
    match workflow.preview(&request.file_text).await {
        Ok(WorkflowOutcome::Completed(preview)) => {
            let response = PreviewResponse {
                phase: workflow.phase(),
                existing_count: preview.existing.len(),
                new_count: preview.new.len(),
                existing_sample: preview
                    .existing
                    .into_iter()
                    .take(PREVIEW_SAMPLE_SIZE)
                    .collect(),
                new_sample: preview.new.into_iter().take(PREVIEW_SAMPLE_SIZE).collect(),
            };
            (StatusCode::OK, axum::Json(response)).into_response()
        }
        Ok(WorkflowOutcome::Cancelled) => cancelled_response(),
        Err(error) => import_error_response(error),
    }
}

pub(crate) async fn commit_handler<D, G>(
    State(workflow): State<Arc<ImportWorkflow<D, G>>>,
    axum::Json(request): axum::Json<CommitRequest>,
) -> Response
where
    D: EmployeeDirectory + 'static,
    G: RequisitionGateway + 'static,
{
    match workflow.commit(request.decision).await {
        Ok(WorkflowOutcome::Completed(receipt)) => {
            let response = CommitResponse {
                phase: workflow.phase(),
                receipt: Some(receipt),
            };
            (StatusCode::OK, axum::Json(response)).into_response()
        }
        Ok(WorkflowOutcome::Cancelled) => cancelled_response(),
        Err(error) => import_error_response(error),
    }
}

pub(crate) async fn cancel_handler<D, G>(
    State(workflow): State<Arc<ImportWorkflow<D, G>>>,
    axum::Json(request): axum::Json<CancelRequest>,
) -> Response
where
    D: EmployeeDirectory + 'static,
    G: RequisitionGateway + 'static,
{
    if workflow.requires_cancel_confirmation() && !request.confirmed {
        let payload = json!({
            "error": "a remote write is in progress and may already be committed; \
                      repeat the request with confirmed=true to cancel anyway",
            "phase": workflow.phase(),
        });
        return (StatusCode::CONFLICT, axum::Json(payload)).into_response();
    }

    workflow.cancel();
    let payload = json!({ "phase": workflow.phase() });
    (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
}

pub(crate) async fn board_handler<D, G>(
    State(workflow): State<Arc<ImportWorkflow<D, G>>>,
) -> Response
where
    D: EmployeeDirectory + 'static,
    G: RequisitionGateway + 'static,
{
    let snapshot = workflow.board().snapshot();
    (
        StatusCode::OK,
        axum::Json(BoardResponse::from_board(&snapshot)),
    )
        .into_response()
}

pub(crate) async fn move_stage_handler<D, G>(
    State(workflow): State<Arc<ImportWorkflow<D, G>>>,
    Path(code): Path<String>,
    axum::Json(request): axum::Json<MoveStageRequest>,
) -> Response
where
    D: EmployeeDirectory + 'static,
    G: RequisitionGateway + 'static,
{
    match workflow
        .move_requisition(&code, request.stage, request.actor.as_deref())
        .await
    {
        Ok(true) => {
            let payload = json!({ "code": code, "stage": request.stage });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(false) => {
            let payload = json!({ "error": format!("no board card carries code {code}") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
    }
}

fn cancelled_response() -> Response {
    let payload = json!({ "phase": ImportPhase::Cancelled, "cancelled": true });
    (StatusCode::OK, axum::Json(payload)).into_response()
}
