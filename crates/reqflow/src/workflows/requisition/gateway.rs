use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{ActingUser, BoardStage, ExistingEmployeeRef, Requisition, TerminationRecord};

/// Error taxonomy for the remote HR backend. Backend-provided message text
/// travels verbatim so the operator sees what the server actually said.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected backend payload: {0}")]
    Payload(String),
}

/// Result of a bulk existence check against the employee directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExistingCheck {
    pub existing_ids: Vec<String>,
    pub existing: Vec<ExistingEmployeeRef>,
}

/// Raw outcome of a batch requisition creation call. `body` is the decoded
/// JSON payload exactly as the backend returned it; its shape is not fixed
/// and is resolved downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct CreationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub body: Value,
}

/// Optional narrowing applied when re-fetching the full requisition list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequisitionFilter {
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub stage: Option<BoardStage>,
}

/// Remote duplicate check, abstracted so the resolver and workflow can be
/// exercised against in-memory fakes.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn check_existing(&self, ids: &[String]) -> Result<ExistingCheck, GatewayError>;
}

/// Remote persistence and requisition operations. These calls are the only
/// suspension points of the import workflow.
#[async_trait]
pub trait RequisitionGateway: Send + Sync {
    async fn persist_records(&self, records: &[TerminationRecord]) -> Result<(), GatewayError>;

    /// One call per batch, not per record.
    async fn create_requisitions(
        &self,
        records: &[TerminationRecord],
        acting_user: &ActingUser,
    ) -> Result<CreationResponse, GatewayError>;

    async fn fetch_all(
        &self,
        filter: Option<&RequisitionFilter>,
    ) -> Result<Vec<Requisition>, GatewayError>;

    async fn update_stage(
        &self,
        code: &str,
        stage: BoardStage,
        actor: Option<&str>,
    ) -> Result<(), GatewayError>;
}
