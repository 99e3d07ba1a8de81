use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;

use reqflow::workflows::requisition::{
    derive_status, ActingUser, ApprovalState, BoardStage, CreationResponse, EmployeeDirectory,
    ExistingCheck, ExistingEmployeeRef, GatewayError, Requisition, RequisitionDetails,
    RequisitionFilter, RequisitionGateway, TerminationRecord,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Directory fake backed by a map of already-imported employees. Stands in
/// for the remote duplicate-check endpoint during demos and tests.
#[derive(Default, Clone)]
pub(crate) struct InMemoryEmployeeDirectory {
    known: Arc<Mutex<HashMap<String, ExistingEmployeeRef>>>,
}

impl InMemoryEmployeeDirectory {
    pub(crate) fn seed(&self, external_id: &str, full_name: &str, first_included_on: NaiveDate) {
        let mut guard = self.known.lock().expect("directory mutex poisoned");
        guard.insert(
            external_id.to_string(),
            ExistingEmployeeRef {
                external_id: external_id.to_string(),
                full_name: full_name.to_string(),
                first_included_on: Some(first_included_on),
            },
        );
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn check_existing(&self, ids: &[String]) -> Result<ExistingCheck, GatewayError> {
        let guard = self.known.lock().expect("directory mutex poisoned");
        let mut check = ExistingCheck::default();
        for id in ids {
            if let Some(existing) = guard.get(id) {
                check.existing_ids.push(id.clone());
                check.existing.push(existing.clone());
            }
        }
        Ok(check)
    }
}

/// Requisition backend fake: persists records in memory and mints
/// sequential requisition codes for created batches.
#[derive(Default)]
pub(crate) struct InMemoryRequisitionGateway {
    sequence: AtomicU64,
    persisted: Arc<Mutex<Vec<TerminationRecord>>>,
    created: Arc<Mutex<Vec<Requisition>>>,
}

impl InMemoryRequisitionGateway {
    pub(crate) fn persisted_count(&self) -> usize {
        self.persisted.lock().expect("persisted mutex poisoned").len()
    }

    fn next_code(&self) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("REQ-{id:04}")
    }
}

#[async_trait]
impl RequisitionGateway for InMemoryRequisitionGateway {
    async fn persist_records(&self, records: &[TerminationRecord]) -> Result<(), GatewayError> {
        let mut guard = self.persisted.lock().expect("persisted mutex poisoned");
        guard.extend(records.iter().cloned());
        Ok(())
    }

    async fn create_requisitions(
        &self,
        records: &[TerminationRecord],
        acting_user: &ActingUser,
    ) -> Result<CreationResponse, GatewayError> {
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            created.push(Requisition {
                code: Some(self.next_code()),
                requester: Some(acting_user.name.clone()),
                approval: ApprovalState::Approved,
                opened_at: Some(Utc::now()),
                details: Some(RequisitionDetails {
                    position_title: Some(record.job_title.clone()),
                    department: Some(record.cost_center.clone()),
                    contracting_type: record.passthrough.get("contract_type").cloned(),
                    reason: Some(format!("replacement for {}", record.full_name)),
                }),
                ..Requisition::default()
            });
        }

        let items = serde_json::to_value(&created)
            .map_err(|err| GatewayError::Payload(err.to_string()))?;
        self.created
            .lock()
            .expect("created mutex poisoned")
            .extend(created);

        Ok(CreationResponse {
            success: true,
            message: None,
            body: json!({ "data": { "items": items } }),
        })
    }

    async fn fetch_all(
        &self,
        filter: Option<&RequisitionFilter>,
    ) -> Result<Vec<Requisition>, GatewayError> {
        let guard = self.created.lock().expect("created mutex poisoned");
        let mut requisitions: Vec<Requisition> = guard.clone();
        if let Some(filter) = filter {
            if let Some(requester) = &filter.requester {
                requisitions.retain(|req| req.requester.as_deref() == Some(requester));
            }
            if let Some(stage) = filter.stage {
                requisitions.retain(|req| derive_status(req).board_stage() == stage);
            }
        }
        Ok(requisitions)
    }

    async fn update_stage(
        &self,
        code: &str,
        stage: BoardStage,
        _actor: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut guard = self.created.lock().expect("created mutex poisoned");
        match guard
            .iter_mut()
            .find(|req| req.code.as_deref() == Some(code))
        {
            Some(req) => {
                req.stage_label = Some(stage.label().to_string());
                Ok(())
            }
            None => Err(GatewayError::Rejected(format!(
                "unknown requisition code {code}"
            ))),
        }
    }
}
