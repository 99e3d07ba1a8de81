use std::collections::HashSet;

use serde::Serialize;

use crate::workflows::requisition::{
    EmployeeDirectory, ExistingEmployeeRef, GatewayError, TerminationRecord,
};

/// Remote existence check failed; the caller decides whether the whole
/// workflow aborts. Never retried automatically.
#[derive(Debug, thiserror::Error)]
#[error("duplicate check against the employee directory failed: {0}")]
pub struct DuplicateCheckError(#[from] pub GatewayError);

/// Outcome of splitting parsed records into already-known and new ones.
/// Both partitions keep the original file order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicatePartition {
    pub existing: Vec<TerminationRecord>,
    pub existing_refs: Vec<ExistingEmployeeRef>,
    pub new: Vec<TerminationRecord>,
}

/// Asks the directory which external ids are already persisted and
/// partitions the batch accordingly.
pub async fn partition_known<D>(
    directory: &D,
    records: Vec<TerminationRecord>,
) -> Result<DuplicatePartition, DuplicateCheckError>
where
    D: EmployeeDirectory + ?Sized,
{
    let ids: Vec<String> = records
        .iter()
        .map(|record| record.external_id.clone())
        .collect();
    let check = directory.check_existing(&ids).await?;
    let known: HashSet<&str> = check.existing_ids.iter().map(String::as_str).collect();

    let mut partition = DuplicatePartition {
        existing_refs: check.existing,
        ..DuplicatePartition::default()
    };
    for record in records {
        if known.contains(record.external_id.as_str()) {
            partition.existing.push(record);
        } else {
            partition.new.push(record);
        }
    }

    Ok(partition)
}
