use serde_json::Value;
use tracing::{debug, warn};

use crate::workflows::requisition::Requisition;

/// Resolves the backend's creation payload into a flat entry list.
///
/// The creation endpoint has shipped several response shapes over time, so
/// one explicit decoder exists per known shape, tried in priority order; the
/// first decoder producing a non-empty list wins. When none match the result
/// is an empty list, which callers treat as a warning rather than a failure:
/// an empty successful batch is distinct from a transport error.
pub fn resolve_created_entries(body: &Value) -> Vec<Value> {
    let decoders: [fn(&Value) -> Option<Vec<Value>>; 5] = [
        decode_data_array,
        decode_items_field,
        decode_requisitions_field,
        decode_single_object,
        decode_top_level_array,
    ];

    for decode in decoders {
        if let Some(entries) = decode(body) {
            return entries;
        }
    }

    warn!("creation response matched no known shape; treating as empty batch");
    Vec::new()
}

fn non_empty(entries: Vec<Value>) -> Option<Vec<Value>> {
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Shape 1: `{"data": [...]}`.
fn decode_data_array(body: &Value) -> Option<Vec<Value>> {
    non_empty(body.get("data")?.as_array()?.clone())
}

/// Shape 2: `{"items": [...]}` or `{"data": {"items": [...]}}`.
fn decode_items_field(body: &Value) -> Option<Vec<Value>> {
    let items = body
        .get("items")
        .or_else(|| body.get("data").and_then(|data| data.get("items")))?;
    non_empty(items.as_array()?.clone())
}

/// Shape 3: the alternate collection name, `requisitions`.
fn decode_requisitions_field(body: &Value) -> Option<Vec<Value>> {
    let items = body
        .get("requisitions")
        .or_else(|| body.get("data").and_then(|data| data.get("requisitions")))?;
    non_empty(items.as_array()?.clone())
}

/// Shape 4: a single created object sitting directly under `data`.
fn decode_single_object(body: &Value) -> Option<Vec<Value>> {
    let data = body.get("data")?;
    let object = data.as_object()?;
    if object.is_empty() {
        return None;
    }
    Some(vec![data.clone()])
}

/// Shape 5: the whole body is the array.
fn decode_top_level_array(body: &Value) -> Option<Vec<Value>> {
    non_empty(body.as_array()?.clone())
}

/// Decodes the resolved entries into requisitions, insisting on an id or a
/// code per entry. Invalid entries are logged and dropped, never silently
/// counted as successes. Returns the survivors and the dropped count.
pub fn decode_created_batch(body: &Value) -> (Vec<Requisition>, usize) {
    let entries = resolve_created_entries(body);
    let mut requisitions = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;

    for entry in entries {
        match serde_json::from_value::<Requisition>(entry) {
            Ok(requisition) if requisition.has_identity() => requisitions.push(requisition),
            Ok(_) => {
                warn!("created entry carries neither id nor code, dropped");
                dropped += 1;
            }
            Err(error) => {
                warn!(%error, "created entry failed to decode, dropped");
                dropped += 1;
            }
        }
    }

    debug!(
        created = requisitions.len(),
        dropped, "creation response decoded"
    );
    (requisitions, dropped)
}
