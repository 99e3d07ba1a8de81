mod decode;
mod dedup;
mod layout;
mod parser;
mod router;
mod workflow;

pub use decode::{decode_created_batch, resolve_created_entries};
pub use dedup::{partition_known, DuplicateCheckError, DuplicatePartition};
pub use layout::ColumnLayout;
pub use parser::{parse_termination_file, ParseError};
pub use router::import_router;
pub use workflow::{
    CancelToken, CommitDecision, CommitReceipt, ImportError, ImportPhase, ImportPreview,
    ImportWorkflow, WorkflowOutcome,
};
