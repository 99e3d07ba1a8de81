pub mod board;
pub mod domain;
pub mod gateway;
mod status;

pub use board::{BoardHandle, KanbanBoard, MergeReport};
pub use domain::{
    ActingUser, ApprovalState, BoardStage, DerivedStatus, ExistingEmployeeRef, Requisition,
    RequisitionDetails, TerminationRecord,
};
pub use gateway::{
    CreationResponse, EmployeeDirectory, ExistingCheck, GatewayError, RequisitionFilter,
    RequisitionGateway,
};
pub use status::derive_status;
