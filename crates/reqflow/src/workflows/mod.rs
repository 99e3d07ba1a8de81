pub mod import;
pub mod requisition;
