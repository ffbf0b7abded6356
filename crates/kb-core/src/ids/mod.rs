//! ID type wrappers for type safety.

pub mod flow_id;
pub mod subject_id;

pub use flow_id::FlowId;
pub use subject_id::SubjectId;
