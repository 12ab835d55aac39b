mod phase;
mod procedure;
mod result;
mod run;

pub use phase::Phase;
pub use procedure::{CatalogEntry, ProcedureDescriptor, ProcedureKey};
pub use result::{
    Outcome, RecordTag, ResultRecord, ERROR_SENTINEL, RESULT_LOG_HEADER, RESULT_TIMESTAMP_FORMAT,
};
pub use run::{JobStatus, RunParameters, RunStage};
