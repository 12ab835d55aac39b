mod job_status_repository;
mod test_case_repository;
mod test_control_repository;

pub use job_status_repository::*;
pub use test_case_repository::*;
pub use test_control_repository::*;
