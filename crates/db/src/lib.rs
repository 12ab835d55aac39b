mod error;
pub mod models;
mod pool;
pub mod repositories;

pub use error::*;
pub use models::{JobStatusHistoryRow, JobStatusRow, TestCaseRow, TestControlRow};
pub use pool::*;
pub use repositories::*;
pub use sqlx::SqlitePool;
