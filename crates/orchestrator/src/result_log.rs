use async_trait::async_trait;
use chrono::{DateTime, Local};
use loadrig_core::{ResultRecord, RESULT_LOG_HEADER};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// Which records reach the result log.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultLogPolicy {
    /// Every record, failures included
    #[default]
    All,
    /// Only records with a non-negative value
    SuccessOnly,
}

impl ResultLogPolicy {
    pub fn accepts(&self, record: &ResultRecord) -> bool {
        match self {
            Self::All => true,
            Self::SuccessOnly => !record.is_error(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::SuccessOnly => "success_only",
        }
    }
}

impl fmt::Display for ResultLogPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultLogPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "success_only" => Ok(Self::SuccessOnly),
            other => Err(format!("unknown result log policy: {}", other)),
        }
    }
}

/// Durable, append-only destination for result records.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Returns `false` when the record was filtered out rather than written.
    async fn append(&self, record: &ResultRecord) -> Result<bool>;
}

/// `Timestamp,Result,Parameter` text file.
pub struct FileResultLog {
    path: PathBuf,
    policy: ResultLogPolicy,
    file: Mutex<File>,
}

impl FileResultLog {
    /// `<test_id>-<identity>-results_<yyyymmdd-HH>.log`
    pub fn file_name(test_id: &str, identity: &str, at: DateTime<Local>) -> String {
        format!("{}-{}-results_{}.log", test_id, identity, at.format("%Y%m%d-%H"))
    }

    /// Open `path` for appending, creating it and its directory if needed.
    /// A new or empty file gets the header line first.
    pub async fn create(path: impl AsRef<Path>, policy: ResultLogPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;
        if file.metadata().await?.len() == 0 {
            file.write_all(format!("{}\n", RESULT_LOG_HEADER).as_bytes()).await?;
            file.flush().await?;
        }

        debug!(path = %path.display(), policy = %policy, "Result log opened");

        Ok(Self {
            path,
            policy,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> ResultLogPolicy {
        self.policy
    }
}

#[async_trait]
impl ResultSink for FileResultLog {
    async fn append(&self, record: &ResultRecord) -> Result<bool> {
        if !self.policy.accepts(record) {
            return Ok(false);
        }

        let line = format!("{}\n", record.to_log_line());
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use loadrig_core::{Outcome, Phase};
    use std::time::Duration;
    use tempfile::TempDir;

    fn ok_record() -> ResultRecord {
        ResultRecord::from_outcome(Phase::Inner, "A-100", &Outcome::Success(7.0))
    }

    fn timeout_record() -> ResultRecord {
        ResultRecord::from_outcome(Phase::Inner, "A-100", &Outcome::Timeout(Duration::from_secs(2)))
    }

    #[test]
    fn test_file_name() {
        let at = Local.with_ymd_and_hms(2025, 3, 7, 9, 30, 0).unwrap();
        assert_eq!(
            FileResultLog::file_name("T-1", "10.0.0.5", at),
            "T-1-10.0.0.5-results_20250307-09.log"
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("all".parse::<ResultLogPolicy>().unwrap(), ResultLogPolicy::All);
        assert_eq!(
            "success_only".parse::<ResultLogPolicy>().unwrap(),
            ResultLogPolicy::SuccessOnly
        );
        assert!("errors".parse::<ResultLogPolicy>().is_err());
        assert_eq!(ResultLogPolicy::default(), ResultLogPolicy::All);
    }

    #[tokio::test]
    async fn test_header_and_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("results.log");

        let log = FileResultLog::create(&path, ResultLogPolicy::All).await.unwrap();
        assert!(log.append(&ok_record()).await.unwrap());
        assert!(log.append(&timeout_record()).await.unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "Timestamp,Result,Parameter");
        assert!(lines[1].ends_with(",7,A-100"));
        assert!(lines[2].contains(",-1,A-100 TIMEOUT"));
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_success_only_drops_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.log");

        let log = FileResultLog::create(&path, ResultLogPolicy::SuccessOnly).await.unwrap();
        assert!(log.append(&ok_record()).await.unwrap());
        assert!(!log.append(&timeout_record()).await.unwrap());
        assert!(!log
            .append(&ResultRecord::control_plane_error("locked"))
            .await
            .unwrap());

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_reopen_appends_without_second_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.log");

        {
            let log = FileResultLog::create(&path, ResultLogPolicy::All).await.unwrap();
            log.append(&ok_record()).await.unwrap();
        }
        let log = FileResultLog::create(&path, ResultLogPolicy::All).await.unwrap();
        log.append(&ok_record()).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Timestamp,Result,Parameter").count(), 1);
        assert_eq!(content.lines().count(), 3);
    }
}
