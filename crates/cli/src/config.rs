use anyhow::{bail, Context, Result};
use loadrig_core::RunParameters;
use orchestrator::{ExecutorConfig, OrchestratorConfig, ResultLogPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "loadrig";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub execution: ExecutionConfig,
    pub host: HostConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:loadrig.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
            log_level: "info".to_string(),
        }
    }
}

/// Fallback run parameters and executor tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    pub default_duration_min: u32,
    pub default_num_iterations: u32,
    pub default_second_duration_min: u32,
    pub default_second_num_iterations: u32,
    pub default_wait_before_start_sec: u32,
    pub default_timeout_sec: u64,
    pub think_time_ms: u64,
    pub poll_interval_ms: u64,
    pub heartbeat_interval_sec: u64,
    pub result_log_policy: ResultLogPolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_duration_min: 60,
            default_num_iterations: 1,
            default_second_duration_min: 0,
            default_second_num_iterations: 0,
            default_wait_before_start_sec: 0,
            default_timeout_sec: 60,
            think_time_ms: 0,
            poll_interval_ms: 3000,
            heartbeat_interval_sec: 60,
            result_log_policy: ResultLogPolicy::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostConfig {
    pub base_url: String,
    pub connect_timeout_sec: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8765".to_string(),
            connect_timeout_sec: 10,
        }
    }
}

impl AppConfig {
    /// Load from `explicit` if given, otherwise from the first file found on
    /// the search path. Finding no file at all is an error.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            return Ok((Self::from_file(path)?, path.to_path_buf()));
        }

        let candidates = search_paths();
        match first_existing(&candidates) {
            Some(path) => Ok((Self::from_file(&path)?, path)),
            None => {
                let searched: Vec<String> = candidates
                    .iter()
                    .map(|p| format!("  {}", p.display()))
                    .collect();
                bail!("No config file found. Searched:\n{}", searched.join("\n"))
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub fn default_parameters(&self) -> RunParameters {
        let e = &self.execution;
        RunParameters {
            main_duration_minutes: e.default_duration_min,
            main_iterations: e.default_num_iterations,
            second_duration_minutes: e.default_second_duration_min,
            second_iterations: e.default_second_num_iterations,
            wait_before_start_seconds: e.default_wait_before_start_sec,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let e = &self.execution;
        let executor = ExecutorConfig::default()
            .with_think_time(Duration::from_millis(e.think_time_ms))
            .with_default_timeout(Duration::from_secs(e.default_timeout_sec.max(1)));

        OrchestratorConfig::default()
            .with_poll_interval(Duration::from_millis(e.poll_interval_ms.max(1)))
            .with_heartbeat_interval(Duration::from_secs(e.heartbeat_interval_sec))
            .with_default_parameters(self.default_parameters())
            .with_executor(executor)
    }
}

/// Candidate config files, most specific first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(exe_dir.join(CONFIG_FILE));
        paths.push(exe_dir.join("config").join(CONFIG_FILE));
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(CONFIG_FILE));
    }

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join(APP_DIR).join(CONFIG_FILE));
    }

    paths.push(system_config_dir().join(CONFIG_FILE));
    paths
}

#[cfg(windows)]
fn system_config_dir() -> PathBuf {
    let program_data = std::env::var_os("PROGRAMDATA").unwrap_or_else(|| "C:\\ProgramData".into());
    PathBuf::from(program_data).join(APP_DIR)
}

#[cfg(not(windows))]
fn system_config_dir() -> PathBuf {
    PathBuf::from("/etc").join(APP_DIR)
}

pub fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}
