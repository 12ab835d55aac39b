use anyhow::{bail, Result};
use clap::Args;
use std::net::{IpAddr, UdpSocket};

/// Identity used when no address can be determined.
pub const UNKNOWN_IDENTITY: &str = "UNKNOWN";

#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// Test to run, as keyed in the control plane
    #[arg(long, global = true, env = "LOADRIG_TEST_ID")]
    pub test_id: Option<String>,

    /// Role selecting this agent's procedures
    #[arg(long, global = true, env = "LOADRIG_USER_ROLE")]
    pub role: Option<String>,

    /// Workload artifact to open on the host
    #[arg(long, global = true, env = "LOADRIG_PROGRAM")]
    pub program: Option<String>,

    /// Name reported to the control plane; defaults to this machine's address
    #[arg(long, global = true, env = "LOADRIG_IDENTITY")]
    pub identity: Option<String>,
}

/// Validated inputs of one agent process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInputs {
    pub test_id: String,
    pub role: String,
    pub program: String,
    pub identity: String,
}

impl ProcessInputs {
    pub fn from_args(args: &InputArgs) -> Result<Self> {
        let test_id = required(args.test_id.as_deref(), "--test-id", "LOADRIG_TEST_ID")?;
        let role = required(args.role.as_deref(), "--role", "LOADRIG_USER_ROLE")?;
        let program = strip_quotes(&required(args.program.as_deref(), "--program", "LOADRIG_PROGRAM")?);
        if program.is_empty() {
            bail!("Missing required input: --program / LOADRIG_PROGRAM");
        }

        let identity = match args.identity.as_deref().map(str::trim) {
            Some(identity) if !identity.is_empty() => identity.to_string(),
            _ => detect_identity(),
        };

        Ok(Self {
            test_id,
            role,
            program,
            identity,
        })
    }
}

/// The test id alone, for subcommands that need nothing else.
pub fn require_test_id(args: &InputArgs) -> Result<String> {
    required(args.test_id.as_deref(), "--test-id", "LOADRIG_TEST_ID")
}

fn required(value: Option<&str>, flag: &str, env: &str) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => bail!("Missing required input: {} / {}", flag, env),
    }
}

/// Launchers often pass paths wrapped in double quotes.
fn strip_quotes(value: &str) -> String {
    value.trim().trim_matches('"').trim().to_string()
}

/// Primary outbound IPv4 address, or `UNKNOWN`.
pub fn detect_identity() -> String {
    local_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

// connecting a UDP socket picks a route without sending anything
fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> InputArgs {
        InputArgs {
            test_id: Some("T-100".to_string()),
            role: Some("T1".to_string()),
            program: Some("\"C:\\loads\\orders.xlsm\"".to_string()),
            identity: Some("agent-7".to_string()),
        }
    }

    #[test]
    fn test_valid_inputs() {
        let inputs = ProcessInputs::from_args(&args()).unwrap();
        assert_eq!(
            inputs,
            ProcessInputs {
                test_id: "T-100".to_string(),
                role: "T1".to_string(),
                program: "C:\\loads\\orders.xlsm".to_string(),
                identity: "agent-7".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_role_is_fatal() {
        let err = ProcessInputs::from_args(&InputArgs {
            role: None,
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("LOADRIG_USER_ROLE"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        assert!(ProcessInputs::from_args(&InputArgs {
            test_id: Some("   ".to_string()),
            ..args()
        })
        .is_err());

        assert!(ProcessInputs::from_args(&InputArgs {
            program: Some("\"\"".to_string()),
            ..args()
        })
        .is_err());
    }

    #[test]
    fn test_identity_falls_back_to_detection() {
        let inputs = ProcessInputs::from_args(&InputArgs {
            identity: None,
            ..args()
        })
        .unwrap();
        assert!(!inputs.identity.is_empty());
    }

    #[test]
    fn test_require_test_id() {
        assert_eq!(require_test_id(&args()).unwrap(), "T-100");
        assert!(require_test_id(&InputArgs::default()).is_err());
    }
}
