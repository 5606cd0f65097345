//! Shell command execution for forwarding-plane clients.
//!
//! All interaction with Open vSwitch and the kernel network stack goes
//! through external tools, so every argument that originates from a node
//! or interface name must pass through [`shellquote`] before it is
//! interpolated into a command line.
//!
//! # Example
//!
//! ```ignore
//! use mobinet_plane::shell::{self, OVS_VSCTL_CMD, shellquote};
//!
//! let bridge = "s1";
//! let cmd = format!("{} br-exists {}", OVS_VSCTL_CMD, shellquote(bridge));
//! let result = shell::exec(&cmd).await?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{PlaneError, PlaneResult};

/// Path to the `ovs-vsctl` command for datapath configuration.
pub const OVS_VSCTL_CMD: &str = "ovs-vsctl";

/// Path to the `ovs-ofctl` command for flow-table control.
pub const OVS_OFCTL_CMD: &str = "ovs-ofctl";

/// Path to the `ip` command for network interface configuration.
pub const IP_CMD: &str = "ip";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// Wraps the string in double quotes and escapes any characters that
/// keep special meaning inside double quotes:
/// - `$` (variable expansion)
/// - `` ` `` (command substitution)
/// - `"` (quote termination)
/// - `\` (escape character)
/// - newline (command termination)
///
/// # Example
///
/// ```
/// use mobinet_plane::shell::shellquote;
///
/// assert_eq!(shellquote("s1-eth3"), "\"s1-eth3\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The trimmed stdout output.
    pub stdout: String,
    /// The trimmed stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes a shell command asynchronously.
///
/// The command runs through `/bin/sh -c` so `--` separators and
/// multi-clause `ovs-vsctl` invocations work unchanged.
///
/// Returns `Ok(ExecResult)` whether or not the command exited zero;
/// spawn failures are the only error path.
pub async fn exec(cmd: &str) -> PlaneResult<ExecResult> {
    tracing::debug!(command = %cmd, "Executing shell command");

    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| PlaneError::Exec {
            command: cmd.to_string(),
            source: e,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let result = ExecResult {
        exit_code,
        stdout,
        stderr,
    };

    if result.success() {
        tracing::trace!(command = %cmd, exit_code = exit_code, "Command succeeded");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes a shell command and returns an error on non-zero exit.
///
/// Returns the stdout output on success.
pub async fn exec_or_throw(cmd: &str) -> PlaneResult<String> {
    let result = exec(cmd).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(PlaneError::CommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}
