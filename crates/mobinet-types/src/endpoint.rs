//! Controller endpoint type (control-channel target).

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The `(host, port)` pair a switch's control channel connects to.
///
/// Displayed in the Open vSwitch target syntax (`tcp:<host>:<port>`),
/// which is also accepted when parsing alongside the bare `host:port`
/// form.
///
/// # Examples
///
/// ```
/// use mobinet_types::ControllerEndpoint;
///
/// let c0: ControllerEndpoint = "tcp:192.168.56.101:6633".parse().unwrap();
/// assert_eq!(c0.host(), "192.168.56.101");
/// assert_eq!(c0.port(), 6633);
/// assert_eq!(c0.to_string(), "tcp:192.168.56.101:6633");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerEndpoint {
    host: String,
    port: u16,
}

impl ControllerEndpoint {
    /// Creates a new controller endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is empty or the port is zero.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ParseError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ParseError::InvalidEndpoint("empty host".to_string()));
        }
        if port == 0 {
            return Err(ParseError::InvalidEndpoint(format!(
                "{}: port must be non-zero",
                host
            )));
        }
        Ok(Self { host, port })
    }

    /// Returns the controller host (IP address or resolvable name).
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the controller TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the Open vSwitch controller target string.
    pub fn target(&self) -> String {
        format!("tcp:{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ControllerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp:{}:{}", self.host, self.port)
    }
}

impl FromStr for ControllerEndpoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("tcp:").unwrap_or(s);
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| ParseError::InvalidEndpoint(s.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ParseError::InvalidEndpoint(s.to_string()))?;
        ControllerEndpoint::new(host, port).map_err(|_| ParseError::InvalidEndpoint(s.to_string()))
    }
}
