//! Switch port number type with validation.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An OpenFlow-style port number on a single switch.
///
/// Port numbers above `OFPP_MAX` (0xffffff00) are reserved by the
/// protocol for special targets (controller, flood, ...) and are never
/// valid as interface positions. Hosts use port 0 for their first
/// interface; switch ports start at 1.
///
/// # Examples
///
/// ```
/// use mobinet_types::PortNo;
///
/// let port = PortNo::new(3).unwrap();
/// assert_eq!(port.as_u32(), 3);
/// assert_eq!(port.to_string(), "3");
///
/// assert!(PortNo::new(0xffffff42).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PortNo(u32);

impl PortNo {
    /// Highest assignable port number (OFPP_MAX).
    pub const MAX: u32 = 0xffff_ff00;

    /// Port number used for a node's first interface.
    pub const BASE: PortNo = PortNo(0);

    /// Creates a new port number.
    ///
    /// # Errors
    ///
    /// Returns an error if the value falls in the reserved range above
    /// `OFPP_MAX`.
    pub const fn new(no: u32) -> Result<Self, ParseError> {
        if no <= Self::MAX {
            Ok(PortNo(no))
        } else {
            Err(ParseError::InvalidPortNo(no))
        }
    }

    /// Returns the port number as a u32.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Returns the next port number, saturating at `MAX`.
    pub const fn next(&self) -> PortNo {
        if self.0 < Self::MAX {
            PortNo(self.0 + 1)
        } else {
            PortNo(Self::MAX)
        }
    }
}

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PortNo {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let no: u32 = s.trim().parse().map_err(|_| ParseError::InvalidPortNo(0))?;
        PortNo::new(no)
    }
}

impl TryFrom<u32> for PortNo {
    type Error = ParseError;

    fn try_from(no: u32) -> Result<Self, Self::Error> {
        PortNo::new(no)
    }
}

impl From<PortNo> for u32 {
    fn from(port: PortNo) -> u32 {
        port.0
    }
}
