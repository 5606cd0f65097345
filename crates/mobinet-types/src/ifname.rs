//! Canonical interface naming.
//!
//! Every interface the emulator creates is named `"<node>-eth<port>"`,
//! and migrated interfaces are renamed back into this form on their new
//! owner. These helpers keep the format in one place.

use crate::{ParseError, PortNo};

/// Maximum length of a Linux interface name (IFNAMSIZ - 1).
pub const MAX_LEN: usize = 15;

/// Builds the canonical interface name for a node/port pair.
///
/// # Examples
///
/// ```
/// use mobinet_types::{ifname, PortNo};
///
/// let name = ifname::canonical("s7", PortNo::new(12).unwrap());
/// assert_eq!(name, "s7-eth12");
/// ```
pub fn canonical(node: &str, port: PortNo) -> String {
    format!("{}-eth{}", node, port)
}

/// Checks that a name fits the kernel's interface-name limits.
///
/// # Errors
///
/// Returns an error if the name is empty, longer than [`MAX_LEN`], or
/// contains whitespace or `/`.
pub fn validate(name: &str) -> Result<(), ParseError> {
    if name.is_empty() || name.len() > MAX_LEN {
        return Err(ParseError::InvalidIntfName(name.to_string()));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ParseError::InvalidIntfName(name.to_string()));
    }
    Ok(())
}

/// Splits a canonical interface name into its node and port parts.
///
/// Returns `None` for names that do not follow the canonical form; such
/// names are legal (callers may attach interfaces under any name) but
/// carry no position information.
pub fn parse(name: &str) -> Option<(&str, PortNo)> {
    let (node, port) = name.rsplit_once("-eth")?;
    if node.is_empty() {
        return None;
    }
    let port: PortNo = port.parse().ok()?;
    Some((node, port))
}
