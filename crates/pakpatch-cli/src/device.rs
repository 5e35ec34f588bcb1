//! Target device names

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Shortest accepted device name
pub const MIN_DEVICE_LEN: usize = 5;

/// Longest accepted device name
pub const MAX_DEVICE_LEN: usize = 20;

/// Normalised device model name (`RMX5011`, `SM-X910`)
///
/// Names are trimmed and upper-cased on parsing. Only ASCII letters, digits
/// and `-` are accepted, since the name is also used as an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceName(String);

impl DeviceName {
    /// Name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        let invalid = |reason| ConfigError::InvalidDevice {
            value: s.to_string(),
            reason,
        };

        if !(MIN_DEVICE_LEN..=MAX_DEVICE_LEN).contains(&name.len()) {
            return Err(invalid("must be 5 to 20 characters"));
        }
        if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(invalid("only letters, digits and '-' are allowed"));
        }
        Ok(Self(name))
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
