//! Failure kinds shared by every channel store.
//!
//! Each store keeps its own error enum; all of them collapse onto one of
//! these kinds so callers have a single thing to branch on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Enumerable failure kind carried by every channel-level error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Lookup miss: unknown permission entry, blacklist entry, or setting.
    NotFound,
    /// A stored setting value does not have the declared type.
    TypeMismatch,
    /// Malformed input: bad URL, bad regex, unparsable permission string.
    InvalidInput,
    /// The backing store failed internally.
    StoreFault,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::StoreFault => "store fault",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not found");
        assert_eq!(ErrorKind::StoreFault.to_string(), "store fault");
    }

    #[test]
    fn test_serde_camel_case() {
        let json = serde_json::to_string(&ErrorKind::TypeMismatch).unwrap();
        assert_eq!(json, "\"typeMismatch\"");
    }
}
