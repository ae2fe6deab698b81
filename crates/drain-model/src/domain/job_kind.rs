use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Declared category of a job, used to select its handler action.
///
/// Kinds are open-ended strings; anything the registry does not know about is
/// routed to the fallback action instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKind(String);

impl JobKind {
    /// Kind assigned when a payload has no usable `type` field.
    pub const DEFAULT: &'static str = "unknown";

    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// The low-priority classification for missing or unrecognised types.
    pub fn unknown() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for JobKind {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobKind {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobKind {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for JobKind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for JobKind {
    fn borrow(&self) -> &str {
        &self.0
    }
}
