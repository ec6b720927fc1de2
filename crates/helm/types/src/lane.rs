use serde::{Deserialize, Serialize};
use std::fmt;

/// Isolation namespace for drift state (e.g. `experimental` vs `production`).
///
/// Opaque to the core: two lanes are the same lane iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneId(String);

impl LaneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lane:{}", self.0)
    }
}

impl From<&str> for LaneId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for LaneId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for LaneId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
