//! Player identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A player's battle tag, e.g. `Grubby#1234`.
///
/// Battle tags are the identity key everywhere: participant lookup inside a
/// match, and the upsert key of the cached record.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BattleTag(String);

impl BattleTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Get the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BattleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for BattleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BattleTag({})", self.0)
    }
}

impl From<String> for BattleTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BattleTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
