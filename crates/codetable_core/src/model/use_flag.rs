//! `Y`/`N` usage flag shared by both code levels.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Whether a code is offered to users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseFlag {
    /// Stored as `Y`.
    #[default]
    #[serde(rename = "Y")]
    Yes,
    /// Stored as `N`.
    #[serde(rename = "N")]
    No,
}

impl UseFlag {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Y",
            Self::No => "N",
        }
    }

    /// Parses the storage representation. Only upper-case `Y`/`N` are valid.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Y" => Some(Self::Yes),
            "N" => Some(Self::No),
            _ => None,
        }
    }

    pub fn is_used(self) -> bool {
        self == Self::Yes
    }
}

impl From<bool> for UseFlag {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

impl Display for UseFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
