//! Enumeration types for API and tool parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who can see a memo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Visible to anyone, including anonymous visitors.
    Public,
    /// Visible to signed-in users of the instance.
    Protected,
    /// Visible to the creator only.
    #[default]
    Private,
}

impl Visibility {
    /// All accepted values, in wire form.
    pub const ALL: [&'static str; 3] = ["PUBLIC", "PROTECTED", "PRIVATE"];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Protected => "PROTECTED",
            Self::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive parse. The error is the list of accepted values.
impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Self::Public),
            "PROTECTED" => Ok(Self::Protected),
            "PRIVATE" => Ok(Self::Private),
            _ => Err(format!("visibility must be one of {}", Self::ALL.join(", "))),
        }
    }
}
