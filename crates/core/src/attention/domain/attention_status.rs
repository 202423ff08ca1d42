use std::fmt;

use serde::{Deserialize, Serialize};

/// The binary attention signal exposed to clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttentionStatus {
    #[default]
    Focused,
    Distracted,
}

impl AttentionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttentionStatus::Focused => "FOCUSED",
            AttentionStatus::Distracted => "DISTRACTED",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            AttentionStatus::Focused => 0,
            AttentionStatus::Distracted => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        if value == 1 {
            AttentionStatus::Distracted
        } else {
            AttentionStatus::Focused
        }
    }
}

impl fmt::Display for AttentionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
