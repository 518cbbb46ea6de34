use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::event::Visibility;

/// Desk role of the caller, passed explicitly to every capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Trader,
    Finance,
    Risk,
    Operations,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Trader => "trader",
            Self::Finance => "finance",
            Self::Risk => "risk",
            Self::Operations => "operations",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "trader" => Ok(Self::Trader),
            "finance" => Ok(Self::Finance),
            "risk" => Ok(Self::Risk),
            "operations" | "ops" => Ok(Self::Operations),
            "viewer" => Ok(Self::Viewer),
            other => Err(CoreError::UnknownRole(other.to_owned())),
        }
    }
}

/// Whether the role may append comments, corrections and attachments.
pub fn can_write_timeline(role: Role) -> bool {
    !matches!(role, Role::Viewer)
}

/// Whether the role may create finance-restricted events.
pub fn can_use_finance_visibility(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Finance)
}

/// Visibilities a composer may offer to the role.
pub fn allowed_visibilities(role: Role) -> &'static [Visibility] {
    if can_use_finance_visibility(role) {
        &[Visibility::All, Visibility::Finance]
    } else {
        &[Visibility::All]
    }
}
