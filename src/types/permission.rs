//! Named permissions and their integer masks.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};
use utoipa::ToSchema;

/// A resolved permission: upper-case name plus mask.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    name: String,
    mask: u32,
}

impl Permission {
    pub fn new(name: impl Into<String>, mask: u32) -> Self {
        Self {
            name: name.into(),
            mask,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}({})", self.name, self.mask)
    }
}

/// The built-in permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BasePermission {
    Read,
    Write,
    Create,
    Delete,
    Administration,
}

impl BasePermission {
    pub fn mask(&self) -> u32 {
        match self {
            BasePermission::Read => 1,
            BasePermission::Write => 1 << 1,
            BasePermission::Create => 1 << 2,
            BasePermission::Delete => 1 << 3,
            BasePermission::Administration => 1 << 4,
        }
    }

    pub fn permission(&self) -> Permission {
        Permission::new(self.as_ref(), self.mask())
    }
}
