//! Security identities that entries are granted to.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

/// Whether a subject names a specific actor or a granted authority (role / group).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubjectKind {
    #[default]
    Principal,
    Authority,
}

impl Display for SubjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_ref())
    }
}

/// A security identity (SID). Equality is by kind and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Subject {
    Principal(String),
    Authority(String),
}

impl Subject {
    pub fn new(kind: SubjectKind, name: impl Into<String>) -> Self {
        match kind {
            SubjectKind::Principal => Subject::Principal(name.into()),
            SubjectKind::Authority => Subject::Authority(name.into()),
        }
    }

    pub fn principal(name: impl Into<String>) -> Self {
        Subject::Principal(name.into())
    }

    pub fn authority(name: impl Into<String>) -> Self {
        Subject::Authority(name.into())
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Principal(_) => SubjectKind::Principal,
            Subject::Authority(_) => SubjectKind::Authority,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Subject::Principal(name) | Subject::Authority(name) => name,
        }
    }
}

/// Renders as `kind:name`, e.g. `principal:alice`.
impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.kind(), self.name())
    }
}
