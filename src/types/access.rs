use std::fmt;

use serde::Serialize;

use super::{Repository, User};

/// What a viewer may do with a repository.
///
/// Owners manage the repository. Everyone else, anonymous viewers included,
/// holds at most the link token, which grants read access only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Owner,
    Reader,
}

impl Access {
    #[must_use]
    pub fn for_viewer(viewer: Option<&User>, repository: &Repository) -> Access {
        match viewer {
            Some(user) if user.id == repository.user_id => Access::Owner,
            _ => Access::Reader,
        }
    }

    #[must_use]
    pub const fn can_mutate(self) -> bool {
        matches!(self, Access::Owner)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Owner => write!(f, "owner"),
            Access::Reader => write!(f, "reader"),
        }
    }
}
