use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A role a user can hold on a program or project scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "delete")]
    Delete,
    #[serde(rename = "download")]
    Download,
    #[serde(rename = "_member_")]
    Member,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "read-storage")]
    ReadStorage,
    #[serde(rename = "release")]
    Release,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "upload")]
    Upload,
}

/// Roles held on one scope.
pub type RoleSet = BTreeSet<Role>;

impl Role {
    pub const ALL: [Role; 10] = [
        Role::Admin,
        Role::Create,
        Role::Delete,
        Role::Download,
        Role::Member,
        Role::Read,
        Role::ReadStorage,
        Role::Release,
        Role::Update,
        Role::Upload,
    ];

    /// Converts a role string to its variant.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Self::Admin),
            "create" => Some(Self::Create),
            "delete" => Some(Self::Delete),
            "download" => Some(Self::Download),
            "_member_" => Some(Self::Member),
            "read" => Some(Self::Read),
            "read-storage" => Some(Self::ReadStorage),
            "release" => Some(Self::Release),
            "update" => Some(Self::Update),
            "upload" => Some(Self::Upload),
            _ => None,
        }
    }

    /// Converts a slice of role strings to a set.
    pub fn parse_many<S: AsRef<str>>(strs: &[S]) -> Option<RoleSet> {
        strs.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Download => "download",
            Self::Member => "_member_",
            Self::Read => "read",
            Self::ReadStorage => "read-storage",
            Self::Release => "release",
            Self::Update => "update",
            Self::Upload => "upload",
        }
    }

    /// Name shown to users in denial messages. `_member_` is the legacy read role.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Member => "read (_member_)",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if any required role is held.
#[must_use]
pub fn has_any_role(held: &RoleSet, required: &[Role]) -> bool {
    required.iter().any(|role| held.contains(role))
}
