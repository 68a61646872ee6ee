use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Role;

/// State-changing operations that pass through the access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateExperience,
    PublishExperience,
    BlockExperience,
    CreateBooking,
}

/// Who may perform an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRule {
    /// Whether an anonymous caller is turned away before role checks.
    pub requires_auth: bool,
    /// Roles allowed to perform the action.
    pub allowed_roles: &'static [Role],
    /// Whether the owner of the target resource is allowed regardless of role.
    pub owner_override: bool,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::CreateExperience,
        Action::PublishExperience,
        Action::BlockExperience,
        Action::CreateBooking,
    ];

    /// The action table.
    pub const fn rule(self) -> ActionRule {
        match self {
            Action::CreateExperience => ActionRule {
                requires_auth: true,
                allowed_roles: &[Role::Host, Role::Admin],
                owner_override: false,
            },
            Action::PublishExperience => ActionRule {
                requires_auth: true,
                allowed_roles: &[Role::Admin],
                owner_override: true,
            },
            Action::BlockExperience => ActionRule {
                requires_auth: true,
                allowed_roles: &[Role::Admin],
                owner_override: false,
            },
            Action::CreateBooking => ActionRule {
                requires_auth: true,
                allowed_roles: &[Role::User],
                owner_override: false,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateExperience => "create experience",
            Action::PublishExperience => "publish experience",
            Action::BlockExperience => "block experience",
            Action::CreateBooking => "create booking",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActionRule {
    pub fn permits_role(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}
