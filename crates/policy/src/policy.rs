//! Access decisions.

use crate::{Action, Principal, UserId};
use std::fmt;

/// Why a request was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The action needs a principal and none was supplied.
    Unauthenticated,
    /// The principal's role is not allowed and no owner override applies.
    Forbidden { action: Action },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Unauthenticated => f.write_str("authentication required"),
            DenyReason::Forbidden { action } => {
                write!(f, "you do not have permission to {action}")
            }
        }
    }
}

/// Result of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: DenyReason },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn deny(reason: DenyReason) -> Self {
        Decision::Deny { reason }
    }
}

/// Decide whether `principal` may perform `action`.
///
/// `resource_owner` is the creator of the target resource, when the action
/// has one. Rules apply in order: a missing principal is unauthenticated,
/// then the role must be in the action's allowed set unless the action
/// grants an owner override and the principal owns the resource.
pub fn authorize(
    principal: Option<&Principal>,
    action: Action,
    resource_owner: Option<UserId>,
) -> Decision {
    let rule = action.rule();

    let Some(principal) = principal else {
        return if rule.requires_auth {
            Decision::deny(DenyReason::Unauthenticated)
        } else {
            Decision::Allow
        };
    };

    if rule.permits_role(principal.role) {
        return Decision::Allow;
    }

    if rule.owner_override && resource_owner == Some(principal.id) {
        return Decision::Allow;
    }

    Decision::deny(DenyReason::Forbidden { action })
}
