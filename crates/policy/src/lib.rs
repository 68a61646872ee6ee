//! Role-based access control for the marketplace.
//!
//! Core principle: **every state transition names an [`Action`], and the
//! action table decides who may perform it.**
//!
//! The table lives in [`Action::rule`]; [`authorize`] is the only function
//! that interprets it. Nothing else in the workspace compares roles.

mod action;
mod error;
mod policy;
mod principal;

pub use action::{Action, ActionRule};
pub use error::{Error, Result};
pub use policy::{Decision, DenyReason, authorize};
pub use principal::{Principal, Role, UserId};
