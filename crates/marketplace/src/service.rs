//! The marketplace service handle.

use policy::{Action, Decision, Principal, UserId, authorize};
use std::sync::Arc;
use storage::{Experience, ExperienceId, Store};

use crate::{Error, Result};

/// Entry point for experience and booking operations.
///
/// Holds the store it was constructed with; cloning shares it. Each
/// operation takes the principal already resolved for the current request.
#[derive(Clone)]
pub struct Marketplace {
    pub(crate) store: Arc<dyn Store>,
}

impl Marketplace {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Run the access gate, turning a denial into an error.
    pub(crate) fn require(
        &self,
        principal: &Principal,
        action: Action,
        resource_owner: Option<UserId>,
    ) -> Result<()> {
        match authorize(Some(principal), action, resource_owner) {
            Decision::Allow => Ok(()),
            Decision::Deny { reason } => {
                tracing::warn!(
                    user_id = %principal.id,
                    role = %principal.role,
                    %action,
                    %reason,
                    "access denied"
                );
                Err(reason.into())
            }
        }
    }

    pub(crate) async fn load_experience(&self, id: ExperienceId) -> Result<Experience> {
        self.store
            .get_experience(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("experience {id} not found")))
    }
}
