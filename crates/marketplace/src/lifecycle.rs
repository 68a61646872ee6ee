//! Experience creation and status transitions.
//!
//! ```text
//! draft ──publish──▶ published ──block──▶ blocked
//!   │                  ▲   │                 ▲
//!   │                  └───┘ (re-publish)    │
//!   └───────────────────block────────────────┘
//! ```
//!
//! `blocked` has no outbound edges. Each transition is one conditional
//! update in the store, so a concurrent block can never be overwritten by a
//! publish that read the row earlier.

use chrono::{DateTime, Utc};
use policy::{Action, Principal};
use serde::Deserialize;
use storage::{Experience, ExperienceId, ExperienceStatus, NewExperience};

use crate::{Error, Marketplace, Result};

const PUBLISH_FROM: &[ExperienceStatus] = &[ExperienceStatus::Draft, ExperienceStatus::Published];

// Blocking a blocked experience matches the row and leaves it unchanged.
const BLOCK_FROM: &[ExperienceStatus] = &[
    ExperienceStatus::Draft,
    ExperienceStatus::Published,
    ExperienceStatus::Blocked,
];

/// Fields a host supplies when creating an experience.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperienceDraft {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    /// Price in minor currency units.
    pub price: i64,
    pub start_time: DateTime<Utc>,
}

impl ExperienceDraft {
    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.location.trim().is_empty() {
            return Err(Error::Validation(
                "title, location, price and start_time are required".into(),
            ));
        }
        if self.price <= 0 {
            return Err(Error::Validation("price must be greater than zero".into()));
        }
        Ok(())
    }
}

impl Marketplace {
    /// Create a draft experience owned by `principal`.
    pub async fn create_experience(
        &self,
        principal: &Principal,
        draft: ExperienceDraft,
    ) -> Result<Experience> {
        self.require(principal, Action::CreateExperience, None)?;
        draft.validate()?;

        let description = draft
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let id = self
            .store
            .insert_experience(NewExperience {
                title: draft.title.trim().to_string(),
                description,
                location: draft.location.trim().to_string(),
                price: draft.price,
                start_time: draft.start_time,
                created_by: principal.id,
            })
            .await?;

        tracing::info!(experience_id = %id, created_by = %principal.id, "experience created");
        self.load_experience(id).await
    }

    /// Publish an experience. Allowed for admins and for the experience's
    /// creator; publishing an already published experience succeeds.
    ///
    /// The returned experience reflects the state this call committed, even
    /// if a block lands immediately afterwards.
    pub async fn publish_experience(
        &self,
        principal: &Principal,
        id: ExperienceId,
    ) -> Result<Experience> {
        let experience = self.load_experience(id).await?;
        self.require(principal, Action::PublishExperience, Some(experience.created_by))?;

        if experience.status == ExperienceStatus::Blocked {
            return Err(blocked(id));
        }

        let changed = self
            .store
            .update_experience_status(id, ExperienceStatus::Published, PUBLISH_FROM)
            .await?;
        if changed == 0 {
            // Lost a race: the row left the publishable states after we read it.
            return match self.store.get_experience(id).await? {
                None => Err(Error::NotFound(format!("experience {id} not found"))),
                Some(_) => Err(blocked(id)),
            };
        }

        tracing::info!(experience_id = %id, user_id = %principal.id, "experience published");
        Ok(Experience {
            status: ExperienceStatus::Published,
            ..experience
        })
    }

    /// Block an experience. Admin only; there is no way back.
    pub async fn block_experience(
        &self,
        principal: &Principal,
        id: ExperienceId,
    ) -> Result<Experience> {
        self.require(principal, Action::BlockExperience, None)?;

        let changed = self
            .store
            .update_experience_status(id, ExperienceStatus::Blocked, BLOCK_FROM)
            .await?;
        if changed == 0 {
            return Err(Error::NotFound(format!("experience {id} not found")));
        }

        tracing::info!(experience_id = %id, user_id = %principal.id, "experience blocked");
        self.load_experience(id).await
    }
}

fn blocked(id: ExperienceId) -> Error {
    Error::InvalidState(format!("experience {id} is blocked and cannot be published"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{BlockPoint, Interleaved, fixture, walk};
    use std::sync::Arc;

    #[tokio::test]
    async fn create_experience_starts_as_draft() {
        let fx = fixture().await;
        let experience = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 1))
            .await
            .unwrap();

        assert_eq!(experience.status, ExperienceStatus::Draft);
        assert_eq!(experience.created_by, fx.host.id);
        assert_eq!(experience.price, 2500);
    }

    #[tokio::test]
    async fn create_experience_requires_host_or_admin() {
        let fx = fixture().await;
        let err = fx
            .marketplace
            .create_experience(&fx.user, walk("Lisbon", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        fx.marketplace
            .create_experience(&fx.admin, walk("Lisbon", 1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_experience_validates_fields() {
        let fx = fixture().await;

        let mut blank_title = walk("Lisbon", 1);
        blank_title.title = "   ".into();
        let mut free = walk("Lisbon", 1);
        free.price = 0;

        for draft in [blank_title, free] {
            let err = fx
                .marketplace
                .create_experience(&fx.host, draft)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }

    #[tokio::test]
    async fn publish_by_owner_and_admin() {
        let fx = fixture().await;
        let mine = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 1))
            .await
            .unwrap();
        let theirs = fx
            .marketplace
            .create_experience(&fx.other_host, walk("Lisbon", 2))
            .await
            .unwrap();

        let published = fx
            .marketplace
            .publish_experience(&fx.host, mine.id)
            .await
            .unwrap();
        assert_eq!(published.status, ExperienceStatus::Published);

        let err = fx
            .marketplace
            .publish_experience(&fx.host, theirs.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let published = fx
            .marketplace
            .publish_experience(&fx.admin, theirs.id)
            .await
            .unwrap();
        assert_eq!(published.status, ExperienceStatus::Published);
    }

    #[tokio::test]
    async fn publish_is_idempotent() {
        let fx = fixture().await;
        let experience = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 1))
            .await
            .unwrap();

        fx.marketplace
            .publish_experience(&fx.host, experience.id)
            .await
            .unwrap();
        let again = fx
            .marketplace
            .publish_experience(&fx.host, experience.id)
            .await
            .unwrap();
        assert_eq!(again.status, ExperienceStatus::Published);
    }

    #[tokio::test]
    async fn unknown_experience_is_not_found() {
        let fx = fixture().await;
        let missing = ExperienceId(4040);

        let err = fx
            .marketplace
            .publish_experience(&fx.admin, missing)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = fx
            .marketplace
            .block_experience(&fx.admin, missing)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn block_is_admin_only_even_for_owner() {
        let fx = fixture().await;
        let experience = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 1))
            .await
            .unwrap();

        let err = fx
            .marketplace
            .block_experience(&fx.host, experience.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let blocked = fx
            .marketplace
            .block_experience(&fx.admin, experience.id)
            .await
            .unwrap();
        assert_eq!(blocked.status, ExperienceStatus::Blocked);
    }

    #[tokio::test]
    async fn blocked_is_terminal() {
        let fx = fixture().await;
        let experience = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 1))
            .await
            .unwrap();
        fx.marketplace
            .publish_experience(&fx.host, experience.id)
            .await
            .unwrap();
        fx.marketplace
            .block_experience(&fx.admin, experience.id)
            .await
            .unwrap();

        for principal in [&fx.host, &fx.admin] {
            let err = fx
                .marketplace
                .publish_experience(principal, experience.id)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidState(_)));
        }

        // Blocking again is accepted and changes nothing.
        let again = fx
            .marketplace
            .block_experience(&fx.admin, experience.id)
            .await
            .unwrap();
        assert_eq!(again.status, ExperienceStatus::Blocked);

        // A non-owner is still turned away before the state is considered.
        let err = fx
            .marketplace
            .publish_experience(&fx.other_host, experience.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_publish_and_block_end_blocked() {
        let fx = fixture().await;
        let experience = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 1))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let marketplace = fx.marketplace.clone();
            let (principal, block) = if i == 5 { (fx.admin, true) } else { (fx.host, false) };
            handles.push(tokio::spawn(async move {
                if block {
                    marketplace.block_experience(&principal, experience.id).await
                } else {
                    marketplace.publish_experience(&principal, experience.id).await
                }
            }));
        }
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) | Err(Error::InvalidState(_)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        let stored = fx.marketplace.load_experience(experience.id).await.unwrap();
        assert_eq!(stored.status, ExperienceStatus::Blocked);
    }

    #[tokio::test]
    async fn publish_reports_the_state_it_committed() {
        let fx = fixture().await;
        let draft = fx
            .marketplace
            .create_experience(&fx.host, walk("Lisbon", 1))
            .await
            .unwrap();
        let marketplace = Marketplace::new(Arc::new(Interleaved::new(
            fx.store.clone(),
            BlockPoint::AfterPublish,
        )));

        let published = marketplace
            .publish_experience(&fx.host, draft.id)
            .await
            .unwrap();
        assert_eq!(published.status, ExperienceStatus::Published);
        assert_eq!(published.title, draft.title);

        let stored = fx.marketplace.load_experience(draft.id).await.unwrap();
        assert_eq!(stored.status, ExperienceStatus::Blocked);
    }
}
