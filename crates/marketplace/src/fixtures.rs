//! Shared test setup: an in-memory store seeded with one account per role.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use policy::{Principal, Role, UserId};
use std::sync::Arc;
use storage::{
    Booking, BookingId, BookingInsert, Experience, ExperienceId, ExperienceQuery,
    ExperienceStatus, NewBooking, NewExperience, NewUser, SqliteStore, Store, User,
};

use crate::{ExperienceDraft, Marketplace};

pub struct Fixture {
    pub marketplace: Marketplace,
    pub store: Arc<SqliteStore>,
    pub host: Principal,
    pub other_host: Principal,
    pub admin: Principal,
    pub user: Principal,
    pub other_user: Principal,
}

async fn seed(store: &SqliteStore, email: &str, role: Role) -> Principal {
    let id: UserId = store
        .insert_user(NewUser {
            email: email.to_string(),
            password_hash: "unused".to_string(),
            role,
        })
        .await
        .unwrap();
    Principal::new(id, role)
}

pub async fn fixture() -> Fixture {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let host = seed(&store, "host@example.com", Role::Host).await;
    let other_host = seed(&store, "other-host@example.com", Role::Host).await;
    let admin = seed(&store, "admin@example.com", Role::Admin).await;
    let user = seed(&store, "user@example.com", Role::User).await;
    let other_user = seed(&store, "other-user@example.com", Role::User).await;

    Fixture {
        marketplace: Marketplace::new(store.clone()),
        store,
        host,
        other_host,
        admin,
        user,
        other_user,
    }
}

pub fn walk(location: &str, day: u32) -> ExperienceDraft {
    ExperienceDraft {
        title: format!("Old town walk ({day})"),
        description: Some("Two hours through the old town".to_string()),
        location: location.to_string(),
        price: 2500,
        start_time: Utc.with_ymd_and_hms(2026, 6, day, 10, 0, 0).unwrap(),
    }
}

/// Where [`Interleaved`] slips an admin block in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPoint {
    /// While the duplicate-booking lookup runs, before the insert.
    BookingLookup,
    /// Right after a successful publish update.
    AfterPublish,
}

/// Delegates to a [`SqliteStore`] but blocks the experience being worked on
/// at a chosen point, standing in for a concurrent admin.
pub struct Interleaved {
    inner: Arc<SqliteStore>,
    at: BlockPoint,
}

impl Interleaved {
    pub fn new(inner: Arc<SqliteStore>, at: BlockPoint) -> Self {
        Self { inner, at }
    }

    async fn block(&self, id: ExperienceId) -> storage::Result<()> {
        self.inner
            .update_experience_status(
                id,
                ExperienceStatus::Blocked,
                &[ExperienceStatus::Draft, ExperienceStatus::Published],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for Interleaved {
    async fn get_experience(&self, id: ExperienceId) -> storage::Result<Option<Experience>> {
        self.inner.get_experience(id).await
    }

    async fn insert_experience(&self, new: NewExperience) -> storage::Result<ExperienceId> {
        self.inner.insert_experience(new).await
    }

    async fn update_experience_status(
        &self,
        id: ExperienceId,
        to: ExperienceStatus,
        from: &[ExperienceStatus],
    ) -> storage::Result<usize> {
        let changed = self.inner.update_experience_status(id, to, from).await?;
        let published = to == ExperienceStatus::Published && changed > 0;
        if self.at == BlockPoint::AfterPublish && published {
            self.block(id).await?;
        }
        Ok(changed)
    }

    async fn insert_booking(&self, new: NewBooking) -> storage::Result<BookingInsert> {
        self.inner.insert_booking(new).await
    }

    async fn get_booking(&self, id: BookingId) -> storage::Result<Option<Booking>> {
        self.inner.get_booking(id).await
    }

    async fn find_booking(
        &self,
        experience_id: ExperienceId,
        user_id: UserId,
    ) -> storage::Result<Option<Booking>> {
        let found = self.inner.find_booking(experience_id, user_id).await?;
        if self.at == BlockPoint::BookingLookup {
            self.block(experience_id).await?;
        }
        Ok(found)
    }

    async fn list_published(&self, query: ExperienceQuery) -> storage::Result<Vec<Experience>> {
        self.inner.list_published(query).await
    }

    async fn insert_user(&self, new: NewUser) -> storage::Result<UserId> {
        self.inner.insert_user(new).await
    }

    async fn find_user_by_email(&self, email: &str) -> storage::Result<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
}
