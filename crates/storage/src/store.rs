//! The persistence port used by the marketplace core.

use async_trait::async_trait;
use policy::UserId;

use crate::{
    Booking, BookingId, BookingInsert, Experience, ExperienceId, ExperienceQuery,
    ExperienceStatus, NewBooking, NewExperience, NewUser, Result, User,
};

/// Transactional store for users, experiences and bookings.
///
/// Every method is atomic at the single-statement level. Implementations
/// must enforce uniqueness of `(experience_id, user_id)` on bookings and of
/// `email` on users at insert time, reporting violations as
/// [`Error::Conflict`](crate::Error::Conflict).
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_experience(&self, id: ExperienceId) -> Result<Option<Experience>>;

    async fn insert_experience(&self, new: NewExperience) -> Result<ExperienceId>;

    /// Set the status of `id` to `to` only if its current status is one of
    /// `from`. Returns the number of rows changed (0 or 1).
    async fn update_experience_status(
        &self,
        id: ExperienceId,
        to: ExperienceStatus,
        from: &[ExperienceStatus],
    ) -> Result<usize>;

    /// Insert a confirmed booking if the experience is published at the
    /// moment of the write.
    async fn insert_booking(&self, new: NewBooking) -> Result<BookingInsert>;

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;

    async fn find_booking(
        &self,
        experience_id: ExperienceId,
        user_id: UserId,
    ) -> Result<Option<Booking>>;

    /// Published experiences only.
    async fn list_published(&self, query: ExperienceQuery) -> Result<Vec<Experience>>;

    async fn insert_user(&self, new: NewUser) -> Result<UserId>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}
