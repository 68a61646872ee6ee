//! Booking admission.

use policy::{Action, Principal};
use storage::{Booking, BookingInsert, ExperienceId, ExperienceStatus, NewBooking};

use crate::{Error, Marketplace, Result};

impl Marketplace {
    /// Reserve `seats` on an experience for `principal`.
    ///
    /// Checks run in order: role, seat count, existence, published status,
    /// then an existing booking by the same user. The last check is only a
    /// fast path. The store's `(experience_id, user_id)` uniqueness
    /// constraint decides races, and its conflict is reported as
    /// [`Error::AlreadyBooked`].
    pub async fn book(
        &self,
        principal: &Principal,
        experience_id: ExperienceId,
        seats: i64,
    ) -> Result<Booking> {
        self.require(principal, Action::CreateBooking, None)?;

        if seats < 1 {
            return Err(Error::Validation("seats must be >= 1".into()));
        }

        let experience = self.load_experience(experience_id).await?;
        if experience.status != ExperienceStatus::Published {
            return Err(not_bookable());
        }

        if self
            .store
            .find_booking(experience_id, principal.id)
            .await?
            .is_some()
        {
            return Err(Error::AlreadyBooked);
        }

        let inserted = self
            .store
            .insert_booking(NewBooking {
                experience_id,
                user_id: principal.id,
                seats,
            })
            .await;

        let booking_id = match inserted {
            Ok(BookingInsert::Inserted(id)) => id,
            // Blocked between the status read and the write.
            Ok(BookingInsert::ExperienceUnavailable) => return Err(not_bookable()),
            Err(storage::Error::Conflict(_)) => {
                tracing::debug!(
                    %experience_id,
                    user_id = %principal.id,
                    "concurrent booking lost on uniqueness constraint"
                );
                return Err(Error::AlreadyBooked);
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            booking_id = %booking_id,
            %experience_id,
            user_id = %principal.id,
            seats,
            "booking confirmed"
        );

        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("booking {booking_id} missing after insert")))
    }
}

fn not_bookable() -> Error {
    Error::InvalidStatus("experience is not available for booking".into())
}
