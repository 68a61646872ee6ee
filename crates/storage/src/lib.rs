//! SQLite-backed persistence for the Outing marketplace.
//!
//! This crate owns the three tables the marketplace core mutates (users,
//! experiences and bookings) and the [`Store`] port the core talks to.
//!
//! # Integrity
//!
//! The store, not the caller, is the final authority on the invariants that
//! must survive concurrent requests:
//!
//! - `UNIQUE (experience_id, user_id)` on bookings. A second insert for the
//!   same pair fails with [`Error::Conflict`] no matter how the callers race.
//! - Status changes are conditional updates
//!   ([`Store::update_experience_status`]) that only match rows in an allowed
//!   source state, so a `blocked` experience cannot be moved again.
//! - Booking inserts are guarded by the experience being `published` at the
//!   moment of the write ([`BookingInsert::ExperienceUnavailable`] otherwise).
//!
//! # Example
//!
//! ```no_run
//! use storage::{SqliteStore, Store, StoreOptions, ExperienceId};
//!
//! # async fn example() -> storage::Result<()> {
//! let store = SqliteStore::open("outing.db", &StoreOptions::default())?;
//! if let Some(experience) = store.get_experience(ExperienceId(1)).await? {
//!     println!("{} is {}", experience.title, experience.status);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod record;
mod sqlite;
mod store;

pub use error::{Error, Result};
pub use record::{
    Booking, BookingId, BookingInsert, BookingStatus, Experience, ExperienceId, ExperienceQuery,
    ExperienceStatus, NewBooking, NewExperience, NewUser, SortOrder, User,
};
pub use sqlite::{SqliteStore, StoreOptions};
pub use store::Store;
