//! Outing marketplace core: authorization, experience lifecycle and
//! booking admission.
//!
//! # Overview
//!
//! - **Principal resolution**: [`resolve_bearer`] turns an `Authorization`
//!   header into a [`Principal`](policy::Principal) using an
//!   [`Authenticator`] such as [`JwtAuthenticator`].
//! - **Access gate**: every mutating operation on [`Marketplace`] first asks
//!   [`policy::authorize`] whether the principal may perform its action.
//! - **Lifecycle**: experiences move `draft → published → blocked`, and
//!   `blocked` is terminal.
//! - **Admission**: [`Marketplace::book`] admits at most one booking per user
//!   per experience, relying on the store's uniqueness constraint when
//!   requests race.
//! - **Listing**: [`Marketplace::list_experiences`] pages through published
//!   experiences.
//! - **Accounts**: [`Accounts`] handles sign-up and login.
//!
//! # Example
//!
//! ```ignore
//! use marketplace::{Marketplace, JwtAuthenticator, DEFAULT_TOKEN_TTL, resolve_bearer};
//! use std::sync::Arc;
//! use storage::{ExperienceId, SqliteStore};
//!
//! # async fn example() -> marketplace::Result<()> {
//! let store = Arc::new(SqliteStore::in_memory()?);
//! let auth = JwtAuthenticator::new(b"a-secret-of-at-least-thirty-two-bytes", DEFAULT_TOKEN_TTL);
//! let marketplace = Marketplace::new(store);
//!
//! let principal = resolve_bearer(&auth, Some("Bearer eyJ..."))?;
//! let booking = marketplace.book(&principal, ExperienceId(1), 2).await?;
//! println!("booked {} seats", booking.seats);
//! # Ok(())
//! # }
//! ```

mod accounts;
mod admission;
mod auth;
mod error;
mod lifecycle;
mod listing;
mod service;

#[cfg(test)]
mod fixtures;

pub use accounts::{Account, Accounts, LoginResponse, MIN_PASSWORD_LEN};
pub use auth::{Authenticator, Claims, DEFAULT_TOKEN_TTL, JwtAuthenticator, resolve_bearer};
pub use error::{Error, ErrorBody, ErrorEnvelope, Result};
pub use lifecycle::ExperienceDraft;
pub use listing::{
    DEFAULT_PAGE_LIMIT, ExperiencePage, ExperienceSummary, ListRequest, MAX_PAGE_LIMIT,
};
pub use service::Marketplace;
