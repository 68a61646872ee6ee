//! Principal resolution from bearer credentials.
//!
//! Tokens are HS256 JWTs carrying the user id and role. Everything past
//! [`resolve_bearer`] trusts the returned [`Principal`] for the rest of the
//! request.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use policy::{Principal, Role, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, Result};

/// Default token lifetime: one day.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Verifies a credential and yields the principal it was issued to.
pub trait Authenticator: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal>;
}

/// Payload stored in a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// JWT issuer and verifier.
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtAuthenticator {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Issue a token for `principal`.
    pub fn issue(&self, principal: &Principal) -> Result<String> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs())
            .map_err(|_| Error::Internal("token lifetime out of range".into()))?;
        self.encode(&Claims {
            sub: principal.id.0,
            role: principal.role,
            iat: now,
            exp: now.saturating_add(ttl),
        })
    }

    fn encode(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("failed to sign token: {e}")))
    }
}

impl Authenticator for JwtAuthenticator {
    fn verify(&self, token: &str) -> Result<Principal> {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(Principal::new(UserId(data.claims.sub), data.claims.role)),
            Err(err) => {
                let reason = match err.kind() {
                    ErrorKind::ExpiredSignature => "token expired",
                    ErrorKind::InvalidSignature => "invalid token signature",
                    _ => "invalid or expired token",
                };
                tracing::debug!(error = %err, "rejected credential");
                Err(Error::InvalidCredential(reason.to_string()))
            }
        }
    }
}

/// Resolve an `Authorization` header value into a principal.
///
/// A missing header, a scheme other than `Bearer`, or an empty token is
/// [`Error::Unauthenticated`]; a token that fails verification is
/// [`Error::InvalidCredential`].
pub fn resolve_bearer(
    authenticator: &dyn Authenticator,
    header: Option<&str>,
) -> Result<Principal> {
    let Some(header) = header else {
        return Err(Error::Unauthenticated("authorization token missing".into()));
    };
    let Some(token) = header.strip_prefix("Bearer ") else {
        return Err(Error::Unauthenticated(
            "authorization header must use the Bearer scheme".into(),
        ));
    };
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::Unauthenticated("authorization token missing".into()));
    }
    authenticator.verify(token)
}
