//! Account registration and login.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use policy::{Principal, Role, UserId};
use serde::Serialize;
use std::sync::Arc;
use storage::{NewUser, Store};

use crate::{Error, JwtAuthenticator, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: Account,
}

/// Signs users up and logs them in.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn Store>,
    tokens: JwtAuthenticator,
}

impl Accounts {
    pub fn new(store: Arc<dyn Store>, tokens: JwtAuthenticator) -> Self {
        Self { store, tokens }
    }

    /// Register a `user` or `host` account. Admins cannot sign themselves up.
    pub async fn signup(&self, email: &str, password: &str, role: &str) -> Result<Account> {
        if email.trim().is_empty() || password.is_empty() || role.trim().is_empty() {
            return Err(Error::Validation(
                "email, password and role are required".into(),
            ));
        }
        let role = match role.trim().parse::<Role>() {
            Ok(role @ (Role::User | Role::Host)) => role,
            _ => return Err(Error::Validation("role must be user or host".into())),
        };
        self.register(email, password, role).await
    }

    /// Register an admin account. Operator use only.
    pub async fn seed_admin(&self, email: &str, password: &str) -> Result<Account> {
        self.register(email, password, Role::Admin).await
    }

    /// Exchange credentials for a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(Error::Validation("email and password are required".into()));
        }

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            return Err(Error::InvalidLogin);
        };
        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(Error::InvalidLogin);
        }

        let token = self.tokens.issue(&Principal::new(user.id, user.role))?;
        tracing::info!(user_id = %user.id, role = %user.role, "login");
        Ok(LoginResponse {
            token,
            user: Account {
                id: user.id,
                email: user.email,
                role: user.role,
            },
        })
    }

    async fn register(&self, email: &str, password: &str, role: Role) -> Result<Account> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(Error::Validation("email must be a valid address".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password(password.to_string()).await?;
        let id = match self
            .store
            .insert_user(NewUser {
                email: email.clone(),
                password_hash,
                role,
            })
            .await
        {
            Ok(id) => id,
            Err(storage::Error::Conflict(_)) => return Err(Error::UserExists),
            Err(err) => return Err(err.into()),
        };

        tracing::info!(user_id = %id, %role, "account created");
        Ok(Account { id, email, role })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

// Argon2 is deliberately slow; keep it off the async workers.
async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Internal(format!("failed to hash password: {e}")))
    })
    .await
    .map_err(|e| Error::Internal(e.to_string()))?
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| Error::Internal(format!("invalid password hash format: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| Error::Internal(e.to_string()))?
}
