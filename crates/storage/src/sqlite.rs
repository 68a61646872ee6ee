//! SQLite store implementation.

use crate::record::{format_timestamp, parse_timestamp};
use crate::{
    Booking, BookingId, BookingInsert, BookingStatus, Error, Experience, ExperienceId,
    ExperienceQuery, ExperienceStatus, NewBooking, NewExperience, NewUser, Result, Store, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use policy::{Role, UserId};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT CHECK(role IN ('admin', 'host', 'user')) NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS experiences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    location TEXT NOT NULL,
    price INTEGER NOT NULL,
    start_time TEXT NOT NULL,
    created_by INTEGER NOT NULL REFERENCES users(id),
    status TEXT CHECK(status IN ('draft', 'published', 'blocked')) NOT NULL DEFAULT 'draft',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bookings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    experience_id INTEGER NOT NULL REFERENCES experiences(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    seats INTEGER CHECK(seats >= 1) NOT NULL,
    status TEXT CHECK(status IN ('confirmed', 'cancelled')) NOT NULL DEFAULT 'confirmed',
    created_at TEXT NOT NULL,
    UNIQUE (experience_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_experiences_location_time
    ON experiences(location, start_time);
CREATE INDEX IF NOT EXISTS idx_bookings_user_exp
    ON bookings(user_id, experience_id);
"#;

const EXPERIENCE_COLUMNS: &str =
    "id, title, description, location, price, start_time, created_by, status, created_at";

const BOOKING_COLUMNS: &str = "id, experience_id, user_id, seats, status, created_at";

// The booking only lands if the experience is published when the write runs.
const INSERT_BOOKING: &str = "
    INSERT INTO bookings (experience_id, user_id, seats, status, created_at)
    SELECT ?1, ?2, ?3, ?4, ?5
    WHERE EXISTS (SELECT 1 FROM experiences WHERE id = ?1 AND status = 'published')";

/// Connection tuning for file-backed stores.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-backed store.
///
/// Cloning is cheap and shares the underlying connection. Statements run on
/// tokio's blocking pool so callers can await them from async code.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite store");
        Self::from_connection(conn)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| Error::Poisoned)?;
            op(&guard)
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))?
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_experience(&self, id: ExperienceId) -> Result<Option<Experience>> {
        self.run(move |conn| {
            let experience = conn
                .query_row(
                    &format!("SELECT {EXPERIENCE_COLUMNS} FROM experiences WHERE id = ?1"),
                    [id.0],
                    experience_from_row,
                )
                .optional()?;
            Ok(experience)
        })
        .await
    }

    async fn insert_experience(&self, new: NewExperience) -> Result<ExperienceId> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO experiences
                 (title, description, location, price, start_time, created_by, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    new.title,
                    new.description,
                    new.location,
                    new.price,
                    format_timestamp(&new.start_time),
                    new.created_by.0,
                    ExperienceStatus::Draft,
                    format_timestamp(&Utc::now()),
                ],
            )?;
            Ok(ExperienceId(conn.last_insert_rowid()))
        })
        .await
    }

    async fn update_experience_status(
        &self,
        id: ExperienceId,
        to: ExperienceStatus,
        from: &[ExperienceStatus],
    ) -> Result<usize> {
        if from.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; from.len()].join(", ");
        let sql = format!(
            "UPDATE experiences SET status = ? WHERE id = ? AND status IN ({placeholders})"
        );
        let mut args = vec![Value::Text(to.as_str().to_string()), Value::Integer(id.0)];
        args.extend(from.iter().map(|s| Value::Text(s.as_str().to_string())));

        self.run(move |conn| Ok(conn.execute(&sql, params_from_iter(args))?))
            .await
    }

    async fn insert_booking(&self, new: NewBooking) -> Result<BookingInsert> {
        self.run(move |conn| {
            let inserted = conn.execute(
                INSERT_BOOKING,
                params![
                    new.experience_id.0,
                    new.user_id.0,
                    new.seats,
                    BookingStatus::Confirmed,
                    format_timestamp(&Utc::now()),
                ],
            );
            match inserted {
                Ok(0) => Ok(BookingInsert::ExperienceUnavailable),
                Ok(_) => Ok(BookingInsert::Inserted(BookingId(conn.last_insert_rowid()))),
                Err(err) if is_unique_violation(&err) => Err(Error::Conflict(format!(
                    "booking for experience {} by user {} already exists",
                    new.experience_id, new.user_id
                ))),
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        self.run(move |conn| {
            let booking = conn
                .query_row(
                    &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
                    [id.0],
                    booking_from_row,
                )
                .optional()?;
            Ok(booking)
        })
        .await
    }

    async fn find_booking(
        &self,
        experience_id: ExperienceId,
        user_id: UserId,
    ) -> Result<Option<Booking>> {
        self.run(move |conn| {
            let booking = conn
                .query_row(
                    &format!(
                        "SELECT {BOOKING_COLUMNS} FROM bookings
                         WHERE experience_id = ?1 AND user_id = ?2"
                    ),
                    [experience_id.0, user_id.0],
                    booking_from_row,
                )
                .optional()?;
            Ok(booking)
        })
        .await
    }

    async fn list_published(&self, query: ExperienceQuery) -> Result<Vec<Experience>> {
        let mut sql = format!(
            "SELECT {EXPERIENCE_COLUMNS} FROM experiences WHERE status = 'published'"
        );
        let mut args = Vec::new();

        if let Some(location) = query.location {
            sql.push_str(" AND location = ?");
            args.push(Value::Text(location));
        }
        if let Some(from) = query.from {
            sql.push_str(" AND start_time >= ?");
            args.push(Value::Text(format_timestamp(&from)));
        }

        let order = query.sort.sql();
        sql.push_str(&format!(" ORDER BY start_time {order}, id {order} LIMIT ? OFFSET ?"));
        args.push(Value::Integer(i64::from(query.limit)));
        args.push(Value::Integer(i64::try_from(query.offset).unwrap_or(i64::MAX)));

        self.run(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let experiences = stmt
                .query_map(params_from_iter(args), experience_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(experiences)
        })
        .await
    }

    async fn insert_user(&self, new: NewUser) -> Result<UserId> {
        self.run(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO users (email, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    new.email,
                    new.password_hash,
                    new.role.as_str(),
                    format_timestamp(&Utc::now()),
                ],
            );
            match inserted {
                Ok(_) => Ok(UserId(conn.last_insert_rowid())),
                Err(err) if is_unique_violation(&err) => {
                    Err(Error::Conflict(format!("email '{}' already registered", new.email)))
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.run(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, email, password_hash, role, created_at FROM users WHERE email = ?1",
                    [email],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn timestamp_column(row: &Row<'_>, name: &str) -> rusqlite::Result<DateTime<Utc>> {
    let idx = row.as_ref().column_index(name)?;
    let text: String = row.get(idx)?;
    parse_timestamp(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn experience_from_row(row: &Row<'_>) -> rusqlite::Result<Experience> {
    Ok(Experience {
        id: ExperienceId(row.get("id")?),
        title: row.get("title")?,
        description: row.get("description")?,
        location: row.get("location")?,
        price: row.get("price")?,
        start_time: timestamp_column(row, "start_time")?,
        created_by: UserId(row.get("created_by")?),
        status: row.get("status")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: BookingId(row.get("id")?),
        experience_id: ExperienceId(row.get("experience_id")?),
        user_id: UserId(row.get("user_id")?),
        seats: row.get("seats")?,
        status: row.get("status")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let idx = row.as_ref().column_index("role")?;
    let role: String = row.get(idx)?;
    let role: Role = role
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?;

    Ok(User {
        id: UserId(row.get("id")?),
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        role,
        created_at: timestamp_column(row, "created_at")?,
    })
}
