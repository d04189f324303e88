//! User records

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::MetaStore;
use crate::auth::Role;
use crate::types::Result;

/// A stored user.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a user. Registration always starts as [`Role::User`];
/// promotion is an operator action against the database.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let id: String = row.get(0)?;
    let role: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    Ok(UserRecord {
        id: parse_column(0, &id)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        role: Role::from_str_lossy(&role),
        is_active: row.get::<_, i64>(5)? != 0,
        created_at: parse_column(6, &created_at)?,
    })
}

/// Map a stored-text parse failure onto rusqlite's conversion error.
pub(crate) fn parse_column<T>(index: usize, text: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, is_active, created_at";

impl MetaStore {
    /// Insert a user; fails on a duplicate email (unique constraint).
    pub async fn create_user(&self, new: NewUser) -> Result<UserRecord> {
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            full_name: new.full_name,
            role: Role::User,
            is_active: true,
            created_at: Utc::now(),
        };

        let row = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (id, email, password_hash, full_name, role, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    row.id.to_string(),
                    row.email,
                    row.password_hash,
                    row.full_name,
                    row.role.as_str(),
                    row.is_active as i64,
                    row.created_at.to_rfc3339(),
                ],
            )
        })
        .await?;

        Ok(record)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            conn.prepare_cached(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
            ))?
            .query_row([email], row_to_user)
            .optional()
        })
        .await
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.prepare_cached(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?
                .query_row([id], row_to_user)
                .optional()
        })
        .await
    }
}
