use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const USERS_TABLE: &str = "users";

/// Columns written on insert, in bind order.
pub const USER_INSERT_COLUMNS: [&str; 4] = ["name", "email", "password_hash", "status"];

pub const USER_SELECT_COLUMNS: &str = "user_id, name, email, password_hash, status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for UserStatus {
    type Error = String;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        match raw {
            "ACTIVE" => Ok(UserStatus::Active),
            other => Err(format!("unknown user status {other:?}")),
        }
    }
}

/// Row as stored in `users`.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub status: String,
}

/// User in its canonical (camelCase) shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub status: UserStatus,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.user_id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            status: UserStatus::try_from(row.status.as_str())?,
        })
    }
}

/// Values for a fresh `users` row; the id comes from the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub status: UserStatus,
}

impl NewUser {
    pub fn ensure_complete(&self) -> Result<(), String> {
        for (column, value) in USER_INSERT_COLUMNS.iter().zip([
            self.name.as_str(),
            self.email.as_str(),
            self.password_hash.as_str(),
        ]) {
            if value.trim().is_empty() {
                return Err(format!("{column} must not be empty"));
            }
        }
        Ok(())
    }
}

/// `INSERT INTO t (a, b) VALUES ($1, $2)` for the given column list.
pub fn insert_statement(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}
