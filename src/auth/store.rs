use async_trait::async_trait;

use crate::{
    auth::repo_types::{NewUser, User},
    errors::AuthError,
};

/// Source of per-request transactions over the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, AuthError>;
}

/// An open transaction. Dropping it without `commit` discards its writes and
/// releases the underlying connection.
#[async_trait]
pub trait UserTransaction: Send {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError>;

    /// Returns the generated id, or `None` if the store produced no row.
    async fn insert(&mut self, user: &NewUser) -> Result<Option<i32>, AuthError>;

    async fn commit(self: Box<Self>) -> Result<(), AuthError>;

    async fn rollback(self: Box<Self>) -> Result<(), AuthError>;
}
