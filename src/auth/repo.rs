use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

use crate::{
    auth::{
        repo_types::{
            insert_statement, NewUser, User, UserRow, USERS_TABLE, USER_INSERT_COLUMNS,
            USER_SELECT_COLUMNS,
        },
        store::{UserStore, UserTransaction},
    },
    errors::AuthError,
};

/// Find a user by email on a caller-owned connection or transaction.
pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>, AuthError> {
    let sql = format!("SELECT {USER_SELECT_COLUMNS} FROM {USERS_TABLE} WHERE email = $1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(User::try_from)
        .transpose()
        .map_err(AuthError::Persistence)
}

/// Insert a user on a caller-owned connection, returning the generated id.
pub async fn insert(conn: &mut PgConnection, user: &NewUser) -> Result<Option<i32>, AuthError> {
    user.ensure_complete().map_err(AuthError::Validation)?;

    let sql = format!(
        "{} RETURNING user_id",
        insert_statement(USERS_TABLE, &USER_INSERT_COLUMNS)
    );
    let id = sqlx::query_scalar::<_, i32>(&sql)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(classify_insert_error)?;
    debug!(user_id = ?id, "user row inserted");
    Ok(id)
}

/// One-shot lookup in its own short transaction.
pub async fn find_by_email_autocommit(pool: &PgPool, email: &str) -> Result<Option<User>, AuthError> {
    let mut tx = pool.begin().await?;
    let user = find_by_email(&mut tx, email).await?;
    tx.commit().await?;
    Ok(user)
}

/// One-shot insert in its own short transaction; rolled back on error.
pub async fn insert_autocommit(pool: &PgPool, user: &NewUser) -> Result<Option<i32>, AuthError> {
    let mut tx = pool.begin().await?;
    let id = insert(&mut tx, user).await?;
    tx.commit().await?;
    Ok(id)
}

fn classify_insert_error(e: sqlx::Error) -> AuthError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::DuplicateEmail,
        _ => AuthError::from(e),
    }
}

/// PostgreSQL-backed [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, AuthError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUserTransaction { tx }))
    }
}

struct PgUserTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserTransaction for PgUserTransaction {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError> {
        find_by_email(&mut self.tx, email).await
    }

    async fn insert(&mut self, user: &NewUser) -> Result<Option<i32>, AuthError> {
        insert(&mut self.tx, user).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AuthError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AuthError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
