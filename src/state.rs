use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    auth::{jwt::JwtKeys, repo::PgUserStore, services::AuthService},
    config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect_with(config.database.connect_options()?)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let store = Arc::new(PgUserStore::new(db));
        let keys = JwtKeys::new(&config.jwt);
        Ok(Self::from_parts(Arc::new(AuthService::new(store, keys))))
    }

    pub fn from_parts(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }
}
