use std::{
    net::{IpAddr, SocketAddr},
    str::FromStr,
};

use anyhow::Context;
use jsonwebtoken::Algorithm;
use sqlx::postgres::PgConnectOptions;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// `DATABASE_URL` wins over the individual parts when both are present.
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url).context("parse DATABASE_URL");
        }
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password))
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

/// Address the HTTP listener binds to.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: parse_or(&lookup, "APP_HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&lookup, "APP_PORT", 8080)?,
        };

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".into()),
            port: parse_or(&lookup, "DB_PORT", 5432)?,
            name: lookup("DB_NAME").unwrap_or_else(|| "itla_api_db".into()),
            user: lookup("DB_USER").unwrap_or_else(|| "postgres".into()),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
        };

        let secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        let algorithm = parse_hmac_algorithm(
            &lookup("JWT_ALGORITHM").unwrap_or_else(|| "HS256".into()),
        )?;
        let ttl_minutes: i64 = parse_or(&lookup, "JWT_TTL_MINUTES", 60)?;
        if ttl_minutes <= 0 {
            anyhow::bail!("JWT_TTL_MINUTES must be positive, got {ttl_minutes}");
        }

        Ok(Self {
            server,
            database,
            jwt: JwtConfig {
                secret,
                algorithm,
                ttl_minutes,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

/// Tokens are signed with a shared secret, so only the HMAC family is accepted.
fn parse_hmac_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    let alg = Algorithm::from_str(raw.trim())
        .with_context(|| format!("unknown JWT_ALGORITHM {raw:?}"))?;
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
        other => anyhow::bail!("JWT_ALGORITHM {other:?} is not a symmetric algorithm"),
    }
}
