use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig};

/// Signing material derived once from [`JwtConfig`] at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl_minutes: i64,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            ttl_minutes: cfg.ttl_minutes,
        }
    }

    pub fn issue(&self, subject: &str, ttl_minutes: i64) -> anyhow::Result<String> {
        self.issue_at(subject, ttl_minutes, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        subject: &str,
        ttl_minutes: i64,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let exp = now + TimeDuration::minutes(ttl_minutes);
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(sub = %subject, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Issue with the configured time-to-live.
    pub fn issue_access(&self, subject: &str) -> anyhow::Result<String> {
        self.issue(subject, self.ttl_minutes)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let validation = Validation::new(self.algorithm);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}
