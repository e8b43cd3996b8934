use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{NewUser, UserStatus},
        store::{UserStore, UserTransaction},
    },
    errors::{AuthError, LoginFailure},
};

/// Register and login use cases. Each call runs inside exactly one store
/// transaction, committed on success and rolled back on any error.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    /// Returns the id of the newly created user.
    #[instrument(skip(self, req), fields(email = %req.correo))]
    pub async fn register(&self, req: RegisterRequest) -> Result<i32, AuthError> {
        let mut tx = self.store.begin().await?;
        let outcome = register_steps(tx.as_mut(), req).await;
        let user_id = finish(tx, outcome).await?;
        info!(user_id, "user registered");
        Ok(user_id)
    }

    #[instrument(skip(self, req), fields(email = %req.correo))]
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        let mut tx = self.store.begin().await?;
        let outcome = login_steps(tx.as_mut(), &self.keys, req).await;
        let (user_id, response) = finish(tx, outcome).await?;
        info!(user_id, "user logged in");
        Ok(response)
    }
}

async fn register_steps(
    tx: &mut dyn UserTransaction,
    req: RegisterRequest,
) -> Result<i32, AuthError> {
    debug!("looking up existing user by email");
    if tx.find_by_email(&req.correo).await?.is_some() {
        return Err(AuthError::DuplicateEmail);
    }

    let password_hash = hash_blocking(req.clave).await?;
    let new_user = NewUser {
        name: req.nombre,
        email: req.correo,
        password_hash,
        status: UserStatus::Active,
    };
    tx.insert(&new_user).await?.ok_or(AuthError::NotRegistered)
}

async fn login_steps(
    tx: &mut dyn UserTransaction,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<(i32, LoginResponse), AuthError> {
    debug!("looking up user by email");
    let user = tx
        .find_by_email(&req.correo)
        .await?
        .ok_or(AuthError::InvalidCredentials(LoginFailure::UnknownEmail))?;

    if !verify_blocking(req.clave, user.password_hash).await? {
        return Err(AuthError::InvalidCredentials(LoginFailure::WrongPassword));
    }

    let token = keys.issue_access(&user.id.to_string())?;
    Ok((user.id, LoginResponse::bearer(token)))
}

/// Commits on success, rolls back on failure. Consumes the transaction so it
/// is released exactly once either way.
async fn finish<T>(
    tx: Box<dyn UserTransaction>,
    outcome: Result<T, AuthError>,
) -> Result<T, AuthError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

async fn hash_blocking(plain: String) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(hash)
}

async fn verify_blocking(plain: String, hash: String) -> Result<bool, AuthError> {
    let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(anyhow::Error::from)?;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::memory::MemoryUserStore, config::JwtConfig};
    use jsonwebtoken::Algorithm;

    fn service() -> (AuthService, MemoryUserStore, JwtKeys) {
        let store = MemoryUserStore::new();
        let keys = JwtKeys::new(&JwtConfig {
            secret: "test-secret".into(),
            algorithm: Algorithm::HS256,
            ttl_minutes: 60,
        });
        let svc = AuthService::new(Arc::new(store.clone()), keys.clone());
        (svc, store, keys)
    }

    fn ana() -> RegisterRequest {
        RegisterRequest {
            nombre: "Ana".into(),
            correo: "ana@x.com".into(),
            clave: "secret123".into(),
        }
    }

    fn login_as(correo: &str, clave: &str) -> LoginRequest {
        LoginRequest {
            correo: correo.into(),
            clave: clave.into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let (svc, store, keys) = service();

        let id = svc.register(ana()).await.expect("register");
        assert!(id > 0);

        let stored = store.committed_email("ana@x.com").expect("row committed");
        assert_eq!(stored.id, id);
        assert_eq!(stored.status, UserStatus::Active);
        assert_ne!(stored.password_hash, "secret123");

        let resp = svc
            .login(login_as("ana@x.com", "secret123"))
            .await
            .expect("login");
        assert!(!resp.access_token.is_empty());
        assert_eq!(resp.token_type, "bearer");

        let claims = keys.verify(&resp.access_token).expect("token verifies");
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.exp - claims.iat, 60 * 60);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_second_row() {
        let (svc, store, _) = service();
        svc.register(ana()).await.expect("first register");

        let err = svc.register(ana()).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (svc, _, _) = service();
        svc.register(ana()).await.expect("register");

        let err = svc.login(login_as("ana@x.com", "wrong")).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidCredentials(LoginFailure::WrongPassword)
        ));
    }

    #[tokio::test]
    async fn unknown_email_is_invalid_credentials_without_writes() {
        let (svc, store, _) = service();

        let err = svc.login(login_as("nobody@x.com", "x")).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidCredentials(LoginFailure::UnknownEmail)
        ));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_rolls_back() {
        let (svc, store, _) = service();
        store.fail_inserts(true);

        let err = svc.register(ana()).await.unwrap_err();
        assert!(matches!(err, AuthError::Persistence(_)));
        assert!(store.committed_email("ana@x.com").is_none());

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_by_email("ana@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_without_id_is_not_registered() {
        let (svc, store, _) = service();
        store.insert_yields_nothing(true);

        let err = svc.register(ana()).await.unwrap_err();
        assert!(matches!(err, AuthError::NotRegistered));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn every_path_opens_one_transaction_and_releases_it() {
        let (svc, store, _) = service();

        svc.register(ana()).await.expect("register");
        assert_eq!((store.begun(), store.open()), (1, 0));

        svc.register(ana()).await.unwrap_err();
        assert_eq!((store.begun(), store.open()), (2, 0));

        svc.login(login_as("ana@x.com", "secret123")).await.expect("login");
        assert_eq!((store.begun(), store.open()), (3, 0));

        svc.login(login_as("ana@x.com", "nope")).await.unwrap_err();
        assert_eq!((store.begun(), store.open()), (4, 0));

        svc.login(login_as("ghost@x.com", "nope")).await.unwrap_err();
        assert_eq!((store.begun(), store.open()), (5, 0));
    }
}
