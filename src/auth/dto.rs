use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

const MAX_FIELD_CHARS: usize = 250;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Whitespace-only values count as empty, matching `NewUser::ensure_complete`.
fn check_length(field: &str, value: &str) -> Result<(), AuthError> {
    let chars = value.chars().count();
    if value.trim().is_empty() || chars > MAX_FIELD_CHARS {
        return Err(AuthError::Validation(format!(
            "{field} must be between 1 and {MAX_FIELD_CHARS} characters"
        )));
    }
    Ok(())
}

fn normalize_email(raw: &mut String) -> Result<(), AuthError> {
    *raw = raw.trim().to_lowercase();
    check_length("correo", raw)?;
    if !is_valid_email(raw) {
        return Err(AuthError::Validation("correo is not a valid email address".into()));
    }
    Ok(())
}

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub nombre: String,
    pub correo: String,
    pub clave: String,
}

impl RegisterRequest {
    /// Normalizes the email in place and enforces field limits.
    pub fn validate(&mut self) -> Result<(), AuthError> {
        check_length("nombre", &self.nombre)?;
        normalize_email(&mut self.correo)?;
        check_length("clave", &self.clave)?;
        Ok(())
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub correo: String,
    pub clave: String,
}

impl LoginRequest {
    pub fn validate(&mut self) -> Result<(), AuthError> {
        normalize_email(&mut self.correo)?;
        check_length("clave", &self.clave)?;
        Ok(())
    }
}

/// Payload returned after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

impl LoginResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".into(),
        }
    }
}
