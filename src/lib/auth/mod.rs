//! Password hashing and signed session tokens.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::storage::models::User;

const BEARER_SCHEME: &str = "Bearer";
const UNKNOWN_USER_PASSWORD: &str = "unknown-user";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header required")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Failed to issue token: {0}")]
    Issue(#[source] jsonwebtoken::errors::Error),

    #[error("Failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Session token payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    /// User id
    pub uid: i64,
    pub role: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
pub struct Authenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_timeout: Duration,
    hash_cost: u32,
    /// Checked when the user does not exist, so both cases cost one bcrypt verification
    dummy_hash: Option<String>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("session_timeout", &self.session_timeout)
            .field("hash_cost", &self.hash_cost)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(secret: &str, session_timeout: Duration, hash_cost: u32) -> Self {
        let dummy_hash = bcrypt::hash(UNKNOWN_USER_PASSWORD, hash_cost)
            .map_err(|error| warn!("Failed to prepare the unknown user hash: {error}"))
            .ok();

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_timeout,
            hash_cost,
            dummy_hash,
        }
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Sign a session token for `user`, valid for the configured session timeout.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let iat = now_secs();
        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            role: user.role.clone(),
            iat,
            exp: iat + self.session_timeout.as_secs(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::Issue)
    }

    /// Validate the value of an `Authorization` header, with or without the
    /// `Bearer` scheme, and return its claims.
    pub fn verify(&self, authorization: &str) -> Result<Claims, AuthError> {
        let token = strip_scheme(authorization.trim()).trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|error| {
            debug!("Rejected token: {error}");
            AuthError::InvalidToken(error)
        })?;

        Ok(data.claims)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(password, self.hash_cost)?)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(password, hash) {
            Ok(valid) => valid,
            Err(error) => {
                warn!("Stored password hash is not usable: {error}");
                false
            }
        }
    }

    /// Check a login attempt against a stored user.
    pub fn authenticate(&self, user: Option<&User>, password: &str) -> Result<(), AuthError> {
        let Some(user) = user else {
            if let Some(dummy_hash) = &self.dummy_hash {
                let _ = bcrypt::verify(password, dummy_hash);
            }
            return Err(AuthError::InvalidCredentials);
        };

        let valid = self.verify_password(password, &user.password_hash);
        if !(valid && user.active) {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(())
    }
}

/// Remove a case-insensitive `Bearer` scheme, if any
fn strip_scheme(authorization: &str) -> &str {
    match authorization.get(..BEARER_SCHEME.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => {
            &authorization[BEARER_SCHEME.len()..]
        }
        _ => authorization,
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
