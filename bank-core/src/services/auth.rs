//! Auth service - registration, login and caller resolution
//!
//! Passwords are hashed with Argon2id. Session tokens are 32 random bytes,
//! handed to the caller base64url-encoded; only their SHA-256 digest is stored.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Session, User};
use crate::ports::UserStore;

const TOKEN_BYTES: usize = 32;
const SALT_BYTES: usize = 16;

pub struct AuthService {
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Create a user and log them in
    pub fn register(&self, username: &str, password: &str, email: Option<&str>) -> Result<Session> {
        let username = User::normalize_username(username);
        if username.is_empty() {
            return Err(Error::validation("Username is required"));
        }
        if password.is_empty() {
            return Err(Error::validation("Password is required"));
        }
        if self.users.get_user_by_username(&username)?.is_some() {
            return Err(Error::validation("Username already exists"));
        }

        let email = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        let user = User::new(username, email, hash_password(password)?);
        self.users.insert_user(&user)?;
        tracing::info!(user_id = %user.id, "user registered");

        self.open_session(&user)
    }

    /// Exchange credentials for a session
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        let username = User::normalize_username(username);
        let user = self
            .users
            .get_user_by_username(&username)?
            .ok_or(Error::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(Error::InvalidCredentials);
        }
        self.open_session(&user)
    }

    /// Resolve a session token to the user it belongs to
    pub fn resolve_caller(&self, token: &str) -> Result<Uuid> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Unauthenticated);
        }
        self.users
            .get_session_user(&token_digest(token))?
            .ok_or(Error::Unauthenticated)
    }

    /// Look up the user behind a session token
    pub fn current_user(&self, token: &str) -> Result<User> {
        let user_id = self.resolve_caller(token)?;
        self.users
            .get_user_by_id(user_id)?
            .ok_or(Error::Unauthenticated)
    }

    /// End a session; returns whether it existed
    pub fn logout(&self, token: &str) -> Result<bool> {
        self.users.delete_session(&token_digest(token.trim()))
    }

    fn open_session(&self, user: &User) -> Result<Session> {
        let token = generate_token();
        self.users.insert_session(&token_digest(&token), user.id)?;
        Ok(Session {
            token,
            user_id: user.id,
            username: user.username.clone(),
        })
    }
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::validation(format!("Failed to encode salt: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::validation(format!("Failed to hash password: {e}")))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
