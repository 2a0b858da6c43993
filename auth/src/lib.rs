use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use domain::{CoreError, CoreResult, LoginRequest, LoginResponse, User};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Derives the bearer token for a user.
///
/// `email ++ password_hash` is hashed with MD5, the digest is rendered as
/// dash-separated uppercase hex (`9E-6F-...`) and that ASCII string is
/// Base64-encoded. Tokens issued by earlier deployments depend on every step
/// of this encoding, separator included.
pub fn derive_token(email: &str, password_hash: &str) -> String {
    let mut material = String::with_capacity(email.len() + password_hash.len());
    material.push_str(email);
    material.push_str(password_hash);
    let digest = md5::compute(material.as_bytes());
    let hex_dump = digest
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join("-");
    BASE64.encode(hex_dump.as_bytes())
}

/// Identity store. Token verification scans `list_users`, so its cost grows
/// with the number of users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_id(&self, user_id: Uuid) -> CoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;
    async fn list_users(&self) -> CoreResult<Vec<User>>;
}

pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}

#[derive(Clone, Default)]
pub struct BcryptPasswordVerifier;

impl PasswordVerifier for BcryptPasswordVerifier {
    fn verify(&self, password: &str, password_hash: &str) -> bool {
        bcrypt::verify(password, password_hash).unwrap_or(false)
    }
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, payload: LoginRequest) -> AuthResult<LoginResponse>;
    /// First user, in directory order, whose derived token equals `token`.
    async fn verify_token(&self, token: &str) -> AuthResult<Option<User>>;
    async fn authenticate(&self, token: &str) -> AuthResult<User>;
}

#[derive(Clone)]
pub struct TokenAuthService {
    directory: Arc<dyn UserDirectory>,
    verifier: Arc<dyn PasswordVerifier>,
}

impl TokenAuthService {
    pub fn new(directory: Arc<dyn UserDirectory>, verifier: Arc<dyn PasswordVerifier>) -> Self {
        Self {
            directory,
            verifier,
        }
    }
}

#[async_trait]
impl AuthService for TokenAuthService {
    async fn login(&self, payload: LoginRequest) -> AuthResult<LoginResponse> {
        let user = self
            .directory
            .find_user_by_email(payload.email.trim())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.verifier.verify(&payload.password, &user.password_hash) {
            warn!(user_id = %user.id, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(LoginResponse {
            token: derive_token(&user.email, &user.password_hash),
            user_id: user.id,
        })
    }

    async fn verify_token(&self, token: &str) -> AuthResult<Option<User>> {
        if token.is_empty() {
            return Ok(None);
        }

        let users = self.directory.list_users().await?;
        let scanned = users.len();
        let found = users
            .into_iter()
            .find(|user| derive_token(&user.email, &user.password_hash) == token);
        debug!(scanned, matched = found.is_some(), "token scan finished");
        Ok(found)
    }

    async fn authenticate(&self, token: &str) -> AuthResult<User> {
        self.verify_token(token)
            .await?
            .ok_or(AuthError::Core(CoreError::InvalidToken))
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.push(user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user_by_id(&self, user_id: Uuid) -> CoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> CoreResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }
}
