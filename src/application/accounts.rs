use crate::domain::ports::UserRepositoryRef;
use crate::domain::user::{NewUser, User, UserProfile};
use crate::error::{MarketplaceError, Result};
use crate::infrastructure::sessions::{SessionStore, SessionToken};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use serde::Deserialize;
use tracing::{info, warn};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_provider: bool,
    #[serde(default)]
    pub address: Option<String>,
}

impl Registration {
    fn validate(&self) -> Result<()> {
        if self.username.trim().chars().count() < MIN_USERNAME_LEN {
            return Err(MarketplaceError::ValidationError(format!(
                "Username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(MarketplaceError::ValidationError(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if !self.email.contains('@') {
            return Err(MarketplaceError::ValidationError(
                "Invalid email address".to_string(),
            ));
        }
        Ok(())
    }
}

fn hashing_error(err: impl std::fmt::Display) -> MarketplaceError {
    MarketplaceError::InternalError(err.to_string().into())
}

async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(hashing_error)
    })
    .await
    .map_err(hashing_error)?
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(hashing_error)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(hashing_error)?
}

/// Credentials and bearer sessions.
#[derive(Clone)]
pub struct AccountService {
    users: UserRepositoryRef,
    sessions: SessionStore,
}

impl AccountService {
    pub fn new(users: UserRepositoryRef, sessions: SessionStore) -> Self {
        Self { users, sessions }
    }

    /// Creates the account and logs it in.
    pub async fn register(&self, form: Registration) -> Result<(UserProfile, SessionToken)> {
        form.validate()?;
        let password_hash = hash_password(form.password).await?;
        let user = self
            .users
            .create_user(NewUser {
                username: form.username.trim().to_string(),
                password_hash,
                email: form.email.trim().to_string(),
                phone_number: form.phone_number,
                is_provider: form.is_provider,
                address: form.address,
            })
            .await?;
        info!(user_id = user.id, is_provider = user.is_provider, "user registered");
        let token = self.sessions.create_session(user.id).await;
        Ok((user.profile(), token))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(UserProfile, SessionToken)> {
        let Some(user) = self.users.find_user_by_username(username.trim()).await? else {
            warn!("login attempt for unknown username");
            return Err(MarketplaceError::UnauthenticatedError);
        };
        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            warn!(user_id = user.id, "login attempt with wrong password");
            return Err(MarketplaceError::UnauthenticatedError);
        }
        let token = self.sessions.create_session(user.id).await;
        Ok((user.profile(), token))
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.delete_session(token).await;
    }

    /// Resolves a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let session = self
            .sessions
            .get_session(token)
            .await
            .ok_or(MarketplaceError::UnauthenticatedError)?;
        // The account may have been removed out from under a live session.
        self.users
            .get_user(session.user_id)
            .await?
            .ok_or(MarketplaceError::UnauthenticatedError)
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.active_sessions().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Repositories;
    use crate::infrastructure::in_memory::InMemoryStore;

    fn service() -> AccountService {
        let repos = Repositories::from_store(InMemoryStore::default());
        AccountService::new(repos.users, SessionStore::default())
    }

    fn form(username: &str, password: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            phone_number: None,
            is_provider: false,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_register_login_logout() {
        let accounts = service();
        let (profile, token) = accounts
            .register(form("asha", "secret-pw", "asha@example.com"))
            .await
            .unwrap();
        assert_eq!(accounts.authenticate(&token).await.unwrap().profile(), profile);

        let (_, second) = accounts.login("ASHA", "secret-pw").await.unwrap();
        assert_ne!(token, second);
        assert_eq!(accounts.active_sessions().await, 2);

        accounts.logout(&token).await;
        assert!(matches!(
            accounts.authenticate(&token).await,
            Err(MarketplaceError::UnauthenticatedError)
        ));
        assert!(accounts.authenticate(&second).await.is_ok());
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let accounts = service();
        let (profile, _) = accounts
            .register(form("ravi", "hunter22", "ravi@example.com"))
            .await
            .unwrap();
        let user = accounts.users.get_user(profile.id).await.unwrap().unwrap();
        assert_ne!(user.password_hash, "hunter22");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let accounts = service();
        accounts
            .register(form("meera", "correct-horse", "meera@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            accounts.login("meera", "wrong-horse").await,
            Err(MarketplaceError::UnauthenticatedError)
        ));
        assert!(matches!(
            accounts.login("nobody", "correct-horse").await,
            Err(MarketplaceError::UnauthenticatedError)
        ));
    }

    #[tokio::test]
    async fn test_registration_validation() {
        let accounts = service();
        for bad in [
            form("ab", "secret-pw", "a@b.c"),
            form("abc", "short", "a@b.c"),
            form("abc", "secret-pw", "not-an-email"),
        ] {
            assert!(matches!(
                accounts.register(bad).await,
                Err(MarketplaceError::ValidationError(_))
            ));
        }

        accounts.register(form("dup", "secret-pw", "d@x.y")).await.unwrap();
        assert!(matches!(
            accounts.register(form("DUP", "secret-pw", "d@x.y")).await,
            Err(MarketplaceError::ConflictError(_))
        ));
    }
}
