use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    repo::{DuplicateEmail, UserStore},
    repo_types::{NewUser, User},
};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("users must have an email address")]
    MissingEmail,
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user account is disabled")]
    Inactive,
    #[error(transparent)]
    Store(anyhow::Error),
}

/// A unique-email violation reported by the store is a taken email, not a store failure.
impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DuplicateEmail>() {
            Ok(DuplicateEmail(email)) => Self::EmailTaken(email),
            Err(err) => Self::Store(err),
        }
    }
}

/// Optional columns accepted by [`create_user`].
#[derive(Debug, Clone)]
pub struct UserExtra {
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Default for UserExtra {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lowercases the domain part; the local part is kept as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub async fn create_user(
    store: &dyn UserStore,
    email: Option<&str>,
    password: &str,
    extra: UserExtra,
) -> Result<User, AccountError> {
    let email = match email.map(str::trim) {
        Some(e) if !e.is_empty() => normalize_email(e),
        _ => return Err(AccountError::MissingEmail),
    };

    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AccountError::EmailTaken(email));
    }

    let new_user = NewUser {
        name: extra.name,
        is_active: extra.is_active,
        is_staff: extra.is_staff,
        is_superuser: extra.is_superuser,
        ..NewUser::with_password(email, password)?
    };
    // the unique index still decides a registration race; see `From<anyhow::Error>`
    let user = store.insert_user(new_user).await?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

pub async fn create_superuser(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AccountError> {
    let mut user = create_user(store, Some(email), password, UserExtra::default()).await?;
    user.is_staff = true;
    user.is_superuser = true;
    let user = store.update_user(&user).await?;
    info!(user_id = %user.id, "superuser promoted");
    Ok(user)
}

/// Credential check used by the token endpoint.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AccountError> {
    let email = normalize_email(email);
    let Some(user) = store.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AccountError::InvalidCredentials);
    };
    if !user.check_password(password) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AccountError::InvalidCredentials);
    }
    if !user.is_active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err(AccountError::Inactive);
    }
    Ok(user)
}
