use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::User;
use crate::error::FieldErrors;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Request body for the token endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Partial update of the caller's own account.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMeRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Response returned after login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

pub(crate) fn check_email(errors: &mut FieldErrors, email: &str) {
    if email.trim().is_empty() {
        errors.add("email", "This field may not be blank.");
    } else if !super::services::is_valid_email(email.trim()) {
        errors.add("email", "Enter a valid email address.");
    }
}

pub(crate) fn check_password(errors: &mut FieldErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
        );
    }
}

impl RegisterRequest {
    /// Returns `(email, password)` once both are present and well formed.
    pub fn validate(&self) -> Result<(&str, &str), FieldErrors> {
        let mut errors = FieldErrors::new();
        match self.email.as_deref() {
            None => errors.add("email", "This field is required."),
            Some(email) => check_email(&mut errors, email),
        }
        match self.password.as_deref() {
            None => errors.add("password", "This field is required."),
            Some(password) => check_password(&mut errors, password),
        }
        if self.name.chars().count() > 255 {
            errors.add("name", "Ensure this field has no more than 255 characters.");
        }
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) if errors.is_empty() => Ok((email, password)),
            _ => Err(errors),
        }
    }
}
