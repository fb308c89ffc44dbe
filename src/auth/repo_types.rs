use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String, // normalized, unique
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: OffsetDateTime,
}

impl User {
    /// True when `plain` matches the stored hash. A corrupt hash counts as a mismatch.
    pub fn check_password(&self, plain: &str) -> bool {
        let parsed = match PasswordHash::new(&self.password_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(user_id = %self.id, error = %e, "stored password hash unreadable");
                return false;
            }
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }

    /// Replaces the stored hash; the caller still has to persist the row.
    pub fn set_password(&mut self, plain: &str) -> anyhow::Result<()> {
        self.password_hash = hash(plain)?;
        Ok(())
    }
}

/// Everything needed to insert a user row; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUser {
    /// An active, unprivileged account whose password is hashed up front.
    pub fn with_password(email: String, plain: &str) -> anyhow::Result<Self> {
        Ok(Self {
            email,
            password_hash: hash(plain)?,
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        })
    }
}

fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("argon2 hash_password: {e}"))?
        .to_string();
    Ok(hash)
}
