use anyhow::Context;
use axum::async_trait;
use uuid::Uuid;

use super::repo_types::{NewUser, User};
use crate::db::PgStore;

/// Another account already holds this (normalized) email.
#[derive(Debug, thiserror::Error)]
#[error("email already registered: {0}")]
pub struct DuplicateEmail(pub String);

/// Turns a `users_email_key` violation into [`DuplicateEmail`].
fn map_unique_email(err: sqlx::Error, email: &str, action: &'static str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            anyhow::Error::new(DuplicateEmail(email.to_string()))
        }
        _ => anyhow::Error::new(err).context(action),
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by (already normalized) email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User>;
    /// Persist every mutable column of `user`.
    ///
    /// Both writes fail with [`DuplicateEmail`] when the email is already taken.
    async fn update_user(&self, user: &User) -> anyhow::Result<User>;
}

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, created_at";

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, name, password_hash, is_active, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_email(e, &user.email, "insert user"))?;
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email = $2, name = $3, password_hash = $4,
                   is_active = $5, is_staff = $6, is_superuser = $7
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_email(e, &user.email, "update user"))?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser::with_password(email.to_string(), "testpassword").expect("hash")
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn insert_and_find(pool: PgPool) {
        let store = PgStore { pool };
        let user = store.insert_user(new_user("cook@example.com")).await.unwrap();
        assert!(user.is_active);

        let by_email = store.find_by_email("cook@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));
        let by_id = store.find_by_id(user.id).await.unwrap().expect("row");
        assert!(by_id.check_password("testpassword"));
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn duplicate_email_is_typed(pool: PgPool) {
        let store = PgStore { pool };
        store.insert_user(new_user("dup@example.com")).await.unwrap();
        let err = store
            .insert_user(new_user("dup@example.com"))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<DuplicateEmail>().map(|d| d.0.as_str()),
            Some("dup@example.com")
        );

        let mut other = store.insert_user(new_user("other@example.com")).await.unwrap();
        other.email = "dup@example.com".into();
        let err = store.update_user(&other).await.unwrap_err();
        assert!(err.downcast_ref::<DuplicateEmail>().is_some());
    }

    #[sqlx::test]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn update_persists_mutable_columns(pool: PgPool) {
        let store = PgStore { pool };
        let mut user = store.insert_user(new_user("cook@example.com")).await.unwrap();
        user.name = "Cook".into();
        user.is_staff = true;
        user.set_password("another-password").unwrap();
        store.update_user(&user).await.unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().expect("row");
        assert_eq!(stored.name, "Cook");
        assert!(stored.is_staff);
        assert!(stored.check_password("another-password"));
    }
}
