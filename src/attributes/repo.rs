use anyhow::Context;
use axum::async_trait;
use uuid::Uuid;

use super::repo_types::{Attr, AttrKind};
use crate::db::PgStore;

#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// The caller's rows ordered by name descending.
    async fn list_attrs(
        &self,
        kind: AttrKind,
        user_id: Uuid,
        assigned_only: bool,
    ) -> anyhow::Result<Vec<Attr>>;

    async fn insert_attr(&self, kind: AttrKind, user_id: Uuid, name: &str)
        -> anyhow::Result<Attr>;

    /// Rows among `ids` owned by `user_id`, ordered by name.
    async fn find_owned_attrs(
        &self,
        kind: AttrKind,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> anyhow::Result<Vec<Attr>>;
}

#[async_trait]
impl AttributeStore for PgStore {
    async fn list_attrs(
        &self,
        kind: AttrKind,
        user_id: Uuid,
        assigned_only: bool,
    ) -> anyhow::Result<Vec<Attr>> {
        let sql = format!(
            r#"
            SELECT a.id, a.user_id, a.name
              FROM {table} a
             WHERE a.user_id = $1
               AND ($2 = FALSE OR EXISTS (
                       SELECT 1 FROM {join} j WHERE j.{column} = a.id))
             ORDER BY a.name DESC
            "#,
            table = kind.table(),
            join = kind.join_table(),
            column = kind.join_column(),
        );
        let rows = sqlx::query_as::<_, Attr>(&sql)
            .bind(user_id)
            .bind(assigned_only)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("list {}", kind.table()))?;
        Ok(rows)
    }

    async fn insert_attr(
        &self,
        kind: AttrKind,
        user_id: Uuid,
        name: &str,
    ) -> anyhow::Result<Attr> {
        let sql = format!(
            "INSERT INTO {} (id, user_id, name) VALUES ($1, $2, $3) RETURNING id, user_id, name",
            kind.table()
        );
        let row = sqlx::query_as::<_, Attr>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("insert into {}", kind.table()))?;
        Ok(row)
    }

    async fn find_owned_attrs(
        &self,
        kind: AttrKind,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> anyhow::Result<Vec<Attr>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, user_id, name FROM {} WHERE user_id = $1 AND id = ANY($2) ORDER BY name",
            kind.table()
        );
        let rows = sqlx::query_as::<_, Attr>(&sql)
            .bind(user_id)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("find {} by id", kind.table()))?;
        Ok(rows)
    }
}
