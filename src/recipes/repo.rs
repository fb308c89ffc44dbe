use std::collections::HashMap;

use anyhow::Context;
use axum::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Recipe, RecipeFields, RecipeFilter, RecipeRecord};
use crate::{attributes::repo_types::AttrKind, db::PgStore};

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// The caller's recipes, newest first.
    async fn list_recipes(
        &self,
        user_id: Uuid,
        filter: &RecipeFilter,
    ) -> anyhow::Result<Vec<RecipeRecord>>;

    async fn get_recipe(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<RecipeRecord>>;

    async fn insert_recipe(
        &self,
        user_id: Uuid,
        fields: &RecipeFields,
    ) -> anyhow::Result<RecipeRecord>;

    /// `None` when the recipe does not exist or belongs to someone else.
    async fn update_recipe(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &RecipeFields,
    ) -> anyhow::Result<Option<RecipeRecord>>;

    /// Returns the deleted row so its image can be cleaned up.
    async fn delete_recipe(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Recipe>>;

    async fn set_recipe_image(
        &self,
        user_id: Uuid,
        id: Uuid,
        image: &str,
    ) -> anyhow::Result<Option<RecipeRecord>>;
}

const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price, link, image, created_at";

#[async_trait]
impl RecipeStore for PgStore {
    async fn list_recipes(
        &self,
        user_id: Uuid,
        filter: &RecipeFilter,
    ) -> anyhow::Result<Vec<RecipeRecord>> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            SELECT {RECIPE_COLUMNS}
              FROM recipes r
             WHERE r.user_id = $1
               AND (cardinality($2::uuid[]) = 0 OR EXISTS (
                       SELECT 1 FROM recipe_tags rt
                        WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
               AND (cardinality($3::uuid[]) = 0 OR EXISTS (
                       SELECT 1 FROM recipe_ingredients ri
                        WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
             ORDER BY r.created_at DESC, r.id
            "#
        ))
        .bind(user_id)
        .bind(filter.tag_ids.as_slice())
        .bind(filter.ingredient_ids.as_slice())
        .fetch_all(&self.pool)
        .await
        .context("list recipes")?;

        attach_links(&self.pool, recipes).await
    }

    async fn get_recipe(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<RecipeRecord>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("get recipe")?;

        match recipe {
            Some(recipe) => Ok(attach_links(&self.pool, vec![recipe]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_recipe(
        &self,
        user_id: Uuid,
        fields: &RecipeFields,
    ) -> anyhow::Result<RecipeRecord> {
        let mut tx = self.pool.begin().await.context("begin tx")?;
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (id, user_id, title, time_minutes, price, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&fields.title)
        .bind(fields.time_minutes)
        .bind(fields.price)
        .bind(&fields.link)
        .fetch_one(&mut *tx)
        .await
        .context("insert recipe")?;

        replace_links_tx(&mut tx, recipe.id, AttrKind::Tag, &fields.tag_ids).await?;
        replace_links_tx(&mut tx, recipe.id, AttrKind::Ingredient, &fields.ingredient_ids).await?;
        tx.commit().await.context("commit tx")?;

        Ok(RecipeRecord {
            recipe,
            tag_ids: fields.tag_ids.clone(),
            ingredient_ids: fields.ingredient_ids.clone(),
        })
    }

    async fn update_recipe(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: &RecipeFields,
    ) -> anyhow::Result<Option<RecipeRecord>> {
        let mut tx = self.pool.begin().await.context("begin tx")?;
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            UPDATE recipes
               SET title = $3, time_minutes = $4, price = $5, link = $6
             WHERE id = $1 AND user_id = $2
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(&fields.title)
        .bind(fields.time_minutes)
        .bind(fields.price)
        .bind(&fields.link)
        .fetch_optional(&mut *tx)
        .await
        .context("update recipe")?;

        let Some(recipe) = recipe else {
            return Ok(None);
        };
        replace_links_tx(&mut tx, recipe.id, AttrKind::Tag, &fields.tag_ids).await?;
        replace_links_tx(&mut tx, recipe.id, AttrKind::Ingredient, &fields.ingredient_ids).await?;
        tx.commit().await.context("commit tx")?;

        Ok(Some(RecipeRecord {
            recipe,
            tag_ids: fields.tag_ids.clone(),
            ingredient_ids: fields.ingredient_ids.clone(),
        }))
    }

    async fn delete_recipe(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("delete recipe")?;
        Ok(recipe)
    }

    async fn set_recipe_image(
        &self,
        user_id: Uuid,
        id: Uuid,
        image: &str,
    ) -> anyhow::Result<Option<RecipeRecord>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(image)
        .fetch_optional(&self.pool)
        .await
        .context("set recipe image")?;

        match recipe {
            Some(recipe) => Ok(attach_links(&self.pool, vec![recipe]).await?.pop()),
            None => Ok(None),
        }
    }
}

/// Replace the association set of one kind within a transaction.
async fn replace_links_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    kind: AttrKind,
    ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.join_table()
    ))
    .bind(recipe_id)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("clear {}", kind.join_table()))?;

    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query(&format!(
        "INSERT INTO {} (recipe_id, {}) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        kind.join_table(),
        kind.join_column()
    ))
    .bind(recipe_id)
    .bind(ids)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("link {}", kind.join_table()))?;
    Ok(())
}

async fn load_links(
    pool: &PgPool,
    kind: AttrKind,
    recipe_ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, Vec<Uuid>>> {
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as::<_, (Uuid, Uuid)>(&format!(
        "SELECT recipe_id, {} FROM {} WHERE recipe_id = ANY($1)",
        kind.join_column(),
        kind.join_table()
    ))
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .with_context(|| format!("load {}", kind.join_table()))?;

    let mut out: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (recipe_id, attr_id) in rows {
        out.entry(recipe_id).or_default().push(attr_id);
    }
    Ok(out)
}

async fn attach_links(pool: &PgPool, recipes: Vec<Recipe>) -> anyhow::Result<Vec<RecipeRecord>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let mut tags = load_links(pool, AttrKind::Tag, &ids).await?;
    let mut ingredients = load_links(pool, AttrKind::Ingredient, &ids).await?;

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeRecord {
            tag_ids: tags.remove(&recipe.id).unwrap_or_default(),
            ingredient_ids: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}
