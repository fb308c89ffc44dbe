use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        RecipeDetailResponse, RecipeImageResponse, RecipeListQuery, RecipePayload,
        RecipeResponse,
    },
    repo_types::{RecipeFields, RecipeRecord},
};
use crate::{
    attributes::{dto::AttrResponse, repo_types::AttrKind},
    auth::extractors::AuthUser,
    error::{AppError, FieldErrors},
    images::services::{ext_from_mime, image_url, is_image, store_recipe_image, UploadItem},
    state::AppState,
};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe)
                .put(replace_recipe)
                .patch(update_recipe)
                .delete(delete_recipe),
        )
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/:id/upload-image", post(upload_image))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeResponse>>, AppError> {
    let filter = q.into_filter().map_err(AppError::Validation)?;
    let rows = state.recipes.list_recipes(user_id, &filter).await?;
    Ok(Json(rows.into_iter().map(RecipeResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeResponse>), AppError> {
    let Json(payload) = payload?;
    let fields = payload.into_new().map_err(AppError::Validation)?;
    check_associations(&state, user_id, &fields).await?;

    let record = state.recipes.insert_recipe(user_id, &fields).await?;
    info!(%user_id, recipe_id = %record.recipe.id, "recipe created");
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let record = state
        .recipes
        .get_recipe(user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(detail(&state, user_id, record).await?))
}

/// PUT: title, time and price are required; omitted link and associations stay as stored.
#[instrument(skip(state, payload))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> Result<Json<RecipeResponse>, AppError> {
    let Json(payload) = payload?;
    let current = state
        .recipes
        .get_recipe(user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let fields = payload
        .into_replacement(&current)
        .map_err(AppError::Validation)?;
    save(&state, user_id, id, fields).await
}

/// PATCH: omitted fields keep their current value.
#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<RecipePayload>, JsonRejection>,
) -> Result<Json<RecipeResponse>, AppError> {
    let Json(payload) = payload?;
    let current = state
        .recipes
        .get_recipe(user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    let fields = payload
        .into_patch(&current)
        .map_err(AppError::Validation)?;
    save(&state, user_id, id, fields).await
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let recipe = state
        .recipes
        .delete_recipe(user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;
    if let Some(key) = recipe.image.as_deref() {
        if let Err(e) = state.storage.delete_object(key).await {
            warn!(error = %e, key, "failed to remove image of deleted recipe");
        }
    }
    info!(%user_id, recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipes/:id/upload-image (multipart, field `image`)
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<RecipeImageResponse>, AppError> {
    let current = state
        .recipes
        .get_recipe(user_id, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload.{}", ext_from_mime(&content_type).unwrap_or("bin")));
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        upload = Some((filename, content_type, body));
    }

    let Some((filename, content_type, body)) = upload else {
        return Err(AppError::field("image", "No file was submitted."));
    };
    if !is_image(&content_type) || body.is_empty() {
        return Err(AppError::field(
            "image",
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        ));
    }

    let key = store_recipe_image(
        state.storage.as_ref(),
        UploadItem {
            filename: &filename,
            body,
            content_type: &content_type,
        },
    )
    .await?;

    let Some(record) = state.recipes.set_recipe_image(user_id, id, &key).await? else {
        // recipe vanished between lookup and update
        if let Err(e) = state.storage.delete_object(&key).await {
            warn!(error = %e, key = %key, "failed to remove orphaned upload");
        }
        return Err(AppError::NotFound);
    };

    if let Some(old) = current.recipe.image.as_deref() {
        if let Err(e) = state.storage.delete_object(old).await {
            warn!(error = %e, key = old, "failed to remove replaced image");
        }
    }

    info!(%user_id, recipe_id = %id, key = %key, "recipe image uploaded");
    let image = image_url(state.storage.as_ref(), record.recipe.image.as_deref()).await?;
    Ok(Json(RecipeImageResponse {
        id: record.recipe.id,
        image,
    }))
}

async fn save(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    fields: RecipeFields,
) -> Result<Json<RecipeResponse>, AppError> {
    check_associations(state, user_id, &fields).await?;
    let record = state
        .recipes
        .update_recipe(user_id, id, &fields)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(%user_id, recipe_id = %id, "recipe updated");
    Ok(Json(record.into()))
}

/// Association ids must name tags/ingredients the caller owns.
async fn check_associations(
    state: &AppState,
    user_id: Uuid,
    fields: &RecipeFields,
) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    for (kind, ids) in [
        (AttrKind::Tag, &fields.tag_ids),
        (AttrKind::Ingredient, &fields.ingredient_ids),
    ] {
        let found = state.attributes.find_owned_attrs(kind, user_id, ids).await?;
        for id in ids {
            if !found.iter().any(|a| a.id == *id) {
                errors.add(
                    kind.field(),
                    format!("Invalid pk \"{id}\" - object does not exist."),
                );
            }
        }
    }
    errors.into_result()
}

async fn detail(
    state: &AppState,
    user_id: Uuid,
    record: RecipeRecord,
) -> Result<RecipeDetailResponse, AppError> {
    let tags = state
        .attributes
        .find_owned_attrs(AttrKind::Tag, user_id, &record.tag_ids)
        .await?;
    let ingredients = state
        .attributes
        .find_owned_attrs(AttrKind::Ingredient, user_id, &record.ingredient_ids)
        .await?;
    let image = image_url(state.storage.as_ref(), record.recipe.image.as_deref()).await?;

    let recipe = record.recipe;
    Ok(RecipeDetailResponse {
        id: recipe.id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        link: recipe.link,
        tags: tags.into_iter().map(AttrResponse::from).collect(),
        ingredients: ingredients.into_iter().map(AttrResponse::from).collect(),
        image,
    })
}
