use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{AttrListQuery, AttrPayload, AttrResponse},
    repo_types::AttrKind,
};
use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

pub fn attr_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
}

#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<AttrListQuery>,
) -> Result<Json<Vec<AttrResponse>>, AppError> {
    list_for(&state, AttrKind::Tag, user_id, &q).await
}

#[instrument(skip(state, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<AttrPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<AttrResponse>), AppError> {
    create_for(&state, AttrKind::Tag, user_id, payload).await
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<AttrListQuery>,
) -> Result<Json<Vec<AttrResponse>>, AppError> {
    list_for(&state, AttrKind::Ingredient, user_id, &q).await
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<AttrPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<AttrResponse>), AppError> {
    create_for(&state, AttrKind::Ingredient, user_id, payload).await
}

async fn list_for(
    state: &AppState,
    kind: AttrKind,
    user_id: uuid::Uuid,
    q: &AttrListQuery,
) -> Result<Json<Vec<AttrResponse>>, AppError> {
    let rows = state
        .attributes
        .list_attrs(kind, user_id, q.assigned_only())
        .await?;
    Ok(Json(rows.into_iter().map(AttrResponse::from).collect()))
}

async fn create_for(
    state: &AppState,
    kind: AttrKind,
    user_id: uuid::Uuid,
    payload: Result<Json<AttrPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<AttrResponse>), AppError> {
    let Json(payload) = payload?;
    let name = payload.validate().map_err(AppError::Validation)?;
    let row = state.attributes.insert_attr(kind, user_id, &name).await?;
    info!(%user_id, id = %row.id, table = kind.table(), "created");
    Ok((StatusCode::CREATED, Json(row.into())))
}
