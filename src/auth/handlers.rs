use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        check_email, check_password, AuthResponse, LoginRequest, PublicUser, RefreshRequest,
        RegisterRequest, UpdateMeRequest,
    },
    extractors::CurrentUser,
    jwt::JwtKeys,
    repo_types::User,
    services::{authenticate, create_user, normalize_email, AccountError, UserExtra},
};
use crate::{
    error::{AppError, FieldErrors},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/token", post(login))
        .route("/users/token/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let Json(payload) = payload?;
    let (email, password) = payload.validate().map_err(AppError::Validation)?;

    let extra = UserExtra {
        name: payload.name.trim().to_string(),
        ..UserExtra::default()
    };
    let user = create_user(state.users.as_ref(), Some(email), password, extra).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let user = authenticate(state.users.as_ref(), &payload.email, &payload.password).await?;

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = active_user(&state, claims.sub).await?;

    // Issue new pair
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    payload: Result<Json<UpdateMeRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Json(payload) = payload?;

    let mut errors = FieldErrors::new();
    if let Some(email) = payload.email.as_deref() {
        check_email(&mut errors, email);
    }
    if let Some(password) = payload.password.as_deref() {
        check_password(&mut errors, password);
    }
    if let Some(name) = payload.name.as_deref() {
        if name.chars().count() > 255 {
            errors.add("name", "Ensure this field has no more than 255 characters.");
        }
    }
    errors.into_result()?;

    if let Some(email) = payload.email.as_deref() {
        let email = normalize_email(email);
        if email != user.email {
            if state.users.find_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict(format!(
                    "user with email {email} already exists"
                )));
            }
            user.email = email;
        }
    }
    if let Some(name) = payload.name {
        user.name = name.trim().to_string();
    }
    if let Some(password) = payload.password.as_deref() {
        user.set_password(password)?;
    }

    // a concurrent change can still claim the email between the lookup and the write
    let user = state
        .users
        .update_user(&user)
        .await
        .map_err(AccountError::from)?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(user.into()))
}

/// Loads a refresh token's subject, treating vanished or disabled accounts as unauthenticated.
async fn active_user(state: &AppState, user_id: uuid::Uuid) -> Result<User, AppError> {
    match state.users.find_by_id(user_id).await? {
        Some(user) if user.is_active => Ok(user),
        _ => {
            warn!(user_id = %user_id, "token for unknown or inactive user");
            Err(AppError::Unauthorized("User not found".into()))
        }
    }
}
