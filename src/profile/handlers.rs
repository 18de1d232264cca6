use axum::{
    extract::{Multipart, State},
    routing::{post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser, repo_types::User},
    error::{AppError, AppResult},
    profile::dto::{ImageUrlResponse, UpdateProfileRequest},
    state::AppState,
    storage::avatar_key,
};

const PRESIGN_TTL_SECS: u64 = 30 * 60;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/update", put(update))
        .route("/update-profile-picture", post(update_profile_picture))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<MessageResponse>> {
    let (fname, lname, age) = match (payload.fname, payload.lname, payload.age) {
        (Some(f), Some(l), Some(a)) => (f, l, a),
        _ => {
            warn!(user_id = %user_id, "profile update missing fields");
            return Err(AppError::Validation(
                "First name, last name and age are required".into(),
            ));
        }
    };

    let modified = User::update_profile(&state.db, user_id, &fname, &lname, age).await?;
    if !modified {
        return Err(AppError::Validation("Profile update failed".into()));
    }

    info!(user_id = %user_id, "profile updated");
    Ok(Json(MessageResponse {
        message: "Profile updated successfully.".into(),
    }))
}

#[instrument(skip(state, multipart))]
pub async fn update_profile_picture(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<ImageUrlResponse>> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
        .ok_or_else(|| AppError::Validation("No file uploaded".into()))?;

    let content_type = field
        .content_type()
        .map(|ct| ct.to_string())
        .ok_or_else(|| AppError::Validation("No file uploaded".into()))?;

    let key = avatar_key(user_id, &content_type)
        .ok_or_else(|| AppError::Validation("Unsupported image type".into()))?;

    let body = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
    if body.is_empty() {
        return Err(AppError::Validation("No file uploaded".into()));
    }

    state
        .storage
        .put_object(&key, body, &content_type)
        .await
        .map_err(|e| AppError::Internal(e.context("store profile picture")))?;

    let persisted = User::set_profile_picture(&state.db, user_id, &key).await?;
    if !persisted {
        return Err(AppError::Validation(
            "Failed to update profile picture".into(),
        ));
    }

    let image_url = state
        .storage
        .presign_get(&key, PRESIGN_TTL_SECS)
        .await
        .map_err(|e| AppError::Internal(e.context("presign profile picture")))?;

    info!(user_id = %user_id, key = %key, "profile picture updated");
    Ok(Json(ImageUrlResponse { image_url }))
}
