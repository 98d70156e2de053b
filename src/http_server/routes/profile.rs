use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    routing::{delete, get},
};

use crate::http_server::auth::AuthenticatedUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::Json;
use crate::http_server::state::AppState;
use crate::services::user_profile::{BulkDeleteSummary, UserProfileDto, UserProfileInput};

async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<UserProfileDto>> {
    Ok(Json(state.profiles.get(user.id).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(input): Json<UserProfileInput>,
) -> ApiResult<Json<UserProfileDto>> {
    Ok(Json(state.profiles.update(user.id, input).await?))
}

async fn delete_all_releases(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<BulkDeleteSummary>> {
    Ok(Json(
        state.profiles.delete_all_user_music_releases(user.id).await?,
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/profile/releases", delete(delete_all_releases))
}
