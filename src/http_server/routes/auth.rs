use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};

use crate::http_server::auth::AuthenticatedUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::Json;
use crate::http_server::state::AppState;
use crate::services::auth::{LoginRequest, LoginResponse, UserDto};

async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    Ok(Json(state.auth.login(&request.id_token).await?))
}

async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<UserDto>> {
    Ok(Json(state.auth.me(user.id).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/google/login", post(google_login))
        .route("/api/auth/me", get(me))
}
