use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};

use crate::http_server::auth::AdminUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::{Json, Path};
use crate::http_server::state::AppState;
use crate::services::auth::UserDto;
use crate::services::auth::admin::{InvitationDto, InvitationInput};

async fn invitations(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<InvitationDto>>> {
    Ok(Json(state.admin.invitations().await?))
}

async fn invite(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(input): Json<InvitationInput>,
) -> ApiResult<(StatusCode, Json<InvitationDto>)> {
    let invitation = state.admin.create_invitation(&input.email).await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

async fn delete_invitation(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.admin.delete_invitation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<UserDto>>> {
    Ok(Json(state.admin.users().await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.admin.delete_user(admin.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/invitations", get(invitations).post(invite))
        .route("/api/admin/invitations/{id}", delete(delete_invitation))
        .route("/api/admin/users", get(users))
        .route("/api/admin/users/{id}", delete(delete_user))
}
