use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use serde::Deserialize;

use crate::http_server::auth::AuthenticatedUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::{Json, Path, Query};
use crate::http_server::state::AppState;
use crate::services::now_playing::NowPlayingDto;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayInput {
    pub music_release_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u64>,
}

async fn record(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(input): Json<PlayInput>,
) -> ApiResult<(StatusCode, Json<NowPlayingDto>)> {
    let play = state
        .now_playing
        .record(user.id, input.music_release_id)
        .await?;
    Ok((StatusCode::CREATED, Json(play)))
}

async fn recent(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<RecentQuery>,
) -> ApiResult<Json<Vec<NowPlayingDto>>> {
    Ok(Json(state.now_playing.recent(user.id, query.limit).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.now_playing.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/nowplaying", get(recent).post(record))
        .route("/api/nowplaying/{id}", delete(remove))
}
