use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use crate::http_server::auth::AuthenticatedUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::{Json, Path, Query};
use crate::http_server::state::AppState;
use crate::repository::PagedResult;
use crate::services::music_release::filter::MusicReleaseFilter;
use crate::services::music_release::statistics::ReleaseStatistics;
use crate::services::music_release::types::{
    MusicReleaseDto, MusicReleaseInput, PlayDto, Suggestion,
};

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(filter): Query<MusicReleaseFilter>,
) -> ApiResult<Json<PagedResult<MusicReleaseDto>>> {
    Ok(Json(state.releases.list(user.id, &filter).await?))
}

async fn get_one(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<MusicReleaseDto>> {
    Ok(Json(state.releases.get(user.id, id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(input): Json<MusicReleaseInput>,
) -> ApiResult<(StatusCode, Json<MusicReleaseDto>)> {
    let created = state.releases.create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<MusicReleaseInput>,
) -> ApiResult<Json<MusicReleaseDto>> {
    Ok(Json(state.releases.update(user.id, id, input).await?))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.releases.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn statistics(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ReleaseStatistics>> {
    Ok(Json(state.releases.statistics(user.id).await?))
}

async fn random(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> ApiResult<Json<MusicReleaseDto>> {
    Ok(Json(state.releases.random(user.id).await?))
}

async fn suggestions(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<SuggestionQuery>,
) -> ApiResult<Json<Vec<Suggestion>>> {
    Ok(Json(state.releases.suggestions(user.id, &query.q).await?))
}

async fn plays(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<PlayDto>>> {
    Ok(Json(state.releases.plays(user.id, id).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/musicreleases", get(list).post(create))
        .route("/api/musicreleases/statistics", get(statistics))
        .route("/api/musicreleases/random", get(random))
        .route("/api/musicreleases/suggestions", get(suggestions))
        .route(
            "/api/musicreleases/{id}",
            get(get_one).put(update).delete(delete),
        )
        .route("/api/musicreleases/{id}/plays", get(plays))
}
