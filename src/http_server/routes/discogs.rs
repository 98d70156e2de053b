use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::http_server::auth::AuthenticatedUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::{Json, Path, Query};
use crate::http_server::state::AppState;
use crate::ports::discogs::DiscogsSearchResult;
use crate::services::discogs::{CollectionImportRequest, DiscogsSearchQuery, ImportSummary};
use crate::services::music_release::types::MusicReleaseDto;

/// Runs the whole collection import inside the request and answers with
/// the final summary.
async fn import_collection(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(request): Json<CollectionImportRequest>,
) -> ApiResult<Json<ImportSummary>> {
    Ok(Json(
        state
            .discogs
            .import_collection(user.id, &request.username)
            .await?,
    ))
}

async fn import_release(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(discogs_id): Path<i64>,
) -> ApiResult<(StatusCode, Json<MusicReleaseDto>)> {
    let release = state.discogs.import_release(user.id, discogs_id).await?;
    Ok((StatusCode::CREATED, Json(release)))
}

async fn search(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<DiscogsSearchQuery>,
) -> ApiResult<Json<Vec<DiscogsSearchResult>>> {
    Ok(Json(state.discogs.search(&query.catalog_number).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/import/discogs", post(import_collection))
        .route("/api/import/discogs/search", get(search))
        .route(
            "/api/import/discogs/releases/{discogs_id}",
            post(import_release),
        )
}
