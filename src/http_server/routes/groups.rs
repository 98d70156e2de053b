use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};

use crate::http_server::auth::AuthenticatedUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::{Json, Path, Query};
use crate::http_server::state::AppState;
use crate::repository::{PageRequest, PagedResult};
use crate::services::music_release::types::MusicReleaseDto;
use crate::services::release_group::{GroupDto, GroupInput, GroupReleaseInput};

/// Kollections and lists expose the same routes over their own service.
macro_rules! group_routes {
    ($module:ident, $field:ident, $path:literal) => {
        pub mod $module {
            use super::*;

            async fn list(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
            ) -> ApiResult<Json<Vec<GroupDto>>> {
                Ok(Json(state.$field.list(user.id).await?))
            }

            async fn get_one(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
                Path(id): Path<i64>,
            ) -> ApiResult<Json<GroupDto>> {
                Ok(Json(state.$field.get(user.id, id).await?))
            }

            async fn create(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
                Json(input): Json<GroupInput>,
            ) -> ApiResult<(StatusCode, Json<GroupDto>)> {
                let created = state.$field.create(user.id, &input.name).await?;
                Ok((StatusCode::CREATED, Json(created)))
            }

            async fn rename(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
                Path(id): Path<i64>,
                Json(input): Json<GroupInput>,
            ) -> ApiResult<Json<GroupDto>> {
                Ok(Json(state.$field.rename(user.id, id, &input.name).await?))
            }

            async fn remove(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
                Path(id): Path<i64>,
            ) -> ApiResult<StatusCode> {
                state.$field.delete(user.id, id).await?;
                Ok(StatusCode::NO_CONTENT)
            }

            async fn releases(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
                Path(id): Path<i64>,
                Query(page): Query<PageRequest>,
            ) -> ApiResult<Json<PagedResult<MusicReleaseDto>>> {
                Ok(Json(state.$field.releases(user.id, id, page).await?))
            }

            async fn add_release(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
                Path(id): Path<i64>,
                Json(input): Json<GroupReleaseInput>,
            ) -> ApiResult<(StatusCode, Json<GroupDto>)> {
                let group = state
                    .$field
                    .add_release(user.id, id, input.music_release_id)
                    .await?;
                Ok((StatusCode::CREATED, Json(group)))
            }

            async fn remove_release(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
                Path((id, release_id)): Path<(i64, i64)>,
            ) -> ApiResult<StatusCode> {
                state.$field.remove_release(user.id, id, release_id).await?;
                Ok(StatusCode::NO_CONTENT)
            }

            pub(super) async fn containing(
                State(state): State<Arc<AppState>>,
                user: AuthenticatedUser,
                Path(release_id): Path<i64>,
            ) -> ApiResult<Json<Vec<GroupDto>>> {
                Ok(Json(state.$field.containing(user.id, release_id).await?))
            }

            pub fn router() -> Router<Arc<AppState>> {
                Router::new()
                    .route($path, get(list).post(create))
                    .route(concat!($path, "/{id}"), get(get_one).put(rename).delete(remove))
                    .route(concat!($path, "/{id}/releases"), get(releases).post(add_release))
                    .route(
                        concat!($path, "/{id}/releases/{release_id}"),
                        delete(remove_release),
                    )
            }
        }
    };
}

group_routes!(kollections, kollections, "/api/kollections");
group_routes!(lists, lists, "/api/lists");

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(kollections::router())
        .merge(lists::router())
        .route(
            "/api/kollections/by-release/{release_id}",
            get(kollections::containing),
        )
        .route("/api/lists/by-release/{release_id}", get(lists::containing))
}
