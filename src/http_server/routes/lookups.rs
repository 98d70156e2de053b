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
use crate::repository::{PageRequest, PagedResult};
use crate::services::lookup::{LookupInput, LookupItem};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// CRUD handlers for one lookup table, bound to the `AppState` field
/// holding its service.
macro_rules! lookup_routes {
    ($module:ident, $field:ident, $path:literal) => {
        pub mod $module {
            use super::*;

            async fn list(
                State(state): State<Arc<AppState>>,
                _user: AuthenticatedUser,
                Query(query): Query<LookupQuery>,
            ) -> ApiResult<Json<PagedResult<LookupItem>>> {
                let page = PageRequest {
                    page: query.page,
                    page_size: query.page_size,
                };
                Ok(Json(state.$field.list(query.search.as_deref(), page).await?))
            }

            async fn get_one(
                State(state): State<Arc<AppState>>,
                _user: AuthenticatedUser,
                Path(id): Path<i64>,
            ) -> ApiResult<Json<LookupItem>> {
                Ok(Json(state.$field.get(id).await?))
            }

            async fn create(
                State(state): State<Arc<AppState>>,
                _user: AuthenticatedUser,
                Json(input): Json<LookupInput>,
            ) -> ApiResult<(StatusCode, Json<LookupItem>)> {
                let created = state.$field.create(&input.name).await?;
                Ok((StatusCode::CREATED, Json(created)))
            }

            async fn update(
                State(state): State<Arc<AppState>>,
                _user: AuthenticatedUser,
                Path(id): Path<i64>,
                Json(input): Json<LookupInput>,
            ) -> ApiResult<Json<LookupItem>> {
                Ok(Json(state.$field.update(id, &input.name).await?))
            }

            async fn delete(
                State(state): State<Arc<AppState>>,
                _user: AuthenticatedUser,
                Path(id): Path<i64>,
            ) -> ApiResult<StatusCode> {
                state.$field.delete(id).await?;
                Ok(StatusCode::NO_CONTENT)
            }

            pub fn router() -> Router<Arc<AppState>> {
                Router::new()
                    .route($path, get(list).post(create))
                    .route(concat!($path, "/{id}"), get(get_one).put(update).delete(delete))
            }
        }
    };
}

lookup_routes!(artists, artists, "/api/artists");
lookup_routes!(countries, countries, "/api/countries");
lookup_routes!(formats, formats, "/api/formats");
lookup_routes!(genres, genres, "/api/genres");
lookup_routes!(labels, labels, "/api/labels");
lookup_routes!(packagings, packagings, "/api/packagings");
lookup_routes!(stores, stores, "/api/stores");

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(artists::router())
        .merge(countries::router())
        .merge(formats::router())
        .merge(genres::router())
        .merge(labels::router())
        .merge(packagings::router())
        .merge(stores::router())
}
