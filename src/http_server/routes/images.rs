use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use crate::error::CatalogError;
use crate::http_server::auth::AuthenticatedUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::{Json, Path};
use crate::http_server::state::AppState;
use crate::services::images::StoredImage;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default, alias = "fileName")]
    pub filename: Option<String>,
}

/// Public so `<img>` tags can load covers without a token.
async fn read(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (bytes, mime_type) = state
        .images
        .read(&file_name)
        .await
        .map_err(CatalogError::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, mime_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        bytes,
    ))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(file_name): Path<String>,
) -> ApiResult<StatusCode> {
    let deleted = state
        .images
        .delete(&file_name)
        .await
        .map_err(CatalogError::from)?;
    if !deleted {
        return Err(CatalogError::NotFound(format!("Image {file_name} not found")).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn download(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(request): Json<DownloadRequest>,
) -> ApiResult<(StatusCode, Json<StoredImage>)> {
    let stored = state
        .images
        .download(&request.url, request.filename.as_deref())
        .await
        .map_err(CatalogError::from)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/images/download", post(download))
        .route("/api/images/{file_name}", get(read).delete(remove))
}
