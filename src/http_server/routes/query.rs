use std::sync::Arc;

use axum::{Router, extract::State, routing::post};

use crate::http_server::auth::AuthenticatedUser;
use crate::http_server::error::ApiResult;
use crate::http_server::extract::Json;
use crate::http_server::state::AppState;
use crate::repository::PageRequest;
use crate::services::query::{AskRequest, QueryAnswer};

async fn ask(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(request): Json<AskRequest>,
) -> ApiResult<Json<QueryAnswer>> {
    let page = PageRequest {
        page: request.page,
        page_size: request.page_size,
    };
    Ok(Json(state.query.ask(user.id, &request.question, page).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/query/ask", post(ask))
}
