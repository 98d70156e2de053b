use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};

use crate::error::CatalogError;
use crate::http_server::error::ApiError;
use crate::http_server::state::AppState;

/// The signed-in user, taken from the `Authorization: Bearer` header.
/// Handlers that take this extractor are the protected ones.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthenticated("Missing bearer token".into()))?;

        let user = state
            .auth
            .authenticate(bearer.token())
            .await
            .map_err(|err| match err {
                CatalogError::Authorization(message) => ApiError::Unauthenticated(message),
                other => ApiError::Catalog(other),
            })?;

        let user = AuthenticatedUser {
            id: user.id,
            email: user.email,
            is_admin: user.is_admin,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// An [`AuthenticatedUser`] with the administrator flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(CatalogError::Authorization("Administrator access required".into()).into());
        }
        Ok(AdminUser(user))
    }
}
