pub mod admin;
pub mod google;
pub mod token;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::database::Database;
use crate::entities::{application_user, user_invitation};
use crate::error::{CatalogError, CatalogResult};
use crate::ports::google::{GoogleIdentity, GoogleTokenVerifier};
use crate::repository::UnitOfWork;

pub use admin::AdminService;
pub use token::{Claims, TokenService};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<application_user::Model> for UserDto {
    fn from(user: application_user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            is_admin: user.is_admin,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub id_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Invitation-gated Google sign-in.
pub struct AuthService {
    db: Arc<Database>,
    tokens: Arc<TokenService>,
    google: Arc<dyn GoogleTokenVerifier>,
}

impl AuthService {
    pub fn new(
        db: Arc<Database>,
        tokens: Arc<TokenService>,
        google: Arc<dyn GoogleTokenVerifier>,
    ) -> Self {
        Self { db, tokens, google }
    }

    /// Exchanges a Google ID token for a catalog token. Unknown accounts
    /// need an unused invitation for their email, except the very first
    /// account, which becomes the administrator.
    #[instrument(skip_all)]
    pub async fn login(&self, id_token: &str) -> CatalogResult<LoginResponse> {
        if id_token.trim().is_empty() {
            return Err(CatalogError::Validation("idToken is required".into()));
        }
        let identity = self.google.verify(id_token).await.map_err(|err| {
            warn!("Google token verification failed: {err:?}");
            CatalogError::Authorization("Google sign-in could not be verified".into())
        })?;

        let mut uow = self.db.unit_of_work();
        let existing = uow
            .repository::<application_user::Entity>()
            .first(
                Some(
                    Condition::all()
                        .add(application_user::Column::GoogleSub.eq(identity.subject.as_str())),
                ),
                &[],
            )
            .await?;

        let user = match existing {
            Some(user) => {
                let mut active = user.into_active_model();
                active.email = Set(normalize_email(&identity.email));
                if identity.name.is_some() {
                    active.display_name = Set(identity.name.clone());
                }
                active.last_login_at = Set(Some(Utc::now()));
                uow.repository::<application_user::Entity>()
                    .update(active)
                    .await?
            }
            None => {
                uow.begin_transaction().await?;
                match Self::register(&uow, &identity).await {
                    Ok(user) => {
                        uow.commit().await?;
                        user
                    }
                    Err(err) => {
                        uow.rollback().await?;
                        return Err(err);
                    }
                }
            }
        };

        let token = self.tokens.issue(&user)?;
        Ok(LoginResponse {
            token,
            user: user.into(),
        })
    }

    async fn register(
        uow: &UnitOfWork,
        identity: &GoogleIdentity,
    ) -> CatalogResult<application_user::Model> {
        let email = normalize_email(&identity.email);
        let is_first = !uow
            .repository::<application_user::Entity>()
            .any(None)
            .await?;

        if !is_first {
            let invitation = uow
                .repository::<user_invitation::Entity>()
                .first(
                    Some(
                        Condition::all()
                            .add(user_invitation::Column::Email.eq(email.as_str()))
                            .add(user_invitation::Column::IsUsed.eq(false)),
                    ),
                    &[],
                )
                .await?
                .ok_or_else(|| {
                    CatalogError::Authorization(format!("No open invitation for {email}"))
                })?;

            let mut active = invitation.into_active_model();
            active.is_used = Set(true);
            active.used_at = Set(Some(Utc::now()));
            uow.repository::<user_invitation::Entity>()
                .update(active)
                .await?;
        }

        let now = Utc::now();
        let user = uow
            .repository::<application_user::Entity>()
            .add(application_user::ActiveModel {
                google_sub: Set(identity.subject.clone()),
                email: Set(email),
                display_name: Set(identity.name.clone()),
                is_admin: Set(is_first),
                created_at: Set(now),
                last_login_at: Set(Some(now)),
                ..Default::default()
            })
            .await?;
        if is_first {
            info!("Bootstrapped {} as the first administrator", user.email);
        } else {
            info!("Registered invited user {}", user.email);
        }
        Ok(user)
    }

    pub async fn me(&self, user_id: i64) -> CatalogResult<UserDto> {
        let uow = self.db.unit_of_work();
        uow.repository::<application_user::Entity>()
            .get_by_id(user_id)
            .await?
            .map(UserDto::from)
            .ok_or_else(|| CatalogError::not_found("User", user_id))
    }

    /// Checks a bearer token and that its user still exists.
    pub async fn authenticate(&self, token: &str) -> CatalogResult<application_user::Model> {
        let claims = self.tokens.verify(token)?;
        let user_id = claims.user_id()?;
        let uow = self.db.unit_of_work();
        uow.repository::<application_user::Entity>()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| CatalogError::Authorization("User no longer exists".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::ports::google::MockGoogleTokenVerifier;
    use crate::test_utils::{insert_user, test_db};
    use sea_orm::EntityTrait;

    fn verifier_for(subject: &'static str, email: &'static str) -> MockGoogleTokenVerifier {
        let mut google = MockGoogleTokenVerifier::new();
        google.expect_verify().returning(move |_| {
            Ok(GoogleIdentity {
                subject: subject.to_string(),
                email: email.to_string(),
                name: Some("Listener".to_string()),
            })
        });
        google
    }

    fn service(db: Arc<Database>, google: MockGoogleTokenVerifier) -> AuthService {
        AuthService::new(
            db,
            Arc::new(TokenService::new("test-secret", 1)),
            Arc::new(google),
        )
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let db = test_db().await;
        let auth = service(db, verifier_for("g-1", "First@Example.com"));

        let response = auth.login("token").await.unwrap();
        assert!(response.user.is_admin);
        assert_eq!(response.user.email, "first@example.com");

        let authenticated = auth.authenticate(&response.token).await.unwrap();
        assert_eq!(authenticated.id, response.user.id);
    }

    #[tokio::test]
    async fn test_uninvited_user_is_rejected() {
        let db = test_db().await;
        insert_user(&db, "admin@example.com", true).await;
        let auth = service(db.clone(), verifier_for("g-2", "stranger@example.com"));

        let err = auth.login("token").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::AuthorizationError);

        let users = application_user::Entity::find().all(&db.conn).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_invited_user_is_created_and_invitation_used() {
        let db = test_db().await;
        let admin = insert_user(&db, "admin@example.com", true).await;
        AdminService::new(db.clone(), Arc::new(crate::services::images::ImageStore::new(
            std::env::temp_dir(),
        )))
        .create_invitation("guest@example.com")
        .await
        .unwrap();
        let auth = service(db.clone(), verifier_for("g-3", "Guest@example.com"));

        let response = auth.login("token").await.unwrap();
        assert!(!response.user.is_admin);
        assert_ne!(response.user.id, admin.id);

        let invitation = user_invitation::Entity::find().one(&db.conn).await.unwrap().unwrap();
        assert!(invitation.is_used);
        assert!(invitation.used_at.is_some());

        // Returning users log in without a fresh invitation.
        let again = auth.login("token").await.unwrap();
        assert_eq!(again.user.id, response.user.id);
    }

    #[tokio::test]
    async fn test_failed_verification_is_authorization_error() {
        let db = test_db().await;
        let mut google = MockGoogleTokenVerifier::new();
        google
            .expect_verify()
            .returning(|_| Err(color_eyre::eyre::eyre!("bad token")));
        let auth = service(db, google);

        let err = auth.login("token").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::AuthorizationError);
    }
}
