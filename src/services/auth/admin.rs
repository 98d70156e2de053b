use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, Condition, Order, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::database::Database;
use crate::entities::{application_user, user_invitation};
use crate::error::{CatalogError, CatalogResult};
use crate::services::auth::{UserDto, normalize_email};
use crate::services::images::ImageStore;
use crate::services::user_profile::delete_releases_of;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationDto {
    pub id: i64,
    pub email: String,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl From<user_invitation::Model> for InvitationDto {
    fn from(model: user_invitation::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            is_used: model.is_used,
            created_at: model.created_at,
            used_at: model.used_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationInput {
    pub email: String,
}

fn validate_email(email: &str) -> CatalogResult<String> {
    let email = normalize_email(email);
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        return Err(CatalogError::Validation(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(email)
}

/// Invitation and account management for administrators.
pub struct AdminService {
    db: Arc<Database>,
    images: Arc<ImageStore>,
}

impl AdminService {
    pub fn new(db: Arc<Database>, images: Arc<ImageStore>) -> Self {
        Self { db, images }
    }

    pub async fn invitations(&self) -> CatalogResult<Vec<InvitationDto>> {
        let uow = self.db.unit_of_work();
        Ok(uow
            .repository::<user_invitation::Entity>()
            .get(None, &[(user_invitation::Column::CreatedAt, Order::Desc)])
            .await?
            .into_iter()
            .map(InvitationDto::from)
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn create_invitation(&self, email: &str) -> CatalogResult<InvitationDto> {
        let email = validate_email(email)?;
        let uow = self.db.unit_of_work();

        let has_account = uow
            .repository::<application_user::Entity>()
            .any(Some(
                Condition::all().add(application_user::Column::Email.eq(email.as_str())),
            ))
            .await?;
        if has_account {
            return Err(CatalogError::Duplicate(format!(
                "A user with email {email} already exists"
            )));
        }
        let invited = uow
            .repository::<user_invitation::Entity>()
            .any(Some(
                Condition::all().add(user_invitation::Column::Email.eq(email.as_str())),
            ))
            .await?;
        if invited {
            return Err(CatalogError::Duplicate(format!(
                "An invitation for {email} already exists"
            )));
        }

        let invitation = uow
            .repository::<user_invitation::Entity>()
            .add(user_invitation::ActiveModel {
                email: Set(email),
                is_used: Set(false),
                created_at: Set(Utc::now()),
                used_at: Set(None),
                ..Default::default()
            })
            .await?;
        info!("Invited {}", invitation.email);
        Ok(invitation.into())
    }

    pub async fn delete_invitation(&self, id: i64) -> CatalogResult<()> {
        let uow = self.db.unit_of_work();
        if !uow
            .repository::<user_invitation::Entity>()
            .delete_by_id(id)
            .await?
        {
            return Err(CatalogError::not_found("Invitation", id));
        }
        Ok(())
    }

    pub async fn users(&self) -> CatalogResult<Vec<UserDto>> {
        let uow = self.db.unit_of_work();
        Ok(uow
            .repository::<application_user::Entity>()
            .get(None, &[(application_user::Column::Email, Order::Asc)])
            .await?
            .into_iter()
            .map(UserDto::from)
            .collect())
    }

    /// Removes an account together with its releases and their image files.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, acting_user_id: i64, id: i64) -> CatalogResult<()> {
        if acting_user_id == id {
            return Err(CatalogError::Validation(
                "You cannot delete your own account".into(),
            ));
        }
        let mut uow = self.db.unit_of_work();
        if uow
            .repository::<application_user::Entity>()
            .get_by_id(id)
            .await?
            .is_none()
        {
            return Err(CatalogError::not_found("User", id));
        }

        delete_releases_of(&mut uow, &self.images, id).await?;
        uow.repository::<application_user::Entity>()
            .delete_by_id(id)
            .await?;
        info!("Deleted user {id}");
        Ok(())
    }
}
