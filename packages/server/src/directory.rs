//! Participant directory: maps a verified caller identity to a participant row.

use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::entity::participant;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

/// Resolve the caller to a participant record, creating or refreshing it from
/// the token claims. Display name and role always follow the latest token.
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
) -> Result<participant::Model, AppError> {
    let now = chrono::Utc::now();
    let row = participant::ActiveModel {
        id: Set(auth_user.user_id),
        display_name: Set(auth_user.display_name.clone()),
        role: Set(auth_user.role),
        created_at: Set(now),
        updated_at: Set(now),
    };

    participant::Entity::insert(row)
        .on_conflict(
            OnConflict::column(participant::Column::Id)
                .update_columns([
                    participant::Column::DisplayName,
                    participant::Column::Role,
                    participant::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_participant(db, auth_user.user_id).await
}

/// Look up a participant by ID, returning 404 if the directory has never seen them.
pub async fn find_participant<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<participant::Model, AppError> {
    participant::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Participant not found".into()))
}
