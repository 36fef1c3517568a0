use arena_common::RegistrationStatus;
use arena_common::role::CONTEST_MANAGE;
use axum::Json;
use axum::extract::{Path, State};
use sea_orm::*;
use tracing::instrument;

use crate::directory;
use crate::entity::{contest, registration};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::participant::ParticipantResponse;
use crate::models::registration::ParticipantRegistrationItem;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/me",
    tag = "Participants",
    operation_id = "getCurrentParticipant",
    summary = "Get the caller's directory record",
    description = "Resolves the caller against the participant directory, creating the record on first contact. Display name and role follow the latest token.",
    responses(
        (status = 200, description = "Caller's participant record", body = ParticipantResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(participant_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ParticipantResponse>, AppError> {
    let model = directory::resolve(&state.db, &auth_user).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/registrations",
    tag = "Participants",
    operation_id = "listParticipantRegistrations",
    summary = "List a participant's active registrations",
    description = "Returns the contests the participant is currently registered for. Participants may list their own registrations; listing someone else's requires `contest:manage` permission.",
    params(("id" = i32, Path, description = "Participant ID")),
    responses(
        (status = 200, description = "Active registrations", body = Vec<ParticipantRegistrationItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Participant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(participant_id = id))]
pub async fn participant_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ParticipantRegistrationItem>>, AppError> {
    if id != auth_user.user_id {
        auth_user.require_permission(CONTEST_MANAGE)?;
    }
    directory::find_participant(&state.db, id).await?;

    let items = registration::Entity::find()
        .inner_join(contest::Entity)
        .filter(registration::Column::ParticipantId.eq(id))
        .filter(registration::Column::Status.eq(RegistrationStatus::Registered))
        .order_by_asc(registration::Column::CreatedAt)
        .order_by_asc(registration::Column::Id)
        .select_only()
        .column_as(registration::Column::Id, "registration_id")
        .column(registration::Column::ContestId)
        .column_as(contest::Column::Title, "contest_title")
        .column_as(contest::Column::Status, "contest_status")
        .column(registration::Column::CreatedAt)
        .into_model::<ParticipantRegistrationItem>()
        .all(&state.db)
        .await?;

    Ok(Json(items))
}
