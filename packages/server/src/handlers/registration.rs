use arena_common::RegistrationStatus;
use arena_common::role::CONTEST_MANAGE;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use super::contest::find_contest;
use crate::directory;
use crate::entity::{participant, registration};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::ledger::OccupancyReport;
use crate::models::registration::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/{id}/register",
    tag = "Registrations",
    operation_id = "registerForContest",
    summary = "Register the caller for a contest",
    description = "Adds the caller to the contest if it accepts registrations, has a free slot, and the caller holds no active registration. Checks are applied in that order after the existence check. Rejections return the typed outcome body with 404 or 409.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 201, description = "Registered", body = RegistrationResponse),
        (status = 400, description = "Invalid ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "ContestNotFound", body = RegistrationResponse),
        (status = 409, description = "RegistrationClosed, ContestFull, or AlreadyRegistered", body = RegistrationResponse),
        (status = 503, description = "Store unavailable, retry (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, participant_id = auth_user.user_id))]
pub async fn register_self(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let participant = directory::resolve(&state.db, &auth_user).await?;
    let outcome = state.ledger.register(contest_id, participant.id).await?;
    let (status, body) = RegistrationResponse::from_register(outcome);
    Ok((status, Json(body)))
}

#[utoipa::path(
    delete,
    path = "/{id}/register",
    tag = "Registrations",
    operation_id = "withdrawFromContest",
    summary = "Withdraw the caller from a contest",
    description = "Marks the caller's active registration as unregistered and frees its slot. The registration row is kept. Returns `NotRegistered` with 404 if the caller holds no active registration, including when the contest does not exist.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Withdrawn", body = RegistrationResponse),
        (status = 400, description = "Invalid ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "NotRegistered", body = RegistrationResponse),
        (status = 503, description = "Store unavailable, retry (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id, participant_id = auth_user.user_id))]
pub async fn withdraw_self(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.ledger.withdraw(contest_id, auth_user.user_id).await?;
    let (status, body) = RegistrationResponse::from_withdraw(outcome);
    Ok((status, Json(body)))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Registrations",
    operation_id = "registerParticipant",
    summary = "Register a participant on their behalf",
    description = "Registers another participant, who must already be known to the directory. Same outcomes and status codes as self-registration. Requires `contest:manage` permission.",
    request_body = RegistrationRequest,
    responses(
        (status = 201, description = "Registered", body = RegistrationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "ContestNotFound, or participant unknown (NOT_FOUND)", body = RegistrationResponse),
        (status = 409, description = "RegistrationClosed, ContestFull, or AlreadyRegistered", body = RegistrationResponse),
        (status = 503, description = "Store unavailable, retry (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id = payload.contest_id, participant_id = payload.participant_id))]
pub async fn register_participant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(CONTEST_MANAGE)?;
    validate_registration_request(&payload)?;
    directory::find_participant(&state.db, payload.participant_id).await?;

    let outcome = state
        .ledger
        .register(payload.contest_id, payload.participant_id)
        .await?;
    let (status, body) = RegistrationResponse::from_register(outcome);
    Ok((status, Json(body)))
}

#[utoipa::path(
    post,
    path = "/withdraw",
    tag = "Registrations",
    operation_id = "withdrawParticipant",
    summary = "Withdraw a participant on their behalf",
    description = "Withdraws another participant's active registration. Requires `contest:manage` permission.",
    request_body = RegistrationRequest,
    responses(
        (status = 200, description = "Withdrawn", body = RegistrationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "NotRegistered", body = RegistrationResponse),
        (status = 503, description = "Store unavailable, retry (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id = payload.contest_id, participant_id = payload.participant_id))]
pub async fn withdraw_participant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(CONTEST_MANAGE)?;
    validate_registration_request(&payload)?;

    let outcome = state
        .ledger
        .withdraw(payload.contest_id, payload.participant_id)
        .await?;
    let (status, body) = RegistrationResponse::from_withdraw(outcome);
    Ok((status, Json(body)))
}

#[utoipa::path(
    get,
    path = "/{id}/registrations",
    tag = "Registrations",
    operation_id = "listContestRegistrations",
    summary = "List active registrations of a contest",
    description = "Returns the contest's active registrations in registration order.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Active registrations", body = Vec<ContestRegistrationItem>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(contest_id))]
pub async fn list_registrations(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<Json<Vec<ContestRegistrationItem>>, AppError> {
    find_contest(&state.db, contest_id).await?;

    let items = registration::Entity::find()
        .inner_join(participant::Entity)
        .filter(registration::Column::ContestId.eq(contest_id))
        .filter(registration::Column::Status.eq(RegistrationStatus::Registered))
        .order_by_asc(registration::Column::CreatedAt)
        .order_by_asc(registration::Column::Id)
        .select_only()
        .column_as(registration::Column::Id, "registration_id")
        .column(registration::Column::ParticipantId)
        .column(participant::Column::DisplayName)
        .column(registration::Column::CreatedAt)
        .into_model::<ContestRegistrationItem>()
        .all(&state.db)
        .await?;

    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/{id}/audit",
    tag = "Registrations",
    operation_id = "auditContestOccupancy",
    summary = "Compare stored occupancy with active registrations",
    description = "Read-only consistency check. A mismatch is reported with `consistent: false` and logged; nothing is repaired. Requires `contest:manage` permission.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Occupancy report", body = OccupancyReport),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Contest not found (NOT_FOUND)", body = ErrorBody),
        (status = 503, description = "Store unavailable, retry (SERVICE_UNAVAILABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id))]
pub async fn audit_occupancy(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(contest_id): Path<i32>,
) -> Result<Json<OccupancyReport>, AppError> {
    auth_user.require_permission(CONTEST_MANAGE)?;

    let report = state
        .ledger
        .audit(contest_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))?;

    Ok(Json(report))
}
