use std::collections::HashMap;

use arena_common::role::TEAM_MANAGE;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, LockType};
use sea_orm::*;
use tracing::{info, instrument};

use crate::directory;
use crate::entity::{participant, team, team_member};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{Pagination, escape_like, page_window};
use crate::models::team::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/",
    tag = "Teams",
    operation_id = "createTeam",
    summary = "Create a team",
    description = "Creates a team with the caller as captain and first member. Team names are unique.",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Team name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_team(&payload)?;
    let captain = directory::resolve(&state.db, &auth_user).await?;

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;

    let new_team = team::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        tag: Set(payload.tag.trim().to_string()),
        captain_id: Set(captain.id),
        max_members: Set(payload.max_members.unwrap_or(DEFAULT_MAX_MEMBERS)),
        created_at: Set(now),
        ..Default::default()
    };
    let model = match new_team.insert(&txn).await {
        Ok(model) => model,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("Team name is already taken".into()));
        }
        Err(e) => return Err(e.into()),
    };

    team_member::ActiveModel {
        team_id: Set(model.id),
        participant_id: Set(captain.id),
        joined_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(team_id = model.id, captain_id = captain.id, "Team created");

    let members = vec![TeamMemberResponse {
        participant_id: captain.id,
        display_name: captain.display_name,
        joined_at: now,
    }];
    Ok((StatusCode::CREATED, Json(TeamResponse::new(model, members))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Teams",
    operation_id = "listTeams",
    summary = "List teams with member counts",
    description = "Returns a paginated list of teams ordered by name, with an optional case-insensitive name search.",
    params(TeamListQuery),
    responses(
        (status = 200, description = "List of teams", body = TeamListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn list_teams(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<TeamListQuery>,
) -> Result<Json<TeamListResponse>, AppError> {
    let (page, per_page) = page_window(query.page, query.per_page);

    let mut select = team::Entity::find();
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(team::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let teams = select
        .order_by_asc(team::Column::Name)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let ids: Vec<i32> = teams.iter().map(|t| t.id).collect();
    let counts: HashMap<i32, i64> = team_member::Entity::find()
        .filter(team_member::Column::TeamId.is_in(ids))
        .select_only()
        .column(team_member::Column::TeamId)
        .column_as(team_member::Column::ParticipantId.count(), "member_count")
        .group_by(team_member::Column::TeamId)
        .into_tuple::<(i32, i64)>()
        .all(&state.db)
        .await?
        .into_iter()
        .collect();

    let data = teams
        .into_iter()
        .map(|t| TeamListItem {
            member_count: counts.get(&t.id).copied().unwrap_or(0),
            id: t.id,
            name: t.name,
            tag: t.tag,
            captain_id: t.captain_id,
            max_members: t.max_members,
            created_at: t.created_at,
        })
        .collect();

    Ok(Json(TeamListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Teams",
    operation_id = "getTeam",
    summary = "Get a team with its members",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team details", body = TeamResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_team(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TeamResponse>, AppError> {
    let model = team::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))?;
    let members = list_members(&state.db, id).await?;
    Ok(Json(TeamResponse::new(model, members)))
}

#[utoipa::path(
    post,
    path = "/{id}/members",
    tag = "Teams",
    operation_id = "joinTeam",
    summary = "Join a team",
    description = "Adds the caller to the team roster. Rejected when the roster is full or the caller is already a member. Runs under the team row lock so concurrent joins cannot overfill the roster.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 201, description = "Joined", body = TeamResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Team full or already a member (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_id = id, participant_id = auth_user.user_id))]
pub async fn join_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let member = directory::resolve(&state.db, &auth_user).await?;

    let txn = state.db.begin().await?;
    let locked = find_team_for_update(&txn, id).await?;

    if team_member::Entity::find_by_id((id, member.id))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Already a member of this team".into()));
    }

    let size = member_count(&txn, id).await?;
    if size >= locked.max_members as u64 {
        return Err(AppError::Conflict(format!(
            "Team is full ({} members)",
            locked.max_members
        )));
    }

    team_member::ActiveModel {
        team_id: Set(id),
        participant_id: Set(member.id),
        joined_at: Set(chrono::Utc::now()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(team_id = id, participant_id = member.id, "Joined team");

    let members = list_members(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse::new(locked, members))))
}

#[utoipa::path(
    delete,
    path = "/{id}/members",
    tag = "Teams",
    operation_id = "leaveTeam",
    summary = "Leave a team",
    description = "Removes the caller from the roster. The captain may only leave as the last member, which disbands the team.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 204, description = "Left the team"),
        (status = 400, description = "Captain cannot leave a non-empty team (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Team not found or not a member (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_id = id, participant_id = auth_user.user_id))]
pub async fn leave_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let locked = find_team_for_update(&txn, id).await?;
    let membership = find_membership(&txn, id, auth_user.user_id).await?;

    if locked.captain_id == auth_user.user_id {
        if member_count(&txn, id).await? > 1 {
            return Err(AppError::Validation(
                "The captain cannot leave while other members remain".into(),
            ));
        }
        membership.delete(&txn).await?;
        team::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        info!(team_id = id, "Captain left, team disbanded");
        return Ok(StatusCode::NO_CONTENT);
    }

    membership.delete(&txn).await?;
    txn.commit().await?;

    info!(team_id = id, participant_id = auth_user.user_id, "Left team");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/{id}/members/{participant_id}",
    tag = "Teams",
    operation_id = "removeTeamMember",
    summary = "Remove a member from a team",
    description = "Removes another member from the roster. Allowed for the team captain and for callers with `team:manage` permission. The captain cannot be removed this way.",
    params(
        ("id" = i32, Path, description = "Team ID"),
        ("participant_id" = i32, Path, description = "Participant ID"),
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 400, description = "Cannot remove the captain (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team or member not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(team_id = id, participant_id))]
pub async fn remove_member(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, participant_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let locked = find_team_for_update(&txn, id).await?;

    if locked.captain_id != auth_user.user_id {
        auth_user.require_permission(TEAM_MANAGE)?;
    }
    if participant_id == locked.captain_id {
        return Err(AppError::Validation(
            "The captain cannot be removed from the team".into(),
        ));
    }

    let membership = find_membership(&txn, id, participant_id).await?;
    membership.delete(&txn).await?;
    txn.commit().await?;

    info!(team_id = id, participant_id, removed_by = auth_user.user_id, "Removed team member");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_team_for_update(txn: &DatabaseTransaction, id: i32) -> Result<team::Model, AppError> {
    team::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))
}

async fn find_membership<C: ConnectionTrait>(
    db: &C,
    team_id: i32,
    participant_id: i32,
) -> Result<team_member::ActiveModel, AppError> {
    team_member::Entity::find_by_id((team_id, participant_id))
        .one(db)
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::NotFound("Not a member of this team".into()))
}

async fn member_count<C: ConnectionTrait>(db: &C, team_id: i32) -> Result<u64, AppError> {
    Ok(team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .count(db)
        .await?)
}

async fn list_members<C: ConnectionTrait>(
    db: &C,
    team_id: i32,
) -> Result<Vec<TeamMemberResponse>, AppError> {
    let rows = team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .find_also_related(participant::Entity)
        .order_by_asc(team_member::Column::JoinedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(tm, p)| TeamMemberResponse {
            participant_id: tm.participant_id,
            display_name: p.map(|p| p.display_name).unwrap_or_default(),
            joined_at: tm.joined_at,
        })
        .collect())
}
