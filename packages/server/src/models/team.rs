use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::Pagination;
use crate::entity::team;
use crate::error::AppError;

pub const DEFAULT_MAX_MEMBERS: i32 = 5;
pub const MAX_MEMBERS_LIMIT: i32 = 16;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTeamRequest {
    /// Unique team name (1-64 characters).
    #[schema(example = "Night Owls")]
    pub name: String,
    /// Short tag shown next to member names (1-8 alphanumeric characters).
    #[schema(example = "NOWL")]
    pub tag: String,
    /// Roster limit including the captain (1-16, default 5).
    #[schema(example = 5)]
    pub max_members: Option<i32>,
}

pub fn validate_create_team(req: &CreateTeamRequest) -> Result<(), AppError> {
    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > 64 {
        return Err(AppError::Validation(
            "Team name must be 1-64 characters".into(),
        ));
    }
    let tag = req.tag.trim();
    if tag.is_empty() || tag.chars().count() > 8 {
        return Err(AppError::Validation("Tag must be 1-8 characters".into()));
    }
    if !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(
            "Tag must contain only letters and digits".into(),
        ));
    }
    if let Some(max) = req.max_members
        && !(1..=MAX_MEMBERS_LIMIT).contains(&max)
    {
        return Err(AppError::Validation(format!(
            "max_members must be between 1 and {MAX_MEMBERS_LIMIT}"
        )));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct TeamListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive name search.
    pub search: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamMemberResponse {
    pub participant_id: i32,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub name: String,
    pub tag: String,
    pub captain_id: i32,
    pub max_members: i32,
    pub created_at: DateTime<Utc>,
    pub members: Vec<TeamMemberResponse>,
}

impl TeamResponse {
    pub fn new(m: team::Model, members: Vec<TeamMemberResponse>) -> Self {
        Self {
            id: m.id,
            name: m.name,
            tag: m.tag,
            captain_id: m.captain_id,
            max_members: m.max_members,
            created_at: m.created_at,
            members,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamListItem {
    pub id: i32,
    pub name: String,
    pub tag: String,
    pub captain_id: i32,
    pub max_members: i32,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamListResponse {
    pub data: Vec<TeamListItem>,
    pub pagination: Pagination,
}
