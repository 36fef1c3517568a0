use arena_common::ContestStatus;
use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, validate_title};
use crate::entity::contest;
use crate::error::AppError;

/// Largest capacity a single contest may be given.
pub const MAX_CAPACITY: i32 = 100_000;
const MAX_DESCRIPTION_BYTES: usize = 1_000_000;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContestRequest {
    /// Contest title (1-256 characters).
    #[schema(example = "Spring Invitational")]
    pub title: String,
    /// Markdown description (at most 1MB).
    #[serde(default)]
    pub description: String,
    /// Maximum number of registered participants (1-100000).
    #[schema(example = 64)]
    pub capacity: i32,
    #[schema(example = "2026-03-01T10:00:00Z")]
    pub start_time: DateTime<Utc>,
    #[schema(example = "2026-03-01T18:00:00Z")]
    pub end_time: DateTime<Utc>,
    /// Open registration immediately instead of starting as a draft.
    #[serde(default)]
    pub open_registration: bool,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateContestRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// New capacity; must not be below the current occupancy.
    pub capacity: Option<i32>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateContestStatusRequest {
    pub status: ContestStatus,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ContestListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive title search.
    pub search: Option<String>,
    /// Only contests in this lifecycle state.
    pub status: Option<ContestStatus>,
    /// One of `created_at`, `start_time`, `title`. Default: `created_at`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`. Default: `desc`.
    pub sort_order: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub title: String,
    pub description: String,
    #[schema(example = 64)]
    pub capacity: i32,
    #[schema(example = 12)]
    pub occupancy: i32,
    pub status: ContestStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<contest::Model> for ContestResponse {
    fn from(m: contest::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            capacity: m.capacity,
            occupancy: m.occupancy,
            status: m.status,
            start_time: m.start_time,
            end_time: m.end_time,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct ContestListItem {
    pub id: i32,
    pub title: String,
    pub capacity: i32,
    pub occupancy: i32,
    pub status: ContestStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestListResponse {
    pub data: Vec<ContestListItem>,
    pub pagination: Pagination,
}

fn validate_capacity(capacity: i32) -> Result<(), AppError> {
    if !(1..=MAX_CAPACITY).contains(&capacity) {
        return Err(AppError::Validation(format!(
            "Capacity must be between 1 and {MAX_CAPACITY}"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.len() > MAX_DESCRIPTION_BYTES {
        return Err(AppError::Validation(
            "Description must be at most 1MB".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_contest(req: &CreateContestRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    validate_capacity(req.capacity)?;
    if req.end_time <= req.start_time {
        return Err(AppError::Validation(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}

pub fn validate_update_contest(req: &UpdateContestRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(capacity) = req.capacity {
        validate_capacity(capacity)?;
    }
    if let (Some(start), Some(end)) = (req.start_time, req.end_time)
        && end <= start
    {
        return Err(AppError::Validation(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}

/// Check a lifecycle move against the transition table.
pub fn validate_status_transition(from: ContestStatus, to: ContestStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Cannot move contest from {from} to {to}"
        )))
    }
}
