use arena_common::ContestStatus;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ledger::{RegisterOutcome, WithdrawOutcome};

/// Body for registering or withdrawing someone other than the caller.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegistrationRequest {
    #[schema(example = 1)]
    pub contest_id: i32,
    #[schema(example = 42)]
    pub participant_id: i32,
}

pub fn validate_registration_request(req: &RegistrationRequest) -> Result<(), AppError> {
    if req.contest_id <= 0 || req.participant_id <= 0 {
        return Err(AppError::Validation(
            "contest_id and participant_id must be positive".into(),
        ));
    }
    Ok(())
}

/// Result of a register or withdraw call.
///
/// Business rejections use this body too, with a 404/409 status, so clients
/// branch on `outcome` rather than on the generic error body.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegistrationResponse {
    /// One of `Registered`, `ContestNotFound`, `RegistrationClosed`,
    /// `ContestFull`, `AlreadyRegistered`, `Withdrawn`, `NotRegistered`.
    #[schema(example = "Registered")]
    pub outcome: &'static str,
    /// Present for `Registered` and `Withdrawn`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 7)]
    pub registration_id: Option<i32>,
}

impl RegistrationResponse {
    pub fn from_register(outcome: RegisterOutcome) -> (StatusCode, Self) {
        let status = match outcome {
            RegisterOutcome::Registered { .. } => StatusCode::CREATED,
            RegisterOutcome::ContestNotFound => StatusCode::NOT_FOUND,
            RegisterOutcome::RegistrationClosed
            | RegisterOutcome::ContestFull
            | RegisterOutcome::AlreadyRegistered => StatusCode::CONFLICT,
        };
        (
            status,
            Self {
                outcome: outcome.as_str(),
                registration_id: outcome.registration_id(),
            },
        )
    }

    pub fn from_withdraw(outcome: WithdrawOutcome) -> (StatusCode, Self) {
        let status = match outcome {
            WithdrawOutcome::Withdrawn { .. } => StatusCode::OK,
            WithdrawOutcome::NotRegistered => StatusCode::NOT_FOUND,
        };
        (
            status,
            Self {
                outcome: outcome.as_str(),
                registration_id: outcome.registration_id(),
            },
        )
    }
}

/// Active registration in a contest's roster.
#[derive(Serialize, sea_orm::FromQueryResult, utoipa::ToSchema)]
pub struct ContestRegistrationItem {
    pub registration_id: i32,
    pub participant_id: i32,
    pub display_name: String,
    /// Seconds since epoch.
    pub created_at: i64,
}

/// Active registration held by one participant.
#[derive(Serialize, sea_orm::FromQueryResult, utoipa::ToSchema)]
pub struct ParticipantRegistrationItem {
    pub registration_id: i32,
    pub contest_id: i32,
    pub contest_title: String,
    pub contest_status: ContestStatus,
    /// Seconds since epoch.
    pub created_at: i64,
}
