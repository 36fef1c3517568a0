use arena_common::ContestStatus;
use sea_orm::{DbErr, RuntimeErr};
use serde::Serialize;
use thiserror::Error;

/// The slice of a catalog contest the ledger needs to decide a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContestSnapshot {
    pub id: i32,
    pub capacity: i32,
    pub occupancy: i32,
    pub status: ContestStatus,
}

impl From<&crate::entity::contest::Model> for ContestSnapshot {
    fn from(m: &crate::entity::contest::Model) -> Self {
        Self {
            id: m.id,
            capacity: m.capacity,
            occupancy: m.occupancy,
            status: m.status,
        }
    }
}

/// Terminal result of a register call. Rejections are ordinary values, not errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered { registration_id: i32 },
    ContestNotFound,
    RegistrationClosed,
    ContestFull,
    AlreadyRegistered,
}

impl RegisterOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "Registered",
            Self::ContestNotFound => "ContestNotFound",
            Self::RegistrationClosed => "RegistrationClosed",
            Self::ContestFull => "ContestFull",
            Self::AlreadyRegistered => "AlreadyRegistered",
        }
    }

    pub fn registration_id(&self) -> Option<i32> {
        match self {
            Self::Registered { registration_id } => Some(*registration_id),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Withdrawn { registration_id: i32 },
    NotRegistered,
}

impl WithdrawOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdrawn { .. } => "Withdrawn",
            Self::NotRegistered => "NotRegistered",
        }
    }

    pub fn registration_id(&self) -> Option<i32> {
        match self {
            Self::Withdrawn { registration_id } => Some(*registration_id),
            Self::NotRegistered => None,
        }
    }
}

/// Result of the store's indivisible register write.
///
/// A store that holds the contest row while it writes re-checks the rules
/// against that row and answers with the matching rejection. `Conflict` is
/// left for stores that can only compare against the caller's snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterWrite {
    Applied { registration_id: i32 },
    /// The contest disappeared after the snapshot was read.
    Missing,
    /// The contest stopped accepting registrations.
    Closed,
    /// The last slot was taken.
    Full,
    /// An active registration for the pair already exists.
    Duplicate,
    /// Occupancy moved since the snapshot and the store cannot tell why.
    Conflict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawWrite {
    Applied { registration_id: i32 },
    NotRegistered,
}

/// Stored occupancy compared with the live count of active registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct OccupancyReport {
    pub contest_id: i32,
    pub capacity: i32,
    pub occupancy: i32,
    pub active_registrations: i64,
    pub consistent: bool,
}

impl OccupancyReport {
    /// Both values must come from the same snapshot of the store.
    pub fn new(contest: &ContestSnapshot, active_registrations: i64) -> Self {
        Self {
            contest_id: contest.id,
            capacity: contest.capacity,
            occupancy: contest.occupancy,
            active_registrations,
            consistent: active_registrations == i64::from(contest.occupancy),
        }
    }
}

/// Failures of the ledger itself. Business rejections never show up here.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input, rejected before the store is touched.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The store did not answer in time, dropped the connection, or aborted
    /// the transaction under contention. Safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the statement itself. Retrying will not help.
    #[error("store error: {0}")]
    Store(String),

    /// Stored occupancy disagrees with the registration rows.
    #[error("occupancy invariant violated: {0}")]
    Invariant(String),
}

impl From<DbErr> for LedgerError {
    fn from(err: DbErr) -> Self {
        if is_transient(&err) {
            LedgerError::Unavailable(err.to_string())
        } else {
            LedgerError::Store(err.to_string())
        }
    }
}

/// Lost connections and Postgres serialization failures or deadlocks
/// (SQLSTATE 40001, 40P01).
fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| matches!(code.as_ref(), "40001" | "40P01")),
        _ => false,
    }
}
