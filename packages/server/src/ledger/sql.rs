use arena_common::{ContestStatus, RegistrationStatus};
use async_trait::async_trait;
use sea_orm::sea_query::{LockType, SimpleExpr};
use sea_orm::*;
use tracing::{debug, error};

use super::store::LedgerStore;
use super::types::{ContestSnapshot, LedgerError, OccupancyReport, RegisterWrite, WithdrawWrite};
use crate::entity::{contest, registration};

/// Ledger store backed by the relational database.
///
/// Each write runs in its own transaction that first takes a row lock on the
/// contest, so writers for the same contest are serialized by the database.
#[derive(Clone)]
pub struct SeaOrmLedgerStore {
    db: DatabaseConnection,
}

impl SeaOrmLedgerStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for SeaOrmLedgerStore {
    async fn get_contest(&self, contest_id: i32) -> Result<Option<ContestSnapshot>, LedgerError> {
        let model = contest::Entity::find_by_id(contest_id).one(&self.db).await?;
        Ok(model.as_ref().map(ContestSnapshot::from))
    }

    async fn find_active(
        &self,
        contest_id: i32,
        participant_id: i32,
    ) -> Result<Option<i32>, LedgerError> {
        let row = find_active_row(&self.db, contest_id, participant_id).await?;
        Ok(row.map(|r| r.id))
    }

    async fn try_register(
        &self,
        contest_id: i32,
        participant_id: i32,
        expected_occupancy: i32,
    ) -> Result<RegisterWrite, LedgerError> {
        let txn = self.db.begin().await?;

        let Some(locked) = lock_contest(&txn, contest_id).await? else {
            return Ok(RegisterWrite::Missing);
        };
        if !locked.status.accepts_registrations() {
            return Ok(RegisterWrite::Closed);
        }
        if locked.occupancy >= locked.capacity {
            return Ok(RegisterWrite::Full);
        }
        if find_active_row(&txn, contest_id, participant_id)
            .await?
            .is_some()
        {
            return Ok(RegisterWrite::Duplicate);
        }
        if locked.occupancy != expected_occupancy {
            debug!(
                contest_id,
                expected_occupancy,
                occupancy = locked.occupancy,
                "Snapshot went stale, deciding on the locked row"
            );
        }

        if !increment_occupancy(&txn, contest_id, locked.occupancy).await? {
            return Ok(RegisterWrite::Conflict);
        }

        let created_at = next_created_at(&txn).await?;
        let new_row = registration::ActiveModel {
            contest_id: Set(contest_id),
            participant_id: Set(participant_id),
            status: Set(RegistrationStatus::Registered),
            created_at: Set(created_at),
            withdrawn_at: Set(None),
            ..Default::default()
        };

        let model = match new_row.insert(&txn).await {
            Ok(model) => model,
            Err(e) => {
                return match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => Ok(RegisterWrite::Duplicate),
                    Some(SqlErr::ForeignKeyConstraintViolation(_)) => Err(LedgerError::Validation(
                        format!("participant {participant_id} does not exist"),
                    )),
                    _ => Err(e.into()),
                };
            }
        };

        verify_occupancy(&txn, contest_id, locked.occupancy + 1).await?;
        txn.commit().await?;

        Ok(RegisterWrite::Applied {
            registration_id: model.id,
        })
    }

    async fn try_withdraw(
        &self,
        contest_id: i32,
        participant_id: i32,
    ) -> Result<WithdrawWrite, LedgerError> {
        let txn = self.db.begin().await?;

        let Some(locked) = lock_contest(&txn, contest_id).await? else {
            return Ok(WithdrawWrite::NotRegistered);
        };
        let Some(row) = find_active_row(&txn, contest_id, participant_id).await? else {
            return Ok(WithdrawWrite::NotRegistered);
        };

        let registration_id = row.id;
        let mut active: registration::ActiveModel = row.into();
        active.status = Set(RegistrationStatus::Unregistered);
        active.withdrawn_at = Set(Some(chrono::Utc::now().timestamp()));
        active.update(&txn).await?;

        if !decrement_occupancy(&txn, contest_id).await? {
            error!(
                contest_id,
                participant_id, "Active registration found on a contest with zero occupancy"
            );
            return Err(LedgerError::Invariant(format!(
                "contest {contest_id} has an active registration but zero occupancy"
            )));
        }

        verify_occupancy(&txn, contest_id, locked.occupancy - 1).await?;
        txn.commit().await?;

        Ok(WithdrawWrite::Applied { registration_id })
    }

    async fn occupancy_report(
        &self,
        contest_id: i32,
    ) -> Result<Option<OccupancyReport>, LedgerError> {
        // A shared lock waits out in-flight writers and keeps new ones out
        // until the count is taken.
        let txn = self.db.begin().await?;
        let Some(contest) = contest::Entity::find_by_id(contest_id)
            .lock(LockType::Share)
            .one(&txn)
            .await?
        else {
            return Ok(None);
        };
        let active = count_active_rows(&txn, contest_id).await?;
        txn.commit().await?;

        Ok(Some(OccupancyReport::new(
            &ContestSnapshot::from(&contest),
            active as i64,
        )))
    }
}

async fn lock_contest(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<Option<contest::Model>, DbErr> {
    contest::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await
}

async fn find_active_row<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    participant_id: i32,
) -> Result<Option<registration::Model>, DbErr> {
    registration::Entity::find()
        .filter(registration::Column::ContestId.eq(contest_id))
        .filter(registration::Column::ParticipantId.eq(participant_id))
        .filter(registration::Column::Status.eq(RegistrationStatus::Registered))
        .one(db)
        .await
}

async fn count_active_rows<C: ConnectionTrait>(db: &C, contest_id: i32) -> Result<u64, DbErr> {
    registration::Entity::find()
        .filter(registration::Column::ContestId.eq(contest_id))
        .filter(registration::Column::Status.eq(RegistrationStatus::Registered))
        .count(db)
        .await
}

/// Bump occupancy by one in a single guarded UPDATE. Returns false when the
/// guard did not match.
async fn increment_occupancy<C: ConnectionTrait>(
    db: &C,
    contest_id: i32,
    expected_occupancy: i32,
) -> Result<bool, DbErr> {
    let result = contest::Entity::update_many()
        .col_expr(contest::Column::Occupancy, occupancy_shifted_by(1))
        .filter(contest::Column::Id.eq(contest_id))
        .filter(contest::Column::Occupancy.eq(expected_occupancy))
        .filter(occupancy_below_capacity())
        .filter(contest::Column::Status.is_in(ContestStatus::ACCEPTING.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

async fn decrement_occupancy<C: ConnectionTrait>(db: &C, contest_id: i32) -> Result<bool, DbErr> {
    let result = contest::Entity::update_many()
        .col_expr(contest::Column::Occupancy, occupancy_shifted_by(-1))
        .filter(contest::Column::Id.eq(contest_id))
        .filter(contest::Column::Occupancy.gt(0))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

fn occupancy_shifted_by(delta: i32) -> SimpleExpr {
    use sea_orm::sea_query::{Expr, ExprTrait};
    Expr::col(contest::Column::Occupancy).add(delta)
}

fn occupancy_below_capacity() -> SimpleExpr {
    use sea_orm::sea_query::{Expr, ExprTrait};
    Expr::col(contest::Column::Occupancy).lt(Expr::col(contest::Column::Capacity))
}

/// Recount active rows inside the write transaction. A mismatch aborts the
/// transaction; the store is the authority and nothing is repaired here.
async fn verify_occupancy(
    txn: &DatabaseTransaction,
    contest_id: i32,
    expected: i32,
) -> Result<(), LedgerError> {
    let active = count_active_rows(txn, contest_id).await?;
    if active != expected as u64 {
        error!(
            contest_id,
            expected, active, "Registration count does not match contest occupancy"
        );
        return Err(LedgerError::Invariant(format!(
            "contest {contest_id}: occupancy {expected} but {active} active registrations"
        )));
    }
    Ok(())
}

/// Current time in seconds, clamped so it never goes below the newest row.
async fn next_created_at(txn: &DatabaseTransaction) -> Result<i64, DbErr> {
    let latest: Option<i64> = registration::Entity::find()
        .select_only()
        .column_as(registration::Column::CreatedAt.max(), "latest")
        .into_tuple::<Option<i64>>()
        .one(txn)
        .await?
        .flatten();
    let now = chrono::Utc::now().timestamp();
    Ok(latest.map_or(now, |latest| std::cmp::Ord::max(now, latest)))
}
