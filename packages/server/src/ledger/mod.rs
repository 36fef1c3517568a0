//! Registration ledger: decides whether a participant may enter a contest and
//! keeps the contest's occupancy equal to its count of active registrations.
//!
//! Preconditions are checked in a fixed order against a snapshot, then the
//! store performs a conditional write that re-applies the same checks to the
//! locked contest. Only a store that cannot lock reports a conflict, and then
//! the whole check sequence is re-run.

pub mod memory;
pub mod sql;
mod store;
mod types;

use std::future::Future;
use std::sync::Arc;

use arena_common::retry::calculate_backoff;
use tracing::{debug, error, info, instrument, warn};

use crate::config::LedgerConfig;

pub use memory::MemoryLedgerStore;
pub use sql::SeaOrmLedgerStore;
pub use store::LedgerStore;
pub use types::{
    ContestSnapshot, LedgerError, OccupancyReport, RegisterOutcome, RegisterWrite,
    WithdrawOutcome, WithdrawWrite,
};

#[derive(Clone)]
pub struct RegistrationLedger {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
}

impl RegistrationLedger {
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Register a participant for a contest.
    ///
    /// Checks, in order: contest exists, status accepts registrations, a slot
    /// is free, the participant holds no active registration. The first
    /// failing check decides the outcome.
    #[instrument(skip(self))]
    pub async fn register(
        &self,
        contest_id: i32,
        participant_id: i32,
    ) -> Result<RegisterOutcome, LedgerError> {
        validate_ids(contest_id, participant_id)?;

        let max_attempts = self.config.max_write_attempts.max(1);
        for attempt in 1..=max_attempts {
            let Some(contest) = self
                .call("get_contest", self.store.get_contest(contest_id))
                .await?
            else {
                return Ok(RegisterOutcome::ContestNotFound);
            };
            if !contest.status.accepts_registrations() {
                return Ok(RegisterOutcome::RegistrationClosed);
            }
            if contest.occupancy >= contest.capacity {
                return Ok(RegisterOutcome::ContestFull);
            }
            if self
                .call(
                    "find_active",
                    self.store.find_active(contest_id, participant_id),
                )
                .await?
                .is_some()
            {
                return Ok(RegisterOutcome::AlreadyRegistered);
            }

            let write = self
                .call(
                    "try_register",
                    self.store
                        .try_register(contest_id, participant_id, contest.occupancy),
                )
                .await?;

            match write {
                RegisterWrite::Applied { registration_id } => {
                    info!(
                        contest_id,
                        participant_id, registration_id, "Participant registered"
                    );
                    return Ok(RegisterOutcome::Registered { registration_id });
                }
                RegisterWrite::Missing => return Ok(RegisterOutcome::ContestNotFound),
                RegisterWrite::Closed => return Ok(RegisterOutcome::RegistrationClosed),
                RegisterWrite::Full => return Ok(RegisterOutcome::ContestFull),
                RegisterWrite::Duplicate => return Ok(RegisterOutcome::AlreadyRegistered),
                RegisterWrite::Conflict => {
                    debug!(attempt, contest_id, "Occupancy moved under us, re-reading");
                    if attempt < max_attempts {
                        tokio::time::sleep(calculate_backoff(
                            attempt,
                            self.config.backoff_base_ms,
                            self.config.backoff_max_ms,
                        ))
                        .await;
                    }
                }
            }
        }

        warn!(contest_id, max_attempts, "Registration kept conflicting");
        Err(LedgerError::Unavailable(format!(
            "contest {contest_id} stayed contended after {max_attempts} attempts"
        )))
    }

    /// Withdraw a participant's active registration.
    #[instrument(skip(self))]
    pub async fn withdraw(
        &self,
        contest_id: i32,
        participant_id: i32,
    ) -> Result<WithdrawOutcome, LedgerError> {
        validate_ids(contest_id, participant_id)?;

        let write = self
            .call(
                "try_withdraw",
                self.store.try_withdraw(contest_id, participant_id),
            )
            .await?;

        Ok(match write {
            WithdrawWrite::Applied { registration_id } => {
                info!(
                    contest_id,
                    participant_id, registration_id, "Participant withdrew"
                );
                WithdrawOutcome::Withdrawn { registration_id }
            }
            WithdrawWrite::NotRegistered => WithdrawOutcome::NotRegistered,
        })
    }

    /// Compare stored occupancy with the live count of active registrations.
    /// Returns `None` for an unknown contest.
    #[instrument(skip(self))]
    pub async fn audit(&self, contest_id: i32) -> Result<Option<OccupancyReport>, LedgerError> {
        if contest_id <= 0 {
            return Err(LedgerError::Validation("contest_id must be positive".into()));
        }
        let report = self
            .call(
                "occupancy_report",
                self.store.occupancy_report(contest_id),
            )
            .await?;

        if let Some(report) = report.filter(|r| !r.consistent) {
            error!(
                contest_id,
                occupancy = report.occupancy,
                active = report.active_registrations,
                "Occupancy does not match active registrations"
            );
        }
        Ok(report)
    }

    /// Run one store call under the configured timeout.
    async fn call<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        match tokio::time::timeout(self.config.store_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    op,
                    timeout_ms = self.config.store_timeout_ms,
                    "Store call timed out"
                );
                Err(LedgerError::Unavailable(format!(
                    "{op} timed out after {}ms",
                    self.config.store_timeout_ms
                )))
            }
        }
    }
}

fn validate_ids(contest_id: i32, participant_id: i32) -> Result<(), LedgerError> {
    if contest_id <= 0 {
        return Err(LedgerError::Validation("contest_id must be positive".into()));
    }
    if participant_id <= 0 {
        return Err(LedgerError::Validation(
            "participant_id must be positive".into(),
        ));
    }
    Ok(())
}
