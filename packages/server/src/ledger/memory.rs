use std::collections::HashMap;
use std::time::Duration;

use arena_common::{ContestStatus, RegistrationStatus};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::store::LedgerStore;
use super::types::{ContestSnapshot, LedgerError, OccupancyReport, RegisterWrite, WithdrawWrite};

/// A registration row as kept by [`MemoryLedgerStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryRegistration {
    pub id: i32,
    pub contest_id: i32,
    pub participant_id: i32,
    pub status: RegistrationStatus,
    pub created_at: i64,
}

#[derive(Default)]
struct MemoryState {
    contests: HashMap<i32, ContestSnapshot>,
    registrations: Vec<MemoryRegistration>,
    last_created_at: i64,
}

impl MemoryState {
    fn active(&self, contest_id: i32, participant_id: i32) -> Option<&MemoryRegistration> {
        self.registrations.iter().find(|r| {
            r.contest_id == contest_id
                && r.participant_id == participant_id
                && r.status == RegistrationStatus::Registered
        })
    }

    fn active_count(&self, contest_id: i32) -> i64 {
        self.registrations
            .iter()
            .filter(|r| r.contest_id == contest_id && r.status == RegistrationStatus::Registered)
            .count() as i64
    }
}

/// In-process store for tests and single-node experiments.
///
/// All writes go through one async mutex, which gives the same indivisibility
/// the SQL store gets from its transaction.
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
    write_delay: Option<Duration>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before every write so concurrent callers read the same snapshot.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub async fn insert_contest(&self, id: i32, capacity: i32, status: ContestStatus) {
        self.state.lock().await.contests.insert(
            id,
            ContestSnapshot {
                id,
                capacity,
                occupancy: 0,
                status,
            },
        );
    }

    /// Change a contest's status, as the catalog would.
    pub async fn set_status(&self, id: i32, status: ContestStatus) {
        if let Some(contest) = self.state.lock().await.contests.get_mut(&id) {
            contest.status = status;
        }
    }

    /// Overwrite stored occupancy without touching rows.
    pub async fn force_occupancy(&self, id: i32, occupancy: i32) {
        if let Some(contest) = self.state.lock().await.contests.get_mut(&id) {
            contest.occupancy = occupancy;
        }
    }

    pub async fn registrations(&self, contest_id: i32) -> Vec<MemoryRegistration> {
        self.state
            .lock()
            .await
            .registrations
            .iter()
            .filter(|r| r.contest_id == contest_id)
            .cloned()
            .collect()
    }

    async fn pause(&self) {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_contest(&self, contest_id: i32) -> Result<Option<ContestSnapshot>, LedgerError> {
        Ok(self.state.lock().await.contests.get(&contest_id).copied())
    }

    async fn find_active(
        &self,
        contest_id: i32,
        participant_id: i32,
    ) -> Result<Option<i32>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.active(contest_id, participant_id).map(|r| r.id))
    }

    async fn try_register(
        &self,
        contest_id: i32,
        participant_id: i32,
        _expected_occupancy: i32,
    ) -> Result<RegisterWrite, LedgerError> {
        self.pause().await;
        let mut state = self.state.lock().await;

        // The mutex plays the part of the row lock, so decide on live state.
        let Some(contest) = state.contests.get(&contest_id).copied() else {
            return Ok(RegisterWrite::Missing);
        };
        if !contest.status.accepts_registrations() {
            return Ok(RegisterWrite::Closed);
        }
        if contest.occupancy >= contest.capacity {
            return Ok(RegisterWrite::Full);
        }
        if state.active(contest_id, participant_id).is_some() {
            return Ok(RegisterWrite::Duplicate);
        }

        let id = state.registrations.len() as i32 + 1;
        let created_at = chrono::Utc::now().timestamp().max(state.last_created_at);
        state.last_created_at = created_at;
        state.registrations.push(MemoryRegistration {
            id,
            contest_id,
            participant_id,
            status: RegistrationStatus::Registered,
            created_at,
        });
        if let Some(contest) = state.contests.get_mut(&contest_id) {
            contest.occupancy += 1;
        }

        Ok(RegisterWrite::Applied {
            registration_id: id,
        })
    }

    async fn try_withdraw(
        &self,
        contest_id: i32,
        participant_id: i32,
    ) -> Result<WithdrawWrite, LedgerError> {
        self.pause().await;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let occupancy = match state.contests.get(&contest_id) {
            Some(contest) => contest.occupancy,
            None => return Ok(WithdrawWrite::NotRegistered),
        };
        let Some(row) = state.registrations.iter_mut().find(|r| {
            r.contest_id == contest_id
                && r.participant_id == participant_id
                && r.status == RegistrationStatus::Registered
        }) else {
            return Ok(WithdrawWrite::NotRegistered);
        };
        if occupancy == 0 {
            return Err(LedgerError::Invariant(format!(
                "contest {contest_id} has an active registration but zero occupancy"
            )));
        }

        row.status = RegistrationStatus::Unregistered;
        let registration_id = row.id;
        if let Some(contest) = state.contests.get_mut(&contest_id) {
            contest.occupancy -= 1;
        }

        Ok(WithdrawWrite::Applied { registration_id })
    }

    async fn occupancy_report(
        &self,
        contest_id: i32,
    ) -> Result<Option<OccupancyReport>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .contests
            .get(&contest_id)
            .map(|contest| OccupancyReport::new(contest, state.active_count(contest_id))))
    }
}
