use async_trait::async_trait;

use super::types::{ContestSnapshot, LedgerError, OccupancyReport, RegisterWrite, WithdrawWrite};

/// Storage seam of the registration ledger.
///
/// Reads may be stale by the time the ledger acts on them; `try_register`,
/// `try_withdraw` and `occupancy_report` must each be evaluated indivisibly
/// by the store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current catalog view of the contest.
    async fn get_contest(&self, contest_id: i32) -> Result<Option<ContestSnapshot>, LedgerError>;

    /// Id of the active registration for the pair, if any.
    async fn find_active(
        &self,
        contest_id: i32,
        participant_id: i32,
    ) -> Result<Option<i32>, LedgerError>;

    /// Insert a `registered` row and increment occupancy, only if the contest
    /// still accepts registrations, is below capacity, and holds no active row
    /// for the participant. `expected_occupancy` is the value the caller saw;
    /// a store that can lock the contest decides on the locked row instead and
    /// never reports `Conflict` for a snapshot that merely went stale.
    async fn try_register(
        &self,
        contest_id: i32,
        participant_id: i32,
        expected_occupancy: i32,
    ) -> Result<RegisterWrite, LedgerError>;

    /// Flip the active row to `unregistered` and decrement occupancy.
    async fn try_withdraw(
        &self,
        contest_id: i32,
        participant_id: i32,
    ) -> Result<WithdrawWrite, LedgerError>;

    /// Stored occupancy and the count of `registered` rows, read together.
    async fn occupancy_report(
        &self,
        contest_id: i32,
    ) -> Result<Option<OccupancyReport>, LedgerError>;
}
