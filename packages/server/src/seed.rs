use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{registration, team_member};

/// At most one active registration per (contest, participant). Inactive rows
/// are kept for history, so a plain unique constraint would forbid re-entry.
const ACTIVE_REGISTRATION_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS uq_registration_active \
     ON registration (contest_id, participant_id) WHERE status = 'registered'";

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync handles neither partial indexes nor composite
/// non-unique ones, so they are created manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // The ledger relies on this one to reject duplicate entries; fail startup without it.
    db.execute_unprepared(ACTIVE_REGISTRATION_INDEX).await?;
    info!("Ensured index uq_registration_active exists");

    // Occupancy recount and per-contest listing:
    // SELECT COUNT(*) FROM registration WHERE contest_id = ? AND status = 'registered'
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_registration_contest_status")
        .table(registration::Entity)
        .col(registration::Column::ContestId)
        .col(registration::Column::Status)
        .to_string(PostgresQueryBuilder);
    create_supporting_index(db, "idx_registration_contest_status", &stmt).await;

    // Per-participant listing
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_registration_participant_status")
        .table(registration::Entity)
        .col(registration::Column::ParticipantId)
        .col(registration::Column::Status)
        .to_string(PostgresQueryBuilder);
    create_supporting_index(db, "idx_registration_participant_status", &stmt).await;

    // Membership lookups by participant
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_team_member_participant")
        .table(team_member::Entity)
        .col(team_member::Column::ParticipantId)
        .to_string(PostgresQueryBuilder);
    create_supporting_index(db, "idx_team_member_participant", &stmt).await;

    Ok(())
}

async fn create_supporting_index(db: &DatabaseConnection, name: &str, stmt: &str) {
    match db.execute_unprepared(stmt).await {
        Ok(_) => {
            info!("Ensured index {} exists", name);
        }
        Err(e) => {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }
}
