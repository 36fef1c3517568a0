use arena_common::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::participant;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "neo")]
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<participant::Model> for ParticipantResponse {
    fn from(m: participant::Model) -> Self {
        Self {
            id: m.id,
            display_name: m.display_name,
            role: m.role,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
