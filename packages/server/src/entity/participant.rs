use arena_common::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Directory entry for a caller known to the identity service.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participant")]
pub struct Model {
    /// Identity-service user id; never generated here.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub display_name: String,
    pub role: Role,

    #[sea_orm(has_many)]
    pub registrations: HasMany<super::registration::Entity>,

    #[sea_orm(has_many, via = "team_member")]
    pub teams: HasMany<super::team::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
