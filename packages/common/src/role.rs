#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::status::ParseEnumError;

pub const CONTEST_CREATE: &str = "contest:create";
pub const CONTEST_MANAGE: &str = "contest:manage";
pub const CONTEST_DELETE: &str = "contest:delete";
pub const TEAM_MANAGE: &str = "team:manage";

/// Privilege level carried in the caller's token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "admin"))]
    Admin,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "organizer"))]
    Organizer,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "player"))]
    Player,
}

impl Role {
    pub const ALL: &'static [Role] = &[Self::Admin, Self::Organizer, Self::Player];

    /// Permissions granted to the role. Players only act on themselves.
    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Self::Admin => &[CONTEST_CREATE, CONTEST_MANAGE, CONTEST_DELETE, TEAM_MANAGE],
            Self::Organizer => &[CONTEST_CREATE, CONTEST_MANAGE, TEAM_MANAGE],
            Self::Player => &[],
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Organizer => "organizer",
            Self::Player => "player",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::Player
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseEnumError::new(s, Self::ALL.iter().map(|v| v.as_str())))
    }
}
