#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a contest as stored in the catalog.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum ContestStatus {
    /// Being set up; registrations are already accepted.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "draft"))]
    Draft,
    /// Publicly open for registration.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "registration_open"))]
    RegistrationOpen,
    /// Registration has closed; the contest may still be running.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "closed"))]
    Closed,
    /// Finished.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "completed"))]
    Completed,
    /// Called off.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "cancelled"))]
    Cancelled,
}

impl ContestStatus {
    /// All possible status values.
    pub const ALL: &'static [ContestStatus] = &[
        Self::Draft,
        Self::RegistrationOpen,
        Self::Closed,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Statuses in which the registration ledger accepts new registrations.
    pub const ACCEPTING: &'static [ContestStatus] = &[Self::Draft, Self::RegistrationOpen];

    pub fn accepts_registrations(&self) -> bool {
        Self::ACCEPTING.contains(self)
    }

    /// Returns true once no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the catalog may move a contest from `self` to `next`.
    pub fn can_transition_to(&self, next: ContestStatus) -> bool {
        use ContestStatus::*;
        matches!(
            (self, next),
            (Draft, RegistrationOpen)
                | (Draft, Cancelled)
                | (RegistrationOpen, Closed)
                | (RegistrationOpen, Cancelled)
                | (Closed, RegistrationOpen)
                | (Closed, Completed)
                | (Closed, Cancelled)
        )
    }

    /// Returns the string representation (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::RegistrationOpen => "registration_open",
            Self::Closed => "closed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ContestStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl FromStr for ContestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new(s, Self::ALL.iter().map(|v| v.as_str())))
    }
}

/// State of a single registration row. Rows are never deleted, only flipped
/// to `Unregistered`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "registered"))]
    Registered,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "unregistered"))]
    Unregistered,
}

impl RegistrationStatus {
    pub const ALL: &'static [RegistrationStatus] = &[Self::Registered, Self::Unregistered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Unregistered => "unregistered",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new(s, Self::ALL.iter().map(|v| v.as_str())))
    }
}

/// Error when parsing an invalid enum string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    invalid: String,
    valid: Vec<&'static str>,
}

impl ParseEnumError {
    pub(crate) fn new(invalid: &str, valid: impl Iterator<Item = &'static str>) -> Self {
        Self {
            invalid: invalid.to_string(),
            valid: valid.collect(),
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid value '{}'. Valid values: {}",
            self.invalid,
            self.valid.join(", ")
        )
    }
}

impl std::error::Error for ParseEnumError {}
