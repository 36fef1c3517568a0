pub mod retry;
pub mod role;
pub mod status;

pub use role::Role;
pub use status::{ContestStatus, ParseEnumError, RegistrationStatus};
