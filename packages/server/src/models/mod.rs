pub mod contest;
pub mod participant;
pub mod registration;
pub mod shared;
pub mod team;
