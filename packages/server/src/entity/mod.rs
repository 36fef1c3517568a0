pub mod contest;
pub mod participant;
pub mod registration;
pub mod team;
pub mod team_member;
