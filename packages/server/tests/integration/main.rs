mod common;
mod contest;
mod participant;
