//! Command implementations for the Gatehouse CLI.

pub mod account;
pub mod roster;
