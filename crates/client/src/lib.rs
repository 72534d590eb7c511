//! Gatehouse client library.
//!
//! Everything a Gatehouse frontend needs: the credential store, the
//! route guard, session flows against the account service, and the
//! admin moderation workflow. The crate talks HTTP and the local state
//! file; it renders nothing.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod confirm;
pub mod guard;
pub mod session;
pub mod store;
pub mod token;
pub mod workflow;
