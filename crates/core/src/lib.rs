//! Gatehouse Core - Shared types library.
//!
//! This crate provides common types used across all Gatehouse components:
//! - `client` - Credential store, route guard, and admin workflow
//! - `cli` - Command-line interface for sessions and roster management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, scopes, and
//!   identity records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
