//! Core types for Gatehouse.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod account;
pub mod email;
pub mod id;
pub mod identity;
pub mod scope;

pub use account::Account;
pub use email::{Email, EmailError};
pub use id::*;
pub use identity::{Identity, Role};
pub use scope::Scope;
