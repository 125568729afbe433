//! The vault session: setup, unlock, lock, re-key and item access.
//!
//! This module provides:
//! - `SessionState` (`state`)
//! - The `VaultSession` controller that owns the in-memory key (`controller`)

pub mod controller;
pub mod state;

pub use controller::{LoadedVault, VaultSession};
pub use state::SessionState;
