pub mod biometric;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod item;
pub mod secret_store;
pub mod session;

pub use errors::{Result, VaultError};
pub use session::{LoadedVault, SessionState, VaultSession};
