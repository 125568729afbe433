use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{Argon2Params, KdfParams};
use crate::errors::{Result, VaultError};

/// Password KDF selection as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KdfAlgorithm {
    #[default]
    HkdfSha256,
    Argon2id,
}

/// Vault configuration, loaded from `pocketvault.toml`.
///
/// Every field has a sensible default so the core works without any
/// config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Service identifier the secret store namespaces entries under.
    #[serde(default = "default_service")]
    pub service: String,

    /// Which KDF turns the master password into the vault key.
    #[serde(default)]
    pub kdf: KdfAlgorithm,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Prompt text shown by `unlock()`.
    #[serde(default = "default_unlock_reason")]
    pub unlock_reason: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_service() -> String {
    "app.pocketvault".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_unlock_reason() -> String {
    "Unlock your vault".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: default_service(),
            kdf: KdfAlgorithm::default(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            unlock_reason: default_unlock_reason(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for.
    const FILE_NAME: &'static str = "pocketvault.toml";

    /// Load settings from `<dir>/pocketvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.service.trim().is_empty() {
            return Err(VaultError::ConfigError(format!(
                "{}: service must not be empty",
                config_path.display()
            )));
        }

        Ok(settings)
    }

    /// Settings with a specific service identifier and defaults elsewhere.
    pub fn for_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
            ..Self::default()
        }
    }

    /// Convert the KDF settings into crypto-layer params.
    pub fn kdf_params(&self) -> KdfParams {
        match self.kdf {
            KdfAlgorithm::HkdfSha256 => KdfParams::HkdfSha256,
            KdfAlgorithm::Argon2id => KdfParams::Argon2id(Argon2Params {
                memory_kib: self.argon2_memory_kib,
                iterations: self.argon2_iterations,
                parallelism: self.argon2_parallelism,
            }),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
