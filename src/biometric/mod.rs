//! Biometric / device-passcode authentication.
//!
//! The platform prompt sits behind the `BiometricAuthenticator` trait.
//! `BiometricGate` drives it: one fresh `AuthContext` per call, exactly
//! one prompt per call, and `invalidate()` to tear down anything still
//! in flight when the app goes to the background.

pub mod gate;
pub mod scripted;

pub use gate::BiometricGate;
pub use scripted::{ScriptedAuthenticator, Step};

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Who cancelled an authentication prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The user dismissed the prompt.
    User,
    /// The OS or the app tore the prompt down (backgrounding, `invalidate`).
    System,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::User => f.write_str("user"),
            CancelReason::System => f.write_str("system"),
        }
    }
}

/// Typed failure of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BiometricError {
    #[error("biometric authentication is not available on this device")]
    NotAvailable,

    #[error("no biometric identity is enrolled")]
    NotEnrolled,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("authentication cancelled by {0}")]
    Cancelled(CancelReason),

    #[error("biometrics locked out after too many attempts, use the device passcode")]
    Lockout,

    #[error("unknown authentication error: {0}")]
    Unknown(String),
}

impl BiometricError {
    /// Whether re-invoking `unlock()` can succeed without OS-level recovery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BiometricError::AuthenticationFailed | BiometricError::Cancelled(_)
        )
    }
}

/// What the prompt may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Face / fingerprint only.
    BiometricsOnly,
    /// Biometrics, falling back to the device passcode.
    BiometricsOrPasscode,
}

/// One authentication session. Never reused across calls.
#[derive(Debug)]
pub struct AuthContext {
    id: u64,
    policy: AuthPolicy,
    reason: String,
    cancel: CancellationToken,
}

impl AuthContext {
    pub(crate) fn new(id: u64, policy: AuthPolicy, reason: &str) -> Self {
        Self {
            id,
            policy,
            reason: reason.to_string(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn policy(&self) -> AuthPolicy {
        self.policy
    }

    /// User-facing prompt text.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once this context has been invalidated.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Platform biometric capability.
///
/// `evaluate` shows exactly one prompt and returns its outcome. It may be
/// dropped mid-flight; implementations should dismiss the prompt when the
/// context is cancelled.
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    /// Whether `policy` can currently be evaluated on this device.
    fn can_evaluate(&self, policy: AuthPolicy) -> Result<(), BiometricError>;

    /// Present one prompt under `context`.
    async fn evaluate(&self, context: &AuthContext) -> Result<(), BiometricError>;
}
