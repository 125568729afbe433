//! The gate in front of the platform authenticator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{AuthContext, AuthPolicy, BiometricAuthenticator, BiometricError, CancelReason};

/// Runs one authentication prompt per call, each under its own context.
///
/// No retries and no timeouts: the caller decides whether to try again and
/// may drop the returned future to abandon a prompt.
pub struct BiometricGate<A> {
    authenticator: A,
    next_id: AtomicU64,
    active: Mutex<HashMap<u64, CancellationToken>>,
}

/// Deregisters a context when its call finishes or is dropped.
struct ActiveContext<'a> {
    active: &'a Mutex<HashMap<u64, CancellationToken>>,
    id: u64,
}

impl Drop for ActiveContext<'_> {
    fn drop(&mut self) {
        self.active.lock().remove(&self.id);
    }
}

impl<A: BiometricAuthenticator> BiometricGate<A> {
    pub fn new(authenticator: A) -> Self {
        Self {
            authenticator,
            next_id: AtomicU64::new(1),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Whether biometric-only authentication can run right now.
    pub fn is_available(&self) -> bool {
        self.authenticator
            .can_evaluate(AuthPolicy::BiometricsOnly)
            .is_ok()
    }

    /// Biometric-only prompt.
    pub async fn authenticate(&self, reason: &str) -> Result<(), BiometricError> {
        self.run(AuthPolicy::BiometricsOnly, reason).await
    }

    /// Biometric prompt that falls back to the device passcode when
    /// biometrics are unavailable or locked out.
    pub async fn authenticate_with_fallback(&self, reason: &str) -> Result<(), BiometricError> {
        self.run(AuthPolicy::BiometricsOrPasscode, reason).await
    }

    /// Cancel every prompt currently in flight. Later calls are unaffected.
    pub fn invalidate(&self) {
        let drained: Vec<CancellationToken> =
            self.active.lock().drain().map(|(_, token)| token).collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "invalidating authentication contexts");
        }
        for token in drained {
            token.cancel();
        }
    }

    /// Number of prompts currently in flight.
    pub fn in_flight(&self) -> usize {
        self.active.lock().len()
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    async fn run(&self, policy: AuthPolicy, reason: &str) -> Result<(), BiometricError> {
        self.authenticator.can_evaluate(policy)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let context = AuthContext::new(id, policy, reason);
        let token = context.token();
        self.active.lock().insert(id, token.clone());
        let _registered = ActiveContext {
            active: &self.active,
            id,
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(BiometricError::Cancelled(CancelReason::System)),
            outcome = self.authenticator.evaluate(&context) => outcome,
        }
    }
}
