//! A `BiometricAuthenticator` that plays back queued outcomes.
//!
//! Test double only. With an empty queue every prompt succeeds, so wiring
//! it into a shipping build would open the vault without any check. Hosts
//! without a biometric sensor implement `BiometricAuthenticator` over the
//! device passcode instead.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AuthContext, AuthPolicy, BiometricAuthenticator, BiometricError, CancelReason};

/// What the next prompt does.
#[derive(Debug, Clone)]
pub enum Step {
    /// Succeed immediately.
    Approve,
    /// Fail immediately with the given error.
    Fail(BiometricError),
    /// Never answer; resolves only when the context is cancelled.
    Pending,
    /// Answer after a delay.
    Delayed(Duration, Result<(), BiometricError>),
}

/// A prompt as the authenticator saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenContext {
    pub id: u64,
    pub policy: AuthPolicy,
    pub reason: String,
}

/// Scripted prompt outcomes for tests. Not for production use.
pub struct ScriptedAuthenticator {
    biometry: Mutex<Result<(), BiometricError>>,
    passcode_set: Mutex<bool>,
    steps: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<SeenContext>>,
}

impl ScriptedAuthenticator {
    /// Enrolled biometrics, passcode set, every prompt approved.
    pub fn approving() -> Self {
        Self {
            biometry: Mutex::new(Ok(())),
            passcode_set: Mutex::new(true),
            steps: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue the outcome of a future prompt.
    pub fn push(&self, step: Step) {
        self.steps.lock().push_back(step);
    }

    /// Set what `can_evaluate(BiometricsOnly)` reports.
    pub fn set_biometry(&self, state: Result<(), BiometricError>) {
        *self.biometry.lock() = state;
    }

    /// Whether the device passcode can stand in for biometrics.
    pub fn set_passcode(&self, set: bool) {
        *self.passcode_set.lock() = set;
    }

    /// Every context handed to `evaluate`, in order.
    pub fn contexts(&self) -> Vec<SeenContext> {
        self.seen.lock().clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.seen.lock().len()
    }
}

#[async_trait]
impl BiometricAuthenticator for ScriptedAuthenticator {
    fn can_evaluate(&self, policy: AuthPolicy) -> Result<(), BiometricError> {
        let biometry = self.biometry.lock().clone();
        match policy {
            AuthPolicy::BiometricsOnly => biometry,
            AuthPolicy::BiometricsOrPasscode if *self.passcode_set.lock() => Ok(()),
            AuthPolicy::BiometricsOrPasscode => biometry,
        }
    }

    async fn evaluate(&self, context: &AuthContext) -> Result<(), BiometricError> {
        self.seen.lock().push(SeenContext {
            id: context.id(),
            policy: context.policy(),
            reason: context.reason().to_string(),
        });

        let step = self.steps.lock().pop_front().unwrap_or(Step::Approve);
        match step {
            Step::Approve => Ok(()),
            Step::Fail(err) => Err(err),
            Step::Pending => {
                context.cancelled().await;
                Err(BiometricError::Cancelled(CancelReason::System))
            }
            Step::Delayed(delay, outcome) => {
                tokio::time::sleep(delay).await;
                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_steps_run_in_order_then_approve() {
        let auth = ScriptedAuthenticator::approving();
        auth.push(Step::Fail(BiometricError::NotEnrolled));
        let context = AuthContext::new(1, AuthPolicy::BiometricsOnly, "first");

        assert_eq!(
            auth.evaluate(&context).await,
            Err(BiometricError::NotEnrolled)
        );
        assert_eq!(auth.evaluate(&context).await, Ok(()));
        assert_eq!(auth.prompt_count(), 2);
    }

    #[tokio::test]
    async fn pending_step_resolves_on_cancel() {
        let auth = ScriptedAuthenticator::approving();
        auth.push(Step::Pending);
        let context = AuthContext::new(7, AuthPolicy::BiometricsOrPasscode, "wait");
        context.token().cancel();

        assert_eq!(
            auth.evaluate(&context).await,
            Err(BiometricError::Cancelled(CancelReason::System))
        );
        assert_eq!(auth.contexts()[0].id, 7);
    }
}
