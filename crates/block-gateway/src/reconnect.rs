//! Reconnect policy (`spec.md` §4.6, §5): "on any unrecoverable error the
//! session is closed and the next attempt is deferred by ~15 seconds;
//! attempts continue indefinitely."

use std::time::Duration;

pub const RECONNECT_COOLDOWN: Duration = Duration::from_secs(15);

/// Drives the connect-or-wait decision as a plain state machine so it can
/// be unit tested without a real socket. `GatewayClient` (in `client.rs`)
/// is the thing that actually calls `tokio::time::sleep` on a `Wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStep {
    AttemptNow,
    Wait(Duration),
}

#[derive(Debug, Default)]
pub struct ReconnectPolicy {
    consecutive_failures: u32,
}

impl ReconnectPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Record a failed attempt and decide the next step. The cooldown is
    /// flat, not exponential — the original ship server just sleeps 15s
    /// and retries indefinitely, no backoff curve.
    pub fn on_failure(&mut self) -> ReconnectStep {
        self.consecutive_failures += 1;
        ReconnectStep::Wait(RECONNECT_COOLDOWN)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_always_waits_the_flat_cooldown() {
        let mut policy = ReconnectPolicy::new();
        assert_eq!(policy.on_failure(), ReconnectStep::Wait(RECONNECT_COOLDOWN));
        assert_eq!(policy.on_failure(), ReconnectStep::Wait(RECONNECT_COOLDOWN));
        assert_eq!(policy.consecutive_failures(), 2);
    }

    #[test]
    fn success_resets_the_failure_count() {
        let mut policy = ReconnectPolicy::new();
        policy.on_failure();
        policy.on_failure();
        policy.on_success();
        assert_eq!(policy.consecutive_failures(), 0);
    }
}
