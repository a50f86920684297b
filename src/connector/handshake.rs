//! Readiness wait for the subscribe handshake.
//!
//! Each attempt waits for a state change for at most one interval, so the
//! wait is bounded by `max_attempts * interval` and wakes as soon as the
//! connection opens. An observed close ends the wait immediately.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::trace;

use crate::config::ConnectorSettings;
use crate::connector::transport::ReadyState;
use crate::utils::error::HandshakeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ConnectorSettings::default())
    }
}

impl From<&ConnectorSettings> for RetryPolicy {
    fn from(settings: &ConnectorSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.poll_interval_ms),
            max_attempts: settings.max_attempts,
        }
    }
}

/// Wait until `ready` reports `Open`.
///
/// Returns the attempt on which the connection was seen open (1-based).
pub async fn wait_for_open(
    ready: &mut watch::Receiver<ReadyState>,
    policy: &RetryPolicy,
) -> Result<u32, HandshakeError> {
    for attempt in 1..=policy.max_attempts {
        let settled = timeout(
            policy.interval,
            ready.wait_for(|state| *state != ReadyState::Connecting),
        )
        .await;

        match settled {
            Ok(Ok(state)) if state.is_open() => return Ok(attempt),
            Ok(Ok(_)) | Ok(Err(_)) => return Err(HandshakeError::Closed),
            Err(_) => trace!("Connection not open after attempt {attempt}"),
        }
    }

    Err(HandshakeError::TimedOut {
        attempts: policy.max_attempts,
    })
}
