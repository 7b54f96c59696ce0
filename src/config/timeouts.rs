// ABOUTME: Per-call deadlines and the retry policy for read-only calls.
// ABOUTME: Durations are written in humantime form, e.g. "30s" or "10m".

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Timeouts {
    /// Deadline for every call except image pulls.
    #[serde(default = "default_call", with = "humantime_serde")]
    pub call: Duration,

    #[serde(default = "default_pull", with = "humantime_serde")]
    pub pull: Duration,

    /// Grace period the runtime gives a container on stop or restart.
    #[serde(default = "default_stop", with = "humantime_serde")]
    pub stop: Duration,
}

fn default_call() -> Duration {
    Duration::from_secs(30)
}

fn default_pull() -> Duration {
    Duration::from_secs(600)
}

fn default_stop() -> Duration {
    Duration::from_secs(10)
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            call: default_call(),
            pull: default_pull(),
            stop: default_stop(),
        }
    }
}

impl Timeouts {
    /// The socket client's own request timeout. It must outlast every
    /// gateway deadline so the gateway's timeout is the one that fires.
    pub fn client_ceiling(&self) -> Duration {
        self.call.max(self.pull) + self.stop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total tries, including the first.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Delay before retry `n` is `backoff * n`.
    #[serde(default = "default_backoff", with = "humantime_serde")]
    pub backoff: Duration,
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff() -> Duration {
    Duration::from_millis(250)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: default_attempts(),
            backoff: default_backoff(),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        RetryPolicy {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn delay(&self, retry: u32) -> Duration {
        self.backoff * retry
    }
}
