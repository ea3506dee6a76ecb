use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{sleep_until, Duration, Instant};

use crate::config::WatchdogConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchdogExpiry {
    /// No recognition activity for the whole silence window
    Silence,
    /// The answer hit its absolute length limit
    HardCap,
}

/// Soft silence deadline plus a hard cap on answer length.
///
/// Both deadlines exist only while armed; `disarm` drops them so nothing
/// can fire into a later turn.
#[derive(Debug, Clone)]
pub struct SilenceWatchdog {
    soft_window: Duration,
    hard_cap: Duration,
    soft_deadline: Option<Instant>,
    hard_deadline: Option<Instant>,
}

impl SilenceWatchdog {
    pub fn new(soft_window: Duration, hard_cap: Duration) -> Self {
        Self {
            soft_window,
            hard_cap,
            soft_deadline: None,
            hard_deadline: None,
        }
    }

    pub fn from_config(config: &WatchdogConfig) -> Self {
        Self::new(config.soft_silence(), config.hard_cap())
    }

    pub fn arm(&mut self, now: Instant) {
        self.soft_deadline = Some(now + self.soft_window);
        self.hard_deadline = Some(now + self.hard_cap);
    }

    /// Recognition activity: push the silence deadline out by a full window.
    /// The hard cap is untouched.
    pub fn touch(&mut self, now: Instant) -> bool {
        match self.soft_deadline {
            Some(_) => {
                self.soft_deadline = Some(now + self.soft_window);
                true
            }
            None => false,
        }
    }

    pub fn disarm(&mut self) {
        self.soft_deadline = None;
        self.hard_deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.soft_deadline.is_some() || self.hard_deadline.is_some()
    }

    pub fn soft_deadline(&self) -> Option<Instant> {
        self.soft_deadline
    }

    pub fn hard_deadline(&self) -> Option<Instant> {
        self.hard_deadline
    }

    /// Earliest pending deadline; the hard cap wins a tie
    pub fn next_expiry(&self) -> Option<(Instant, WatchdogExpiry)> {
        match (self.soft_deadline, self.hard_deadline) {
            (Some(soft), Some(hard)) if soft < hard => Some((soft, WatchdogExpiry::Silence)),
            (_, Some(hard)) => Some((hard, WatchdogExpiry::HardCap)),
            (Some(soft), None) => Some((soft, WatchdogExpiry::Silence)),
            (None, None) => None,
        }
    }

    /// Expired deadline at `now`, if any
    pub fn poll_expired(&self, now: Instant) -> Option<WatchdogExpiry> {
        self.next_expiry()
            .filter(|(at, _)| *at <= now)
            .map(|(_, kind)| kind)
    }

    /// Resolves when the earliest deadline passes; never resolves while disarmed.
    /// The future owns a snapshot of the deadlines, so it is rebuilt after every change.
    pub fn expired(&self) -> impl Future<Output = WatchdogExpiry> + Send + 'static {
        let next = self.next_expiry();
        async move {
            match next {
                Some((at, kind)) => {
                    sleep_until(at).await;
                    kind
                }
                None => std::future::pending().await,
            }
        }
    }
}
