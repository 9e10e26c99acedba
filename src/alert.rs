//! Sustained-condition debounce.
//!
//! One `AlertTimer` per monitored condition. The timer is armed when the
//! condition is first observed, escalates to alerting once the condition has
//! held for `alert_after`, and is cleared the moment the condition is
//! observed false. There is no hysteresis and no memory across episodes.

use std::fmt;
use std::time::{Duration, Instant};

/// The monitored conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// Eyes closed: EAR below threshold.
    Drowsiness,
    /// Mouth open: MAR above threshold.
    Yawning,
}

impl AlertKind {
    /// Banner shown on the frame and logged while alerting.
    pub fn banner(&self) -> &'static str {
        match self {
            AlertKind::Drowsiness => "DROWSINESS DETECTED",
            AlertKind::Yawning => "YAWNING DETECTED!",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Drowsiness => f.write_str("drowsiness"),
            AlertKind::Yawning => f.write_str("yawning"),
        }
    }
}

/// Where a timer stands after an update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlertPhase {
    #[default]
    Idle,
    Armed {
        elapsed: Duration,
    },
    Alerting {
        elapsed: Duration,
    },
    /// Timer set, but the condition was not measured on this frame.
    /// Never reported as alerting; escalation waits for the next observation.
    Held {
        elapsed: Duration,
    },
}

impl AlertPhase {
    pub fn is_alerting(&self) -> bool {
        matches!(self, AlertPhase::Alerting { .. })
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, AlertPhase::Idle)
    }
}

/// Edge produced by an update, for logging state changes once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertTransition {
    None,
    Armed,
    Escalated,
    Cleared,
}

/// Debounce timer for one condition.
#[derive(Clone, Debug)]
pub struct AlertTimer {
    alert_after: Duration,
    armed_since: Option<Instant>,
    alerting: bool,
}

impl AlertTimer {
    pub fn new(alert_after: Duration) -> Self {
        Self {
            alert_after,
            armed_since: None,
            alerting: false,
        }
    }

    pub fn armed_since(&self) -> Option<Instant> {
        self.armed_since
    }

    /// Feed one observation of the condition.
    ///
    /// `onset` is the instant recorded when the timer arms; `now` is the
    /// observation time. Callers that observe the condition at `now` pass
    /// `onset == now`.
    pub fn update(
        &mut self,
        condition: bool,
        onset: Instant,
        now: Instant,
    ) -> (AlertPhase, AlertTransition) {
        if !condition {
            let was_set = self.armed_since.take().is_some();
            self.alerting = false;
            let transition = if was_set {
                AlertTransition::Cleared
            } else {
                AlertTransition::None
            };
            return (AlertPhase::Idle, transition);
        }

        let mut transition = AlertTransition::None;
        let since = *self.armed_since.get_or_insert_with(|| {
            transition = AlertTransition::Armed;
            onset.min(now)
        });
        let elapsed = now.saturating_duration_since(since);
        if elapsed >= self.alert_after {
            if !self.alerting {
                self.alerting = true;
                transition = AlertTransition::Escalated;
            }
            (AlertPhase::Alerting { elapsed }, transition)
        } else {
            (AlertPhase::Armed { elapsed }, transition)
        }
    }

    /// Phase for a frame on which the condition could not be measured.
    pub fn held_at(&self, now: Instant) -> AlertPhase {
        match self.armed_since {
            None => AlertPhase::Idle,
            Some(since) => AlertPhase::Held {
                elapsed: now.saturating_duration_since(since),
            },
        }
    }

    /// Clear the timer regardless of the condition.
    pub fn reset(&mut self) -> AlertTransition {
        self.alerting = false;
        if self.armed_since.take().is_some() {
            AlertTransition::Cleared
        } else {
            AlertTransition::None
        }
    }
}
