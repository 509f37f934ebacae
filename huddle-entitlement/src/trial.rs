//! The per-machine trial state machine: `none → active → expired`, with
//! `expired` terminal. A machine gets exactly one trial, ever.

use crate::error::EntitlementResult;
use crate::licensing::EntitlementService;
use chrono::{DateTime, Duration, Utc};
use huddle_store::{StoreError, TrialState, UserId};
use tracing::{debug, info};

/// Trial window length.
pub const TRIAL_DAYS: i64 = 30;

/// Result of a trial activation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialOutcome {
    /// A fresh trial was started.
    Activated { expires_at: DateTime<Utc> },
    /// A trial is already running on this machine. The stored expiry is
    /// untouched.
    AlreadyActive { days_remaining: i64 },
    /// This machine's trial has ended; it never restarts.
    Expired,
}

impl TrialOutcome {
    /// Returns whether the activation took effect.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Activated { .. })
    }

    /// Human-readable reason for the UI.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Activated { expires_at } => {
                format!("Trial activated until {}", expires_at.format("%Y-%m-%d"))
            }
            Self::AlreadyActive { days_remaining } => format!(
                "A trial is already active on this machine ({days_remaining} days remaining)"
            ),
            Self::Expired => "The trial for this machine has expired".to_string(),
        }
    }
}

/// Read-only trial projection for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStatus {
    /// No trial was ever activated on this machine.
    None,
    Active { days_remaining: i64 },
    Expired,
}

impl EntitlementService {
    /// Attempts to activate the trial for a machine.
    ///
    /// At most one trial per machine: a live trial rejects with
    /// [`TrialOutcome::AlreadyActive`] without touching the stored expiry; a
    /// lapsed one transitions to expired and rejects — never auto-renews.
    pub fn activate_trial(
        &self,
        machine_id: &str,
        user_id: Option<UserId>,
    ) -> EntitlementResult<TrialOutcome> {
        let now = Utc::now();
        if let Some(trial) = self.store().trial(machine_id)? {
            return self.reject_existing(machine_id, trial.state, trial.expires_at, now);
        }

        let expires_at = now + Duration::days(TRIAL_DAYS);
        match self.store().insert_trial(machine_id, user_id, now, expires_at) {
            Ok(()) => {
                info!(machine_id, "trial activated");
                Ok(TrialOutcome::Activated { expires_at })
            }
            // Lost a race with a concurrent activation: report against the
            // row that won.
            Err(StoreError::AlreadyExists(_)) => {
                let trial = self
                    .store()
                    .trial(machine_id)?
                    .ok_or(StoreError::NotFound("trial activation"))?;
                self.reject_existing(machine_id, trial.state, trial.expires_at, now)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn reject_existing(
        &self,
        machine_id: &str,
        state: TrialState,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EntitlementResult<TrialOutcome> {
        if state == TrialState::Active && now < expires_at {
            return Ok(TrialOutcome::AlreadyActive {
                days_remaining: days_remaining(expires_at, now),
            });
        }
        if state == TrialState::Active {
            self.store()
                .set_trial_state(machine_id, TrialState::Expired)?;
            debug!(machine_id, "trial lapsed, marked expired");
        }
        Ok(TrialOutcome::Expired)
    }

    /// Reports the trial state for a machine. Lazily flips the persisted
    /// state to expired on the first check past the window.
    pub fn check_trial_status(&self, machine_id: &str) -> EntitlementResult<TrialStatus> {
        let Some(trial) = self.store().trial(machine_id)? else {
            return Ok(TrialStatus::None);
        };
        let now = Utc::now();
        if trial.state == TrialState::Expired || now >= trial.expires_at {
            if trial.state == TrialState::Active {
                self.store()
                    .set_trial_state(machine_id, TrialState::Expired)?;
            }
            return Ok(TrialStatus::Expired);
        }
        Ok(TrialStatus::Active {
            days_remaining: days_remaining(trial.expires_at, now),
        })
    }
}

/// Whole days until expiry, floored, never negative.
fn days_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_days().max(0)
}
