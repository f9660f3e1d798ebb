//! Warning cycle state machine.
//!
//! # States
//! - Idle: no warning pending or shown
//! - Confirming: slow request detected, waiting out the confirmation delay
//! - Warning: slow signal published, waiting out the settling window
//!
//! # State Transitions
//! ```text
//! Idle → Confirming: slow measurement while idle
//! Confirming → Warning: confirmation timer fires (same epoch)
//! Warning → Idle: settling timer fires (same epoch)
//! any → Idle: cancel (shutdown)
//! ```
//!
//! Every cycle gets a fresh epoch. Timer callbacks carry the epoch they were
//! scheduled for and are ignored once it is no longer current.

use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Confirming,
    Warning,
}

#[derive(Debug)]
pub(crate) struct WarningCycle {
    epoch: u64,
    phase: Phase,
    /// Generation of the tracked request that started this cycle.
    trigger: Option<u64>,
    timer: Option<JoinHandle<()>>,
}

impl WarningCycle {
    pub(crate) fn new() -> Self {
        Self {
            epoch: 0,
            phase: Phase::Idle,
            trigger: None,
            timer: None,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// True while confirming or warning; new slow measurements are ignored then.
    pub(crate) fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub(crate) fn is_warning(&self) -> bool {
        self.phase == Phase::Warning
    }

    pub(crate) fn is_current(&self, epoch: u64, phase: Phase) -> bool {
        self.epoch == epoch && self.phase == phase
    }

    /// Start a new cycle. Returns its epoch.
    pub(crate) fn begin(&mut self, trigger: u64) -> u64 {
        self.epoch += 1;
        self.phase = Phase::Confirming;
        self.trigger = Some(trigger);
        self.timer = None;
        self.epoch
    }

    /// Keep the handle of the task driving `epoch` so it can be aborted.
    pub(crate) fn attach_timer(&mut self, epoch: u64, timer: JoinHandle<()>) {
        if self.epoch == epoch && self.is_active() {
            self.timer = Some(timer);
        } else {
            timer.abort();
        }
    }

    /// Confirming → Warning. False if `epoch` is stale.
    pub(crate) fn confirm(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch, Phase::Confirming) {
            return false;
        }
        self.phase = Phase::Warning;
        true
    }

    /// Warning → Idle. Returns the trigger generation, or None if `epoch` is stale.
    pub(crate) fn settle(&mut self, epoch: u64) -> Option<u64> {
        if !self.is_current(epoch, Phase::Warning) {
            return None;
        }
        self.phase = Phase::Idle;
        // The settling callback is running inside the timer task; dropping
        // the handle detaches it without aborting.
        self.timer = None;
        self.trigger.take()
    }

    /// Abort any pending timer and return to idle. Returns the phase left.
    pub(crate) fn cancel(&mut self) -> Phase {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let left = self.phase;
        self.phase = Phase::Idle;
        self.trigger = None;
        // Bump so callbacks already past their sleep see a stale epoch.
        self.epoch += 1;
        left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle() {
        let mut cycle = WarningCycle::new();
        assert!(!cycle.is_active());

        let epoch = cycle.begin(7);
        assert_eq!(cycle.phase(), Phase::Confirming);
        assert!(cycle.is_active());
        assert!(!cycle.is_warning());

        assert!(cycle.confirm(epoch));
        assert!(cycle.is_warning());

        assert_eq!(cycle.settle(epoch), Some(7));
        assert_eq!(cycle.phase(), Phase::Idle);
    }

    #[test]
    fn stale_epoch_is_ignored() {
        let mut cycle = WarningCycle::new();
        let old = cycle.begin(1);
        cycle.cancel();
        let new = cycle.begin(2);

        assert!(!cycle.confirm(old));
        assert!(cycle.confirm(new));
        assert_eq!(cycle.settle(old), None);
        assert!(cycle.is_warning());
    }

    #[test]
    fn settle_requires_warning_phase() {
        let mut cycle = WarningCycle::new();
        let epoch = cycle.begin(3);
        assert_eq!(cycle.settle(epoch), None);
        assert_eq!(cycle.phase(), Phase::Confirming);
    }

    #[test]
    fn cancel_reports_phase_left() {
        let mut cycle = WarningCycle::new();
        assert_eq!(cycle.cancel(), Phase::Idle);

        let epoch = cycle.begin(4);
        cycle.confirm(epoch);
        assert_eq!(cycle.cancel(), Phase::Warning);
        assert!(!cycle.confirm(epoch));
    }
}
