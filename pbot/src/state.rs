//! Lifecycle state machine: the Off/Pending/On switch plus the separate Ready axis.
//!
//! Transitions are claimed atomically, so of two concurrent `start()` calls exactly one runs the
//! start sequence and the other waits for it to settle.

use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwitchState {
    Off,
    /// Transitioning to On.
    PendingOn,
    On,
    /// Transitioning to Off.
    PendingOff,
}

impl SwitchState {
    pub fn is_pending(self) -> bool {
        matches!(self, SwitchState::PendingOn | SwitchState::PendingOff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    On,
    Off,
}

/// Outcome of trying to claim a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the transition and must call [`StateSwitch::settle`].
    Run,
    /// Already at the target.
    Done,
    /// The same transition is in flight; wait for it to settle.
    InFlight,
    /// The opposite transition is in flight; wait for it, then try again.
    Blocked,
}

pub struct StateSwitch {
    state: watch::Sender<SwitchState>,
    ready: watch::Sender<bool>,
}

impl Default for StateSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSwitch {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SwitchState::Off);
        let (ready, _) = watch::channel(false);
        Self { state, ready }
    }

    pub fn current(&self) -> SwitchState {
        *self.state.borrow()
    }

    pub fn claim(&self, target: Target) -> Claim {
        let mut claim = Claim::Done;
        self.state.send_if_modified(|state| {
            let (next, outcome) = match (target, *state) {
                (Target::On, SwitchState::Off) => (Some(SwitchState::PendingOn), Claim::Run),
                (Target::On, SwitchState::On) => (None, Claim::Done),
                (Target::On, SwitchState::PendingOn) => (None, Claim::InFlight),
                (Target::On, SwitchState::PendingOff) => (None, Claim::Blocked),
                (Target::Off, SwitchState::On) => (Some(SwitchState::PendingOff), Claim::Run),
                (Target::Off, SwitchState::Off) => (None, Claim::Done),
                (Target::Off, SwitchState::PendingOff) => (None, Claim::InFlight),
                (Target::Off, SwitchState::PendingOn) => (None, Claim::Blocked),
            };
            claim = outcome;
            match next {
                Some(next) => {
                    *state = next;
                    true
                }
                None => false,
            }
        });
        claim
    }

    /// Ends a claimed transition.
    pub fn settle(&self, state: SwitchState) {
        self.state.send_replace(state);
    }

    /// Waits until no transition is in flight and returns the settled state.
    pub async fn settled(&self) -> SwitchState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|s| !s.is_pending()).await {
            Ok(state) => *state,
            Err(_) => self.current(),
        };
        settled
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.send_replace(ready);
    }

    /// Resolves once the Ready axis is Ready.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_claim_runs_happy_path() {
        let switch = StateSwitch::new();
        assert_eq!(switch.claim(Target::On), Claim::Run);
        assert_eq!(switch.current(), SwitchState::PendingOn);
        assert_eq!(switch.claim(Target::On), Claim::InFlight);
        assert_eq!(switch.claim(Target::Off), Claim::Blocked);

        switch.settle(SwitchState::On);
        assert_eq!(switch.claim(Target::On), Claim::Done);
        assert_eq!(switch.claim(Target::Off), Claim::Run);
        assert_eq!(switch.current(), SwitchState::PendingOff);

        switch.settle(SwitchState::Off);
        assert_eq!(switch.claim(Target::Off), Claim::Done);
    }

    #[tokio::test]
    async fn test_settled_waits_for_pending_transition() {
        let switch = Arc::new(StateSwitch::new());
        assert_eq!(switch.claim(Target::On), Claim::Run);

        let waiter = {
            let switch = switch.clone();
            tokio::spawn(async move { switch.settled().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        switch.settle(SwitchState::On);
        assert_eq!(waiter.await.unwrap(), SwitchState::On);
    }

    #[tokio::test]
    async fn test_wait_ready_resolves_after_set_ready() {
        let switch = Arc::new(StateSwitch::new());
        let waiter = {
            let switch = switch.clone();
            tokio::spawn(async move { switch.wait_ready().await })
        };
        switch.set_ready(true);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(switch.is_ready());
    }
}
