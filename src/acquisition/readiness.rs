use crate::{Error, Result};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    ThermostatConnected,
    SensorsConnected,
    FirstPollDone,
}

impl Milestone {
    fn bit(self) -> u8 {
        match self {
            Milestone::ThermostatConnected => 0b001,
            Milestone::SensorsConnected => 0b010,
            Milestone::FirstPollDone => 0b100,
        }
    }
}

const ALL: u8 = 0b111;

#[derive(Clone, Debug, Default)]
struct GateState {
    reached: u8,
    /// Database that gave up connecting, with its attempt count
    failure: Option<(String, u32)>,
}

impl GateState {
    fn settled(&self) -> bool {
        self.reached == ALL || self.failure.is_some()
    }
}

/// One-shot barrier that opens once both databases are connected and the
/// first sensor poll has completed. Milestones only accumulate, so once open
/// the gate stays open. A database that gives up connecting fails the gate
/// instead, and waiters get the error.
#[derive(Debug)]
pub struct ReadinessGate {
    state: watch::Sender<GateState>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::default());
        Self { state }
    }

    /// Records a milestone. Returns true only for the call that opened the gate.
    pub fn mark(&self, milestone: Milestone) -> bool {
        let mut opened = false;
        self.state.send_if_modified(|state| {
            if state.failure.is_some() {
                return false;
            }
            let before = state.reached;
            state.reached |= milestone.bit();
            opened = before != ALL && state.reached == ALL;
            before != state.reached
        });
        if opened {
            info!("Data acquisition ready");
        }
        opened
    }

    /// Fails the gate for good unless it is already open or failed.
    /// Returns true if this call failed it.
    pub fn fail(&self, label: &str, attempts: u32) -> bool {
        self.state.send_if_modified(|state| {
            if state.settled() {
                return false;
            }
            state.failure = Some((label.into(), attempts));
            true
        })
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().reached == ALL
    }

    pub fn has_failed(&self) -> bool {
        self.state.borrow().failure.is_some()
    }

    pub fn has_reached(&self, milestone: Milestone) -> bool {
        self.state.borrow().reached & milestone.bit() != 0
    }

    pub async fn wait(&self) -> Result<()> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(GateState::settled)
            .await
            .map_err(|_| Error::Cancelled)?;
        match &state.failure {
            Some((label, attempts)) if state.reached != ALL => Err(Error::ConnectGaveUp {
                label: label.clone(),
                attempts: *attempts,
            }),
            _ => Ok(()),
        }
    }

    pub async fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| Error::NotReady(timeout))?
    }
}
