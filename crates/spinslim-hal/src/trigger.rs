//! [`TriggerController`] – software-triggered single-frame acquisition.
//!
//! The controller drives three phases on one camera's device node map:
//!
//! 1. [`configure`][TriggerController::configure] – switch `TriggerMode` off,
//!    select `TriggerSource = Software`, switch `TriggerMode` back on.  The
//!    source can only be changed while trigger mode is off, so the order is
//!    fixed.
//! 2. [`fire_and_capture`][TriggerController::fire_and_capture] – execute
//!    `TriggerSoftware`, making exactly one frame available.  Retrieving that
//!    frame is the caller's job and must happen exactly once before the next
//!    fire; asking the camera for a second frame hangs until its timeout.
//! 3. [`reset`][TriggerController::reset] – switch `TriggerMode` off again.
//!
//! ```text
//! Unconfigured --configure--> Configured --fire--> Fired --fire--> Fired
//!                                  |                  |
//!                                  +------reset-------+--> Reset
//! ```
//!
//! `configure` and `fire_and_capture` stop at the first failing node.
//! `reset` runs during cleanup: its failures are logged as non-fatal and
//! returned, and the controller ends in [`TriggerState::Reset`] either way.
//! Use [`TriggerSession`][crate::session::TriggerSession] to get the reset on
//! every exit path.
//!
//! # Concurrency
//!
//! One controller per camera, used from one thread.  Fire/retrieve pairs on
//! the same camera must be serialised by the caller; nothing here locks.

use spinslim_types::{NodeError, TriggerError, TriggerState};
use tracing::{debug, error, info, instrument, warn};

use crate::node::{self, NodeAccess};

/// Enumeration node selecting whether frames wait for a trigger.
pub const TRIGGER_MODE: &str = "TriggerMode";
/// Enumeration node selecting where the trigger comes from.
pub const TRIGGER_SOURCE: &str = "TriggerSource";
/// Command node that fires a software trigger.
pub const TRIGGER_SOFTWARE: &str = "TriggerSoftware";

/// `TriggerMode` entry that lets the camera free-run.
pub const MODE_OFF: &str = "Off";
/// `TriggerMode` entry that makes each frame wait for a trigger.
pub const MODE_ON: &str = "On";
/// `TriggerSource` entry routing triggers from [`TRIGGER_SOFTWARE`].
pub const SOURCE_SOFTWARE: &str = "Software";

/// Sequences software-trigger configuration, firing, and reset for a single
/// camera.
#[derive(Debug)]
pub struct TriggerController {
    state: TriggerState,
}

impl Default for TriggerController {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerController {
    /// Create a controller in [`TriggerState::Unconfigured`].
    pub fn new() -> Self {
        Self {
            state: TriggerState::Unconfigured,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Put the camera into software-trigger mode.
    ///
    /// May be called again on a configured controller; a successful call
    /// always leaves the controller [`Configured`][TriggerState::Configured].
    /// On failure the state is left untouched and the camera may be in
    /// trigger-off mode, so call [`reset`][Self::reset] before giving up.
    ///
    /// # Errors
    ///
    /// - [`TriggerError::NodeUnavailable`] for `TriggerMode` or
    ///   `TriggerSource` missing or not writable.
    /// - [`TriggerError::EntryUnavailable`] for `TriggerMode.Off`,
    ///   `TriggerSource.Software` or `TriggerMode.On`.
    /// - [`TriggerError::WriteFailed`] if the device rejects a write.
    #[instrument(skip_all, fields(state = %self.state))]
    pub fn configure<N: NodeAccess + ?Sized>(&mut self, nodes: &mut N) -> Result<(), TriggerError> {
        match apply_software_trigger(nodes) {
            Ok(()) => {
                self.state = TriggerState::Configured;
                info!("software trigger configured");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "trigger configuration aborted");
                Err(err.into())
            }
        }
    }

    /// Execute `TriggerSoftware` once.
    ///
    /// Exactly one frame becomes available per successful call; the caller
    /// retrieves it before firing again.  No frame is buffered here.
    ///
    /// # Errors
    ///
    /// - [`TriggerError::InvalidState`] unless the controller is
    ///   `Configured` or `Fired`; the node map is not touched.
    /// - [`TriggerError::NodeUnavailable`] if `TriggerSoftware` is missing or
    ///   not writable.
    /// - [`TriggerError::CommandExecutionFailed`] if the device rejects it.
    #[instrument(skip_all, fields(state = %self.state))]
    pub fn fire_and_capture<N: NodeAccess + ?Sized>(
        &mut self,
        nodes: &mut N,
    ) -> Result<(), TriggerError> {
        if !self.state.can_fire() {
            warn!("software trigger requested outside configured state");
            return Err(TriggerError::InvalidState {
                operation: "fire software trigger",
                state: self.state,
            });
        }

        node::execute(nodes, TRIGGER_SOFTWARE).map_err(|err| {
            error!(error = %err, "software trigger failed");
            TriggerError::from(err)
        })?;

        self.state = TriggerState::Fired;
        debug!("software trigger fired");
        Ok(())
    }

    /// Return the camera to free-running mode by switching `TriggerMode` off.
    ///
    /// Safe to call from any state, including after a failed `configure`.
    /// Failures are non-fatal: they are logged and returned so the caller can
    /// report them, but the caller should carry on with its shutdown.  The
    /// controller is [`Reset`][TriggerState::Reset] afterwards regardless.
    #[instrument(skip_all, fields(state = %self.state))]
    pub fn reset<N: NodeAccess + ?Sized>(&mut self, nodes: &mut N) -> Result<(), TriggerError> {
        let result = disable_trigger_mode(nodes);
        self.state = TriggerState::Reset;
        match result {
            Ok(()) => {
                info!("trigger mode disabled");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "trigger reset failed, continuing (non-fatal)");
                Err(err.into())
            }
        }
    }
}

fn apply_software_trigger<N: NodeAccess + ?Sized>(nodes: &mut N) -> Result<(), NodeError> {
    let mode = node::writable_enumeration(nodes, TRIGGER_MODE)?;
    let off = node::readable_entry(nodes, &mode, TRIGGER_MODE, MODE_OFF)?;
    node::write_entry(nodes, &mode, TRIGGER_MODE, &off)?;
    debug!("trigger mode disabled for source selection");

    let source = node::writable_enumeration(nodes, TRIGGER_SOURCE)?;
    let software = node::readable_entry(nodes, &source, TRIGGER_SOURCE, SOURCE_SOFTWARE)?;
    node::write_entry(nodes, &source, TRIGGER_SOURCE, &software)?;
    debug!("trigger source set to software");

    let on = node::readable_entry(nodes, &mode, TRIGGER_MODE, MODE_ON)?;
    node::write_entry(nodes, &mode, TRIGGER_MODE, &on)
}

fn disable_trigger_mode<N: NodeAccess + ?Sized>(nodes: &mut N) -> Result<(), NodeError> {
    let mode = node::writable_enumeration(nodes, TRIGGER_MODE)?;
    let off = node::readable_entry(nodes, &mode, TRIGGER_MODE, MODE_OFF)?;
    node::write_entry(nodes, &mode, TRIGGER_MODE, &off)
}
