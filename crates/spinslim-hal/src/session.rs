//! [`TriggerSession`] – scoped software-trigger acquisition on one camera.
//!
//! The session owns a [`TriggerController`] and a mutable borrow of the
//! camera for as long as the trigger is armed.  It guarantees the two halves
//! of the trigger contract that the bare controller leaves to its caller:
//!
//! - every fire is paired with exactly one frame retrieval
//!   ([`capture`][TriggerSession::capture] does both), and
//! - the trigger is reset on every exit path: explicitly through
//!   [`finish`][TriggerSession::finish], or from `Drop` when the session is
//!   abandoned by an early return, a `?`, or a panic.

use std::time::Duration;

use spinslim_types::{CameraError, CameraFrame, TriggerError, TriggerState};
use tracing::{instrument, warn};

use crate::camera::Camera;
use crate::trigger::TriggerController;

/// Armed software trigger on a borrowed camera.
pub struct TriggerSession<'a, C: Camera + ?Sized> {
    camera: &'a mut C,
    controller: TriggerController,
    finished: bool,
}

impl<'a, C: Camera + ?Sized> TriggerSession<'a, C> {
    /// Configure the software trigger on `camera`.
    ///
    /// If configuration fails part-way the trigger is reset before the
    /// configuration error is returned; a reset failure at that point is
    /// only logged.
    #[instrument(skip_all, fields(serial = camera.serial()))]
    pub fn start(camera: &'a mut C) -> Result<Self, TriggerError> {
        let mut controller = TriggerController::new();
        if let Err(err) = controller.configure(camera.node_map()) {
            if let Err(reset_err) = controller.reset(camera.node_map()) {
                warn!(error = %reset_err, "reset after failed configuration also failed");
            }
            return Err(err);
        }
        Ok(Self {
            camera,
            controller,
            finished: false,
        })
    }

    pub fn state(&self) -> TriggerState {
        self.controller.state()
    }

    /// The borrowed camera, e.g. to begin or end acquisition while armed.
    pub fn camera(&mut self) -> &mut C {
        &mut *self.camera
    }

    /// Fire the software trigger and retrieve the single frame it produces.
    ///
    /// # Errors
    ///
    /// [`CameraError::Trigger`] if the trigger could not be fired (no frame
    /// is requested in that case), or [`CameraError::Sdk`] if the frame did
    /// not arrive within `timeout`.
    pub fn capture(&mut self, timeout: Duration) -> Result<CameraFrame, CameraError> {
        self.controller.fire_and_capture(self.camera.node_map())?;
        self.camera
            .next_image(timeout)
            .map_err(|cause| CameraError::sdk("retrieve triggered image", cause))
    }

    /// Reset the trigger and end the session.
    ///
    /// The returned error is non-fatal: the camera may be left in trigger
    /// mode, but the caller should still proceed with its own shutdown.
    pub fn finish(mut self) -> Result<(), TriggerError> {
        self.finished = true;
        self.controller.reset(self.camera.node_map())
    }
}

impl<C: Camera + ?Sized> Drop for TriggerSession<'_, C> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.controller.reset(self.camera.node_map()) {
            warn!(
                serial = self.camera.serial(),
                error = %err,
                "trigger reset on drop failed"
            );
        }
    }
}
