//! [`TriggeredAcquisition`] – one software-triggered capture run on a camera.
//!
//! A run applies the configured pixel format and buffer handling, arms the
//! software trigger, streams `frame_count` fire/retrieve pairs, and then
//! unwinds: acquisition is ended once it has begun and the trigger is always
//! reset.  The first error of the run is returned; failures during the
//! unwinding that follows it are logged.

use spinslim_hal::{Camera, TriggerSession, format};
use spinslim_types::{CameraError, CameraFrame};
use tracing::{debug, info, instrument, warn};

use crate::config::AcquisitionConfig;

/// Runs software-triggered acquisitions with fixed settings.
#[derive(Debug, Clone)]
pub struct TriggeredAcquisition {
    config: AcquisitionConfig,
}

impl TriggeredAcquisition {
    /// # Errors
    ///
    /// [`CameraError::Config`] if `config` fails validation.
    pub fn new(config: AcquisitionConfig) -> Result<Self, CameraError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Capture `frame_count` frames and return them in capture order.
    pub fn run<C: Camera + ?Sized>(&self, camera: &mut C) -> Result<Vec<CameraFrame>, CameraError> {
        // frame_count is caller-controlled; grow as frames arrive.
        let mut frames = Vec::new();
        self.run_with(camera, |frame| {
            frames.push(frame);
            Ok(())
        })?;
        Ok(frames)
    }

    /// Capture `frame_count` frames, handing each to `on_frame` as it
    /// arrives.  An error from `on_frame` stops the run.
    ///
    /// A failed trigger reset at the end of an otherwise successful run is
    /// logged and does not fail the run.
    ///
    /// If `on_frame` panics, acquisition is still ended and the trigger
    /// still reset while the panic unwinds.
    #[instrument(skip_all, fields(serial = camera.serial(), frames = self.config.frame_count))]
    pub fn run_with<C, F>(&self, camera: &mut C, mut on_frame: F) -> Result<(), CameraError>
    where
        C: Camera + ?Sized,
        F: FnMut(CameraFrame) -> Result<(), CameraError>,
    {
        format::set_pixel_format(camera.node_map(), self.config.pixel_format)?;
        format::set_buffer_handling(camera.stream_node_map(), self.config.buffer_handling)?;

        let mut session = TriggerSession::start(camera)?;
        let streamed = self.stream(&mut session, &mut on_frame);
        let reset = session.finish();

        match (streamed, reset) {
            (Ok(()), Ok(())) => {
                info!("triggered acquisition complete");
                Ok(())
            }
            (Ok(()), Err(err)) => {
                warn!(error = %err, "acquisition complete but trigger reset failed (non-fatal)");
                Ok(())
            }
            (Err(err), reset) => {
                if let Err(reset_err) = reset {
                    warn!(error = %reset_err, "trigger reset after failed acquisition also failed");
                }
                Err(err)
            }
        }
    }

    fn stream<C, F>(&self, session: &mut TriggerSession<'_, C>, on_frame: &mut F) -> Result<(), CameraError>
    where
        C: Camera + ?Sized,
        F: FnMut(CameraFrame) -> Result<(), CameraError>,
    {
        let mut streaming = Streaming::begin(session)?;
        // On error the guard ends acquisition as it drops.
        self.capture_frames(&mut streaming, on_frame)?;
        streaming.end()
    }

    fn capture_frames<C, F>(&self, streaming: &mut Streaming<'_, '_, C>, on_frame: &mut F) -> Result<(), CameraError>
    where
        C: Camera + ?Sized,
        F: FnMut(CameraFrame) -> Result<(), CameraError>,
    {
        let timeout = self.config.grab_timeout();
        for index in 0..self.config.frame_count {
            let frame = streaming.session.capture(timeout)?;
            debug!(index, timestamp_ns = frame.timestamp_ns, bytes = frame.data.len(), "frame captured");
            on_frame(frame)?;
        }
        Ok(())
    }
}

/// Acquisition in progress on a session's camera.  Ends acquisition on drop
/// unless [`Streaming::end`] already did.
struct Streaming<'s, 'a, C: Camera + ?Sized> {
    session: &'s mut TriggerSession<'a, C>,
    ended: bool,
}

impl<'s, 'a, C: Camera + ?Sized> Streaming<'s, 'a, C> {
    fn begin(session: &'s mut TriggerSession<'a, C>) -> Result<Self, CameraError> {
        session
            .camera()
            .begin_acquisition()
            .map_err(|cause| CameraError::sdk("begin acquisition", cause))?;
        Ok(Self { session, ended: false })
    }

    fn end(mut self) -> Result<(), CameraError> {
        self.ended = true;
        self.session
            .camera()
            .end_acquisition()
            .map_err(|cause| CameraError::sdk("end acquisition", cause))
    }
}

impl<C: Camera + ?Sized> Drop for Streaming<'_, '_, C> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        if let Err(cause) = self.session.camera().end_acquisition() {
            warn!(error = %cause, "end acquisition after interrupted capture failed");
        }
    }
}
