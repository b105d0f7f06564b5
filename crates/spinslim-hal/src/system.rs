//! [`CameraSystem`] – the initialised cameras of one process, addressed by
//! index.
//!
//! The system takes ownership of the cameras the vendor binding enumerated,
//! initialises them, and routes the per-camera setters (pixel format, buffer
//! handling, acquisition, frame retrieval) to the camera at a given index.
//! Every camera is deinitialised by [`shutdown`][CameraSystem::shutdown], or
//! on drop if `shutdown` was never called.

use std::time::Duration;

use spinslim_types::{BufferHandlingMode, CameraError, CameraFrame, PixelFormat, SdkError};
use tracing::{debug, error, info, instrument, warn};

use crate::camera::Camera;
use crate::format;
use crate::session::TriggerSession;

/// Owner of every camera in use, indexed in enumeration order.
pub struct CameraSystem<C: Camera> {
    cameras: Vec<C>,
}

impl<C: Camera> CameraSystem<C> {
    /// Initialise every camera in `cameras`.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::Sdk`] for the first camera that fails to
    /// initialise.  Cameras initialised before it are deinitialised again.
    pub fn new(mut cameras: Vec<C>) -> Result<Self, CameraError> {
        for index in 0..cameras.len() {
            if let Err(cause) = cameras[index].init() {
                error!(index, serial = cameras[index].serial(), error = %cause, "camera init failed");
                for cam in cameras.iter_mut().take(index) {
                    if let Err(e) = cam.deinit() {
                        warn!(serial = cam.serial(), error = %e, "deinit after failed init failed");
                    }
                }
                return Err(CameraError::sdk("camera init", cause));
            }
            info!(index, serial = cameras[index].serial(), "camera initialised");
        }
        Ok(Self { cameras })
    }

    /// Number of cameras under management.
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    /// `true` if the system manages no cameras.
    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// The camera at `index`.
    ///
    /// # Errors
    ///
    /// [`CameraError::CameraNotFound`] when `index` is out of range.
    pub fn camera_mut(&mut self, index: usize) -> Result<&mut C, CameraError> {
        let count = self.cameras.len();
        self.cameras
            .get_mut(index)
            .ok_or(CameraError::CameraNotFound { index, count })
    }

    // ------------------------------------------------------------------
    // Pixel format
    // ------------------------------------------------------------------

    pub fn set_pixel_format(&mut self, index: usize, fmt: PixelFormat) -> Result<(), CameraError> {
        let cam = self.camera_mut(index)?;
        format::set_pixel_format(cam.node_map(), fmt)?;
        Ok(())
    }

    pub fn set_rgb(&mut self, index: usize) -> Result<(), CameraError> {
        self.set_pixel_format(index, PixelFormat::Rgb8)
    }

    pub fn set_mono(&mut self, index: usize) -> Result<(), CameraError> {
        self.set_pixel_format(index, PixelFormat::Mono8)
    }

    // ------------------------------------------------------------------
    // Buffer handling
    // ------------------------------------------------------------------

    pub fn set_buffer_handling(
        &mut self,
        index: usize,
        mode: BufferHandlingMode,
    ) -> Result<(), CameraError> {
        let cam = self.camera_mut(index)?;
        format::set_buffer_handling(cam.stream_node_map(), mode)?;
        Ok(())
    }

    pub fn set_newest_first(&mut self, index: usize) -> Result<(), CameraError> {
        self.set_buffer_handling(index, BufferHandlingMode::NewestFirst)
    }

    pub fn set_newest_only(&mut self, index: usize) -> Result<(), CameraError> {
        self.set_buffer_handling(index, BufferHandlingMode::NewestOnly)
    }

    pub fn set_oldest_first(&mut self, index: usize) -> Result<(), CameraError> {
        self.set_buffer_handling(index, BufferHandlingMode::OldestFirst)
    }

    pub fn set_oldest_first_overwrite(&mut self, index: usize) -> Result<(), CameraError> {
        self.set_buffer_handling(index, BufferHandlingMode::OldestFirstOverwrite)
    }

    // ------------------------------------------------------------------
    // Acquisition
    // ------------------------------------------------------------------

    pub fn begin_acquisition(&mut self, index: usize) -> Result<(), CameraError> {
        self.camera_mut(index)?
            .begin_acquisition()
            .map_err(|cause| CameraError::sdk("begin acquisition", cause))
    }

    pub fn end_acquisition(&mut self, index: usize) -> Result<(), CameraError> {
        self.camera_mut(index)?
            .end_acquisition()
            .map_err(|cause| CameraError::sdk("end acquisition", cause))
    }

    /// Retrieve the next frame of camera `index`, waiting up to `timeout`.
    pub fn next_image(&mut self, index: usize, timeout: Duration) -> Result<CameraFrame, CameraError> {
        self.camera_mut(index)?
            .next_image(timeout)
            .map_err(|cause| CameraError::sdk("retrieve image", cause))
    }

    /// Image size of camera `index` as `(height, width)`.
    pub fn image_dims(&mut self, index: usize) -> Result<(u32, u32), CameraError> {
        let cam = self.camera_mut(index)?;
        Ok(format::image_dims(cam.node_map())?)
    }

    /// Arm the software trigger on camera `index`.
    pub fn trigger_session(&mut self, index: usize) -> Result<TriggerSession<'_, C>, CameraError> {
        let cam = self.camera_mut(index)?;
        Ok(TriggerSession::start(cam)?)
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    /// Stop streaming cameras and deinitialise every camera.
    ///
    /// Every camera is attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// [`CameraError::Shutdown`] listing `(index, cause)` for each failure.
    #[instrument(skip_all, fields(cameras = self.cameras.len()))]
    pub fn shutdown(mut self) -> Result<(), CameraError> {
        let failures = release_all(&mut self.cameras);
        if failures.is_empty() {
            info!("camera system shut down");
            Ok(())
        } else {
            Err(CameraError::Shutdown(failures))
        }
    }
}

impl<C: Camera> Drop for CameraSystem<C> {
    fn drop(&mut self) {
        if self.cameras.is_empty() {
            return;
        }
        let failures = release_all(&mut self.cameras);
        if !failures.is_empty() {
            warn!(failed = failures.len(), "camera release on drop failed");
        }
    }
}

/// Drain `cameras`, ending acquisition and deinitialising each.
fn release_all<C: Camera>(cameras: &mut Vec<C>) -> Vec<(usize, SdkError)> {
    let mut failures = Vec::new();
    for (index, mut cam) in cameras.drain(..).enumerate() {
        if cam.is_streaming() {
            if let Err(cause) = cam.end_acquisition() {
                warn!(index, serial = cam.serial(), error = %cause, "end acquisition failed");
                failures.push((index, cause));
            }
        }
        match cam.deinit() {
            Ok(()) => debug!(index, serial = cam.serial(), "camera deinitialised"),
            Err(cause) => {
                warn!(index, serial = cam.serial(), error = %cause, "deinit failed");
                failures.push((index, cause));
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{BUFFER_HANDLING_MODE, PIXEL_FORMAT};
    use crate::sim::{SimCamera, SimNodeMap};
    use crate::trigger::TRIGGER_MODE;

    const TIMEOUT: Duration = Duration::from_millis(20);

    fn two_cameras() -> CameraSystem<SimCamera> {
        CameraSystem::new(vec![SimCamera::new("cam-0"), SimCamera::new("cam-1")]).unwrap()
    }

    #[test]
    fn new_initialises_every_camera() {
        let mut system = two_cameras();
        assert_eq!(system.len(), 2);
        assert!(!system.is_empty());
        assert!(system.camera_mut(0).unwrap().is_initialised());
        assert!(system.camera_mut(1).unwrap().is_initialised());
    }

    #[test]
    fn failed_init_is_reported() {
        let result = CameraSystem::new(vec![
            SimCamera::new("cam-0"),
            SimCamera::new("cam-1").fail_init(SdkError::new(-1004, "resource in use")),
        ]);
        match result {
            Err(CameraError::Sdk { operation, cause }) => {
                assert_eq!(operation, "camera init");
                assert_eq!(cause.code, -1004);
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn out_of_range_index_is_camera_not_found() {
        let mut system = two_cameras();
        assert!(matches!(
            system.set_rgb(5),
            Err(CameraError::CameraNotFound { index: 5, count: 2 })
        ));
    }

    #[test]
    fn setters_reach_the_addressed_camera_only() {
        let mut system = two_cameras();
        system.set_rgb(1).unwrap();
        system.set_newest_only(1).unwrap();

        let cam1 = system.camera_mut(1).unwrap();
        assert_eq!(cam1.node_map().enum_value(PIXEL_FORMAT), Some("RGB8"));
        assert_eq!(cam1.stream_node_map().enum_value(BUFFER_HANDLING_MODE), Some("NewestOnly"));

        let cam0 = system.camera_mut(0).unwrap();
        assert_eq!(cam0.node_map().enum_value(PIXEL_FORMAT), Some("Mono8"));
    }

    #[test]
    fn every_buffer_mode_shorthand_is_applied() {
        let mut system = two_cameras();
        let cases: [(fn(&mut CameraSystem<SimCamera>, usize) -> Result<(), CameraError>, &str); 4] = [
            (CameraSystem::set_newest_first, "NewestFirst"),
            (CameraSystem::set_newest_only, "NewestOnly"),
            (CameraSystem::set_oldest_first, "OldestFirst"),
            (CameraSystem::set_oldest_first_overwrite, "OldestFirstOverwrite"),
        ];
        for (set, expected) in cases {
            set(&mut system, 0).unwrap();
            let cam = system.camera_mut(0).unwrap();
            assert_eq!(cam.stream_node_map().enum_value(BUFFER_HANDLING_MODE), Some(expected));
        }
    }

    #[test]
    fn set_mono_and_image_dims() {
        let mut system = two_cameras();
        system.set_mono(0).unwrap();
        assert_eq!(system.image_dims(0).unwrap(), (48, 64));
    }

    #[test]
    fn free_running_acquisition_round() {
        let mut system = two_cameras();
        system.begin_acquisition(0).unwrap();
        let frame = system.next_image(0, TIMEOUT).unwrap();
        assert_eq!(frame.data.len(), 64 * 48);
        system.end_acquisition(0).unwrap();
        assert!(system.next_image(0, TIMEOUT).is_err());
    }

    #[test]
    fn trigger_session_through_system() {
        let mut system = two_cameras();
        system.begin_acquisition(0).unwrap();
        {
            let mut session = system.trigger_session(0).unwrap();
            session.capture(TIMEOUT).unwrap();
            session.finish().unwrap();
        }
        let cam = system.camera_mut(0).unwrap();
        assert_eq!(cam.node_map().enum_history(TRIGGER_MODE), vec!["Off", "On", "Off"]);
    }

    #[test]
    fn trigger_session_on_camera_without_trigger_fails() {
        let device = SimNodeMap::device().without(TRIGGER_MODE);
        let cam = SimCamera::with_node_maps("cam-0", device, SimNodeMap::stream());
        let mut system = CameraSystem::new(vec![cam]).unwrap();
        assert!(matches!(
            system.trigger_session(0),
            Err(CameraError::Trigger(_))
        ));
    }

    #[test]
    fn shutdown_stops_streaming_and_succeeds() {
        let mut system = two_cameras();
        system.begin_acquisition(1).unwrap();
        system.shutdown().unwrap();
    }

    #[test]
    fn shutdown_reports_every_failed_camera() {
        let system = CameraSystem::new(vec![
            SimCamera::new("cam-0").fail_deinit(SdkError::new(-1010, "device removed")),
            SimCamera::new("cam-1"),
            SimCamera::new("cam-2").fail_deinit(SdkError::new(-1004, "resource in use")),
        ])
        .unwrap();

        match system.shutdown() {
            Err(CameraError::Shutdown(failures)) => {
                let reported: Vec<(usize, i32)> =
                    failures.iter().map(|(index, cause)| (*index, cause.code)).collect();
                assert_eq!(reported, vec![(0, -1010), (2, -1004)]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
