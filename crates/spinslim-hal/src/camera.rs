//! Generic `Camera` trait for an initialised machine-vision device.

use std::time::Duration;

use spinslim_types::{CameraFrame, SdkError};

use crate::node::NodeAccess;

/// One camera handed over by the vendor binding.
///
/// Discovery belongs to the binding; this trait starts at an enumerated
/// device.  Cameras are owned by a
/// [`CameraSystem`][crate::system::CameraSystem], which calls
/// [`init`][Self::init] and [`deinit`][Self::deinit].
pub trait Camera: Send {
    /// Node map type used for both the device and the stream node maps.
    type NodeMap: NodeAccess;

    /// Device serial number, used to identify the camera in logs.
    fn serial(&self) -> &str;

    fn init(&mut self) -> Result<(), SdkError>;

    fn deinit(&mut self) -> Result<(), SdkError>;

    /// GenICam device node map (trigger, pixel format, dimensions).
    fn node_map(&mut self) -> &mut Self::NodeMap;

    /// Transport-layer stream node map (buffer handling).
    fn stream_node_map(&mut self) -> &mut Self::NodeMap;

    fn begin_acquisition(&mut self) -> Result<(), SdkError>;

    fn end_acquisition(&mut self) -> Result<(), SdkError>;

    fn is_streaming(&self) -> bool;

    /// Block until the next frame is available or `timeout` elapses.
    ///
    /// The returned frame owns a copy of the pixel data; the SDK buffer has
    /// already been released.
    ///
    /// # Errors
    ///
    /// Returns the binding's [`SdkError`] on timeout, when the camera is not
    /// streaming, or when the frame is incomplete.
    fn next_image(&mut self, timeout: Duration) -> Result<CameraFrame, SdkError>;
}
