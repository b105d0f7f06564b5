//! In-process simulation of a camera's node maps for tests and CI without
//! hardware.
//!
//! [`SimNodeMap`] is a [`NodeAccess`] backed by plain maps.  It records every
//! accepted enumeration write and command execution so tests can assert on
//! the exact sequence of values the controller pushed to the device.
//! [`SimCamera`] pairs a device and a stream [`SimNodeMap`] and honours
//! software-trigger semantics when frames are requested.
//!
//! # Example
//!
//! ```rust
//! use spinslim_hal::sim::SimNodeMap;
//! use spinslim_hal::trigger::{TriggerController, TRIGGER_MODE};
//!
//! let mut nodes = SimNodeMap::device();
//! let mut trigger = TriggerController::new();
//! trigger.configure(&mut nodes).unwrap();
//! trigger.reset(&mut nodes).unwrap();
//!
//! assert_eq!(nodes.enum_history(TRIGGER_MODE), vec!["Off", "On", "Off"]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::Utc;
use spinslim_types::{CameraFrame, PixelFormat, SdkError};

use crate::camera::Camera;
use crate::format::{BUFFER_HANDLING_MODE, HEIGHT, PIXEL_FORMAT, WIDTH};
use crate::node::{Node, NodeAccess};
use crate::trigger::{MODE_ON, TRIGGER_MODE, TRIGGER_SOFTWARE, TRIGGER_SOURCE};

/// Vendor-style error codes produced by the simulation.
pub const SDK_ERR_ERROR: i32 = -1001;
pub const SDK_ERR_ACCESS_DENIED: i32 = -1005;
pub const SDK_ERR_INVALID_HANDLE: i32 = -1006;
pub const SDK_ERR_TIMEOUT: i32 = -1011;

/// Device timestamp spacing between simulated frames (100 fps).
const FRAME_INTERVAL_NS: u64 = 10_000_000;

// ────────────────────────────────────────────────────────────────────────────
// Node handles
// ────────────────────────────────────────────────────────────────────────────

/// Access flags of a simulated node or entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeFlags {
    pub available: bool,
    pub readable: bool,
    pub writable: bool,
}

impl NodeFlags {
    pub const READ_WRITE: NodeFlags = NodeFlags {
        available: true,
        readable: true,
        writable: true,
    };
    pub const READ_ONLY: NodeFlags = NodeFlags {
        available: true,
        readable: true,
        writable: false,
    };
    pub const WRITE_ONLY: NodeFlags = NodeFlags {
        available: true,
        readable: false,
        writable: true,
    };
    pub const UNAVAILABLE: NodeFlags = NodeFlags {
        available: false,
        readable: false,
        writable: false,
    };
}

/// Handle returned by every [`SimNodeMap`] lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimHandle {
    node: String,
    entry: Option<String>,
    flags: NodeFlags,
}

impl Node for SimHandle {
    fn is_available(&self) -> bool {
        self.flags.available
    }

    fn is_readable(&self) -> bool {
        self.flags.available && self.flags.readable
    }

    fn is_writable(&self) -> bool {
        self.flags.available && self.flags.writable
    }
}

/// One accepted write or execution, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    EnumWritten { node: String, entry: String },
    CommandExecuted { node: String },
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeEvent::EnumWritten { node, entry } => write!(f, "{node}={entry}"),
            NodeEvent::CommandExecuted { node } => write!(f, "{node}()"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimNodeMap
// ────────────────────────────────────────────────────────────────────────────

struct SimEnumeration {
    flags: NodeFlags,
    entries: Vec<(String, NodeFlags)>,
    current: String,
}

struct SimInteger {
    flags: NodeFlags,
    value: i64,
}

/// In-memory node map recording every accepted write.
#[derive(Default)]
pub struct SimNodeMap {
    enumerations: HashMap<String, SimEnumeration>,
    commands: HashMap<String, NodeFlags>,
    integers: HashMap<String, SimInteger>,
    command_failures: HashMap<String, SdkError>,
    write_failures: HashMap<String, SdkError>,
    read_failures: HashMap<String, SdkError>,
    executed: HashMap<String, usize>,
    events: Vec<NodeEvent>,
}

impl SimNodeMap {
    /// An empty node map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Device node map of a 64×48 camera with software trigger support,
    /// trigger mode off and hardware source `Line0` selected.
    pub fn device() -> Self {
        Self::new()
            .with_enumeration(TRIGGER_MODE, &["Off", "On"], "Off")
            .with_enumeration(TRIGGER_SOURCE, &["Line0", "Line2", "Software"], "Line0")
            .with_command(TRIGGER_SOFTWARE)
            .with_enumeration(PIXEL_FORMAT, &["Mono8", "RGB8"], "Mono8")
            .with_integer(WIDTH, 64)
            .with_integer(HEIGHT, 48)
    }

    /// Stream node map exposing every buffer handling mode.
    pub fn stream() -> Self {
        Self::new().with_enumeration(
            BUFFER_HANDLING_MODE,
            &[
                "NewestFirst",
                "NewestOnly",
                "OldestFirst",
                "OldestFirstOverwrite",
            ],
            "OldestFirst",
        )
    }

    /// Add (or replace) a read/write enumeration whose entries are all
    /// readable.
    pub fn with_enumeration(mut self, name: &str, entries: &[&str], current: &str) -> Self {
        self.enumerations.insert(
            name.to_string(),
            SimEnumeration {
                flags: NodeFlags::READ_WRITE,
                entries: entries
                    .iter()
                    .map(|e| (e.to_string(), NodeFlags::READ_ONLY))
                    .collect(),
                current: current.to_string(),
            },
        );
        self
    }

    pub fn with_command(mut self, name: &str) -> Self {
        self.commands.insert(name.to_string(), NodeFlags::WRITE_ONLY);
        self
    }

    pub fn with_integer(mut self, name: &str, value: i64) -> Self {
        self.integers.insert(
            name.to_string(),
            SimInteger {
                flags: NodeFlags::READ_WRITE,
                value,
            },
        );
        self
    }

    /// Remove the node `name`, whatever its kind.
    pub fn without(mut self, name: &str) -> Self {
        self.enumerations.remove(name);
        self.commands.remove(name);
        self.integers.remove(name);
        self
    }

    /// Override the access flags of node `name`.
    pub fn with_flags(mut self, name: &str, flags: NodeFlags) -> Self {
        if let Some(e) = self.enumerations.get_mut(name) {
            e.flags = flags;
        }
        if let Some(c) = self.commands.get_mut(name) {
            *c = flags;
        }
        if let Some(i) = self.integers.get_mut(name) {
            i.flags = flags;
        }
        self
    }

    /// Override the access flags of one enumeration entry.
    pub fn with_entry_flags(mut self, node: &str, entry: &str, flags: NodeFlags) -> Self {
        if let Some(e) = self.enumerations.get_mut(node) {
            for (name, f) in e.entries.iter_mut() {
                if name == entry {
                    *f = flags;
                }
            }
        }
        self
    }

    /// Make every execution of command `name` fail with `error`.
    pub fn fail_command(mut self, name: &str, error: SdkError) -> Self {
        self.command_failures.insert(name.to_string(), error);
        self
    }

    /// Make every write to enumeration `name` fail with `error`.
    pub fn fail_write(mut self, name: &str, error: SdkError) -> Self {
        self.write_failures.insert(name.to_string(), error);
        self
    }

    /// Make every read of integer `name` fail with `error`.
    pub fn fail_read(mut self, name: &str, error: SdkError) -> Self {
        self.read_failures.insert(name.to_string(), error);
        self
    }

    /// Accepted writes and executions, oldest first.
    pub fn events(&self) -> &[NodeEvent] {
        &self.events
    }

    /// Entries written to enumeration `node`, oldest first.
    pub fn enum_history(&self, node: &str) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                NodeEvent::EnumWritten { node: n, entry } if n == node => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }

    /// Current entry of enumeration `node`.
    pub fn enum_value(&self, node: &str) -> Option<&str> {
        self.enumerations.get(node).map(|e| e.current.as_str())
    }

    /// Number of accepted executions of command `node`.
    pub fn command_count(&self, node: &str) -> usize {
        self.executed.get(node).copied().unwrap_or(0)
    }

    /// Set integer node `name` directly, as the device would.
    pub fn set_integer(&mut self, name: &str, value: i64) {
        if let Some(i) = self.integers.get_mut(name) {
            i.value = value;
        }
    }
}

fn invalid_handle(name: &str) -> SdkError {
    SdkError::new(SDK_ERR_INVALID_HANDLE, format!("node '{name}' not found"))
}

fn access_denied(name: &str) -> SdkError {
    SdkError::new(SDK_ERR_ACCESS_DENIED, format!("node '{name}' is not writable"))
}

impl NodeAccess for SimNodeMap {
    type Enumeration = SimHandle;
    type Entry = SimHandle;
    type Command = SimHandle;
    type Integer = SimHandle;

    fn enumeration_node(&self, name: &str) -> Option<SimHandle> {
        self.enumerations.get(name).map(|e| SimHandle {
            node: name.to_string(),
            entry: None,
            flags: e.flags,
        })
    }

    fn entry(&self, node: &SimHandle, entry_name: &str) -> Option<SimHandle> {
        let enumeration = self.enumerations.get(&node.node)?;
        enumeration
            .entries
            .iter()
            .find(|(name, _)| name == entry_name)
            .map(|(name, flags)| SimHandle {
                node: node.node.clone(),
                entry: Some(name.clone()),
                flags: *flags,
            })
    }

    fn set_enum_value(&mut self, node: &SimHandle, entry: &SimHandle) -> Result<(), SdkError> {
        if let Some(err) = self.write_failures.get(&node.node) {
            return Err(err.clone());
        }
        let entry_name = entry
            .entry
            .as_deref()
            .ok_or_else(|| invalid_handle(&entry.node))?;
        let enumeration = self
            .enumerations
            .get_mut(&node.node)
            .ok_or_else(|| invalid_handle(&node.node))?;
        if !(enumeration.flags.available && enumeration.flags.writable) {
            return Err(access_denied(&node.node));
        }
        enumeration.current = entry_name.to_string();
        self.events.push(NodeEvent::EnumWritten {
            node: node.node.clone(),
            entry: entry_name.to_string(),
        });
        Ok(())
    }

    fn command_node(&self, name: &str) -> Option<SimHandle> {
        self.commands.get(name).map(|flags| SimHandle {
            node: name.to_string(),
            entry: None,
            flags: *flags,
        })
    }

    fn execute_command(&mut self, node: &SimHandle) -> Result<(), SdkError> {
        if let Some(err) = self.command_failures.get(&node.node) {
            return Err(err.clone());
        }
        let flags = self
            .commands
            .get(&node.node)
            .ok_or_else(|| invalid_handle(&node.node))?;
        if !(flags.available && flags.writable) {
            return Err(access_denied(&node.node));
        }
        *self.executed.entry(node.node.clone()).or_insert(0) += 1;
        self.events.push(NodeEvent::CommandExecuted {
            node: node.node.clone(),
        });
        Ok(())
    }

    fn integer_node(&self, name: &str) -> Option<SimHandle> {
        self.integers.get(name).map(|i| SimHandle {
            node: name.to_string(),
            entry: None,
            flags: i.flags,
        })
    }

    fn integer_value(&self, node: &SimHandle) -> Result<i64, SdkError> {
        if let Some(err) = self.read_failures.get(&node.node) {
            return Err(err.clone());
        }
        self.integers
            .get(&node.node)
            .map(|i| i.value)
            .ok_or_else(|| invalid_handle(&node.node))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimCamera
// ────────────────────────────────────────────────────────────────────────────

/// A simulated camera producing solid frames.
///
/// With `TriggerMode = On` a frame is delivered only once per executed
/// `TriggerSoftware` after acquisition began; a request with no pending
/// trigger fails with [`SDK_ERR_TIMEOUT`].  With trigger mode off the camera
/// free-runs and every request succeeds.
pub struct SimCamera {
    serial: String,
    device: SimNodeMap,
    stream: SimNodeMap,
    initialised: bool,
    streaming: bool,
    consumed_triggers: usize,
    frames_delivered: u64,
    init_failure: Option<SdkError>,
    deinit_failure: Option<SdkError>,
}

impl SimCamera {
    /// A camera with the default [`device`][SimNodeMap::device] and
    /// [`stream`][SimNodeMap::stream] node maps.
    pub fn new(serial: impl Into<String>) -> Self {
        Self::with_node_maps(serial, SimNodeMap::device(), SimNodeMap::stream())
    }

    pub fn with_node_maps(serial: impl Into<String>, device: SimNodeMap, stream: SimNodeMap) -> Self {
        Self {
            serial: serial.into(),
            device,
            stream,
            initialised: false,
            streaming: false,
            consumed_triggers: 0,
            frames_delivered: 0,
            init_failure: None,
            deinit_failure: None,
        }
    }

    /// Make [`Camera::init`] fail with `error`.
    pub fn fail_init(mut self, error: SdkError) -> Self {
        self.init_failure = Some(error);
        self
    }

    /// Make [`Camera::deinit`] fail with `error`.  The camera still stops
    /// streaming.
    pub fn fail_deinit(mut self, error: SdkError) -> Self {
        self.deinit_failure = Some(error);
        self
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    fn dimension(&self, name: &str) -> u32 {
        self.device
            .integers
            .get(name)
            .and_then(|i| u32::try_from(i.value).ok())
            .unwrap_or(0)
    }

    fn pending_triggers(&self) -> usize {
        self.device
            .command_count(TRIGGER_SOFTWARE)
            .saturating_sub(self.consumed_triggers)
    }
}

impl Camera for SimCamera {
    type NodeMap = SimNodeMap;

    fn serial(&self) -> &str {
        &self.serial
    }

    fn init(&mut self) -> Result<(), SdkError> {
        if let Some(err) = &self.init_failure {
            return Err(err.clone());
        }
        self.initialised = true;
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), SdkError> {
        self.streaming = false;
        if let Some(err) = &self.deinit_failure {
            return Err(err.clone());
        }
        self.initialised = false;
        Ok(())
    }

    fn node_map(&mut self) -> &mut SimNodeMap {
        &mut self.device
    }

    fn stream_node_map(&mut self) -> &mut SimNodeMap {
        &mut self.stream
    }

    fn begin_acquisition(&mut self) -> Result<(), SdkError> {
        if !self.initialised {
            return Err(SdkError::new(SDK_ERR_ERROR, "camera is not initialised"));
        }
        // Triggers fired while idle produce no frames.
        self.consumed_triggers = self.device.command_count(TRIGGER_SOFTWARE);
        self.streaming = true;
        Ok(())
    }

    fn end_acquisition(&mut self) -> Result<(), SdkError> {
        if !self.streaming {
            return Err(SdkError::new(SDK_ERR_ERROR, "camera is not streaming"));
        }
        self.streaming = false;
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn next_image(&mut self, timeout: Duration) -> Result<CameraFrame, SdkError> {
        if !self.streaming {
            return Err(SdkError::new(SDK_ERR_ERROR, "camera is not streaming"));
        }
        if self.device.enum_value(TRIGGER_MODE) == Some(MODE_ON) {
            if self.pending_triggers() == 0 {
                return Err(SdkError::new(
                    SDK_ERR_TIMEOUT,
                    format!("no image within {} ms", timeout.as_millis()),
                ));
            }
            self.consumed_triggers += 1;
        }

        let pixel_format = match self.device.enum_value(PIXEL_FORMAT) {
            Some("RGB8") => PixelFormat::Rgb8,
            _ => PixelFormat::Mono8,
        };
        let width = self.dimension(WIDTH);
        let height = self.dimension(HEIGHT);
        let len = width as usize * height as usize * pixel_format.bytes_per_pixel();
        let index = self.frames_delivered;
        self.frames_delivered += 1;

        Ok(CameraFrame {
            width,
            height,
            pixel_format,
            timestamp_ns: index * FRAME_INTERVAL_NS,
            received_at: Utc::now(),
            data: vec![index as u8; len],
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[test]
    fn writes_are_recorded_in_order() {
        let mut nodes = SimNodeMap::device();
        node::set_enum_entry(&mut nodes, TRIGGER_MODE, "On").unwrap();
        node::execute(&mut nodes, TRIGGER_SOFTWARE).unwrap();
        node::set_enum_entry(&mut nodes, TRIGGER_MODE, "Off").unwrap();

        let events: Vec<String> = nodes.events().iter().map(ToString::to_string).collect();
        assert_eq!(events, vec!["TriggerMode=On", "TriggerSoftware()", "TriggerMode=Off"]);
        assert_eq!(nodes.enum_value(TRIGGER_MODE), Some("Off"));
    }

    #[test]
    fn failed_write_is_not_recorded() {
        let mut nodes = SimNodeMap::device()
            .fail_write(PIXEL_FORMAT, SdkError::new(SDK_ERR_ACCESS_DENIED, "streaming"));
        assert!(node::set_enum_entry(&mut nodes, PIXEL_FORMAT, "RGB8").is_err());
        assert!(nodes.enum_history(PIXEL_FORMAT).is_empty());
        assert_eq!(nodes.enum_value(PIXEL_FORMAT), Some("Mono8"));
    }

    #[test]
    fn unavailable_flags_hide_capabilities() {
        let nodes = SimNodeMap::device().with_flags(TRIGGER_SOFTWARE, NodeFlags::UNAVAILABLE);
        let handle = nodes.command_node(TRIGGER_SOFTWARE).unwrap();
        assert!(!handle.is_available());
        assert!(!handle.is_writable());
    }

    #[test]
    fn free_running_camera_always_delivers() {
        let mut cam = SimCamera::new("sim-0");
        cam.init().unwrap();
        cam.begin_acquisition().unwrap();
        let a = cam.next_image(TIMEOUT).unwrap();
        let b = cam.next_image(TIMEOUT).unwrap();
        assert_eq!((a.width, a.height), (64, 48));
        assert_eq!(a.data.len(), 64 * 48);
        assert!(b.timestamp_ns > a.timestamp_ns);
    }

    #[test]
    fn triggered_camera_delivers_one_frame_per_trigger() {
        let mut cam = SimCamera::new("sim-0");
        cam.init().unwrap();
        node::set_enum_entry(cam.node_map(), TRIGGER_MODE, "On").unwrap();
        cam.begin_acquisition().unwrap();

        let err = cam.next_image(TIMEOUT).unwrap_err();
        assert_eq!(err.code, SDK_ERR_TIMEOUT);

        node::execute(cam.node_map(), TRIGGER_SOFTWARE).unwrap();
        cam.next_image(TIMEOUT).unwrap();
        assert_eq!(cam.next_image(TIMEOUT).unwrap_err().code, SDK_ERR_TIMEOUT);
    }

    #[test]
    fn triggers_fired_while_idle_are_dropped() {
        let mut cam = SimCamera::new("sim-0");
        cam.init().unwrap();
        node::set_enum_entry(cam.node_map(), TRIGGER_MODE, "On").unwrap();
        node::execute(cam.node_map(), TRIGGER_SOFTWARE).unwrap();
        cam.begin_acquisition().unwrap();
        assert!(cam.next_image(TIMEOUT).is_err());
    }

    #[test]
    fn rgb_frames_carry_three_bytes_per_pixel() {
        let mut cam = SimCamera::new("sim-0");
        cam.init().unwrap();
        node::set_enum_entry(cam.node_map(), PIXEL_FORMAT, "RGB8").unwrap();
        cam.begin_acquisition().unwrap();
        let frame = cam.next_image(TIMEOUT).unwrap();
        assert_eq!(frame.pixel_format, PixelFormat::Rgb8);
        assert_eq!(frame.data.len(), 64 * 48 * 3);
    }

    #[test]
    fn acquisition_requires_init() {
        let mut cam = SimCamera::new("sim-0");
        assert!(cam.begin_acquisition().is_err());
        assert!(cam.next_image(TIMEOUT).is_err());
    }

    #[test]
    fn failed_deinit_still_stops_streaming() {
        let mut cam = SimCamera::new("sim-0").fail_deinit(SdkError::new(SDK_ERR_ERROR, "busy"));
        cam.init().unwrap();
        cam.begin_acquisition().unwrap();
        assert_eq!(cam.deinit().unwrap_err().code, SDK_ERR_ERROR);
        assert!(!cam.is_streaming());
    }
}
