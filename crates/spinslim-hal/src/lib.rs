//! `spinslim-hal` – camera control over GenICam-style node maps.
//!
//! # Modules
//!
//! - [`node`] – [`Node`] and [`NodeAccess`]: the capability traits a vendor
//!   binding implements, plus lookup-and-validate helpers that turn missing,
//!   read-only, or unreadable nodes into a
//!   [`NodeError`][spinslim_types::NodeError].
//! - [`trigger`] – [`TriggerController`]: the configure → fire → reset state
//!   machine for software-triggered single-frame acquisition.
//! - [`session`] – [`TriggerSession`]: a scoped trigger on one camera that
//!   pairs every fire with one frame and resets on every exit path.
//! - [`format`] – pixel format, stream buffer handling, and image dimension
//!   nodes.
//! - [`camera`] – the [`Camera`] trait implemented by vendor bindings.
//! - [`system`] – [`CameraSystem`]: owns the initialised cameras and routes
//!   per-index operations.
//! - [`sim`] – [`SimNodeMap`][sim::SimNodeMap] and
//!   [`SimCamera`][sim::SimCamera] for tests and CI without hardware.

pub mod camera;
pub mod format;
pub mod node;
pub mod session;
pub mod sim;
pub mod system;
pub mod trigger;

pub use camera::Camera;
pub use node::{Node, NodeAccess};
pub use session::TriggerSession;
pub use system::CameraSystem;
pub use trigger::TriggerController;
