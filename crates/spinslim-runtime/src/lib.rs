//! `spinslim-runtime` – process-level glue around `spinslim-hal`.
//!
//! # Modules
//!
//! - [`acquisition`] – [`TriggeredAcquisition`][acquisition::TriggeredAcquisition]:
//!   applies pixel format and buffer handling, arms the software trigger,
//!   and runs fire/retrieve pairs with guaranteed cleanup.
//! - [`config`] – [`AcquisitionConfig`][config::AcquisitionConfig]: TOML
//!   settings for a run.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber.

pub mod acquisition;
pub mod config;
pub mod telemetry;

pub use acquisition::TriggeredAcquisition;
pub use config::AcquisitionConfig;
pub use telemetry::{LogFormat, init_tracing};
