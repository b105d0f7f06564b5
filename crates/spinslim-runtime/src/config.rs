//! Acquisition settings stored as TOML.
//!
//! ```toml
//! pixel_format = "Rgb8"
//! buffer_handling = "NewestOnly"
//! grab_timeout_ms = 1000
//! frame_count = 10
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spinslim_types::{BufferHandlingMode, CameraError, PixelFormat};

/// Settings for one triggered acquisition run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Pixel format written before acquisition begins.
    #[serde(default)]
    pub pixel_format: PixelFormat,

    /// Stream buffer policy written before acquisition begins.
    #[serde(default)]
    pub buffer_handling: BufferHandlingMode,

    /// How long to wait for each triggered frame.
    #[serde(default = "default_grab_timeout_ms")]
    pub grab_timeout_ms: u64,

    /// Number of software triggers fired per run.
    #[serde(default = "default_frame_count")]
    pub frame_count: usize,
}

fn default_grab_timeout_ms() -> u64 {
    1000
}
fn default_frame_count() -> usize {
    1
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::default(),
            buffer_handling: BufferHandlingMode::default(),
            grab_timeout_ms: default_grab_timeout_ms(),
            frame_count: default_frame_count(),
        }
    }
}

impl AcquisitionConfig {
    pub fn grab_timeout(&self) -> Duration {
        Duration::from_millis(self.grab_timeout_ms)
    }

    /// Reject settings that cannot produce a frame.
    pub fn validate(&self) -> Result<(), CameraError> {
        if self.frame_count == 0 {
            return Err(CameraError::Config("frame_count must be at least 1".to_string()));
        }
        if self.grab_timeout_ms == 0 {
            return Err(CameraError::Config("grab_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

/// Load a config from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<AcquisitionConfig>, CameraError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        CameraError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: AcquisitionConfig = toml::from_str(&raw)
        .map_err(|e| CameraError::Config(format!("failed to parse config: {e}")))?;
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Save `cfg` to `path`, creating parent directories as needed.
pub fn save_to(cfg: &AcquisitionConfig, path: &Path) -> Result<(), CameraError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CameraError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| CameraError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        CameraError::Config(format!("failed to write config at {}: {e}", path.display()))
    })
}
