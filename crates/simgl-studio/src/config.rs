use std::time::Duration;

use anyhow::{Context, Result};
use simgl_engine::logging::LoggingConfig;
use simgl_engine::time::DEFAULT_FRAME_INTERVAL;

/// Studio run parameters.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub surface_width: u32,
    pub surface_height: u32,
    pub frame_interval: Duration,
    /// Frames to render before exiting. `None` runs until killed.
    pub frame_limit: Option<u64>,
    pub logging: LoggingConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            surface_width: 640,
            surface_height: 480,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            frame_limit: Some(300),
            logging: LoggingConfig::default(),
        }
    }
}

impl StudioConfig {
    /// Defaults overridden by `SIMGL_FRAMES` (0 = unlimited) and
    /// `SIMGL_FRAME_MS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SIMGL_FRAMES") {
            let frames: u64 = v.parse().with_context(|| format!("SIMGL_FRAMES={v:?}"))?;
            config.frame_limit = (frames > 0).then_some(frames);
        }
        if let Ok(v) = std::env::var("SIMGL_FRAME_MS") {
            let ms: u64 = v.parse().with_context(|| format!("SIMGL_FRAME_MS={v:?}"))?;
            config.frame_interval = Duration::from_millis(ms.max(1));
        }
        Ok(config)
    }
}
