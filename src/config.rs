//! Configuration types and validation for the detection engine

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Global analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Raster resolution used for page rendering and visual comparison
    pub render_dpi: u32,
    /// Pages with SSIM below this value are flagged as significantly different
    pub ssim_threshold: f64,
    /// Pages with a mean pixel difference above this value are flagged
    pub pixel_diff_threshold: f64,
    /// Wall-clock timeout applied to each external tool invocation, seconds
    pub tool_timeout_secs: u64,
    /// When false, the external-signal stage is skipped entirely
    pub enable_external_tools: bool,
    /// Root directory for per-run temporary directories; defaults to the
    /// system temp dir when unset
    pub temp_root: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            render_dpi: 150,
            ssim_threshold: 0.95,
            pixel_diff_threshold: 0.05,
            tool_timeout_secs: 30,
            enable_external_tools: true,
            temp_root: None,
        }
    }
}

impl AnalysisConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.render_dpi == 0 || self.render_dpi > 1200 {
            return Err(Error::ConfigError(format!(
                "render_dpi out of range: {}",
                self.render_dpi
            )));
        }
        if !(0.0..=1.0).contains(&self.ssim_threshold) {
            return Err(Error::ConfigError("ssim_threshold must be in [0,1]".into()));
        }
        if !(0.0..=1.0).contains(&self.pixel_diff_threshold) {
            return Err(Error::ConfigError(
                "pixel_diff_threshold must be in [0,1]".into(),
            ));
        }
        if self.tool_timeout_secs == 0 {
            return Err(Error::ConfigError("tool_timeout_secs must be nonzero".into()));
        }
        Ok(())
    }
}
