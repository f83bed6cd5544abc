//! Pipeline configuration
//!
//! Timing knobs and queue sizes, loaded from YAML. Encoder and capture policy
//! are not configurable; see [`crate::types::EncoderSettings`].
//!
//! ```yaml
//! staleness_window_ms: 1000
//! watchdog_interval_ms: 500
//! decode_queue_depth: 8
//! initial_camera: front
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::decode::DEFAULT_QUEUE_DEPTH;
use crate::types::CameraPosition;
use crate::{MediaError, Result};

/// Runtime configuration for [`crate::VideoCallPipeline`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Remote frames older than this are cleared from display
    pub staleness_window_ms: u64,
    /// How often the watchdog checks the remote frame's age
    pub watchdog_interval_ms: u64,
    /// Remote payloads buffered ahead of the decoder
    pub decode_queue_depth: usize,
    /// Camera used by the first capture session
    pub initial_camera: CameraPosition,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staleness_window_ms: 1000,
            watchdog_interval_ms: 500,
            decode_queue_depth: DEFAULT_QUEUE_DEPTH,
            initial_camera: CameraPosition::Front,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| MediaError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject values that would disable the watchdog or the decode queue.
    pub fn validate(&self) -> Result<()> {
        if self.staleness_window_ms == 0 {
            return Err(MediaError::config("staleness_window_ms", "must be greater than zero"));
        }
        if self.watchdog_interval_ms == 0 {
            return Err(MediaError::config("watchdog_interval_ms", "must be greater than zero"));
        }
        if self.decode_queue_depth == 0 {
            return Err(MediaError::config("decode_queue_depth", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_millis(self.staleness_window_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorClass;
    use std::io::Write;

    #[test]
    fn defaults_match_call_timing() {
        let config = PipelineConfig::default();
        assert_eq!(config.staleness_window(), Duration::from_secs(1));
        assert_eq!(config.watchdog_interval(), Duration::from_millis(500));
        assert_eq!(config.decode_queue_depth, 8);
        assert_eq!(config.initial_camera, CameraPosition::Front);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = PipelineConfig::from_yaml_str("initial_camera: back\n").unwrap();
        assert_eq!(config.initial_camera, CameraPosition::Back);
        assert_eq!(config.staleness_window_ms, 1000);
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = PipelineConfig::from_yaml_str("watchdog_interval_ms: 0\n").unwrap_err();
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(err.to_string().contains("watchdog_interval_ms"));

        assert!(PipelineConfig::from_yaml_str("decode_queue_depth: 0\n").is_err());
        assert!(PipelineConfig::from_yaml_str("staleness_window_ms: 0\n").is_err());
    }

    #[test]
    fn unknown_keys_and_bad_values_fail_to_parse() {
        assert!(PipelineConfig::from_yaml_str("bitrate: 5\n").is_err());
        assert!(PipelineConfig::from_yaml_str("initial_camera: side\n").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "staleness_window_ms: 2000").unwrap();
        writeln!(file, "decode_queue_depth: 4").unwrap();

        let config = PipelineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.staleness_window(), Duration::from_secs(2));
        assert_eq!(config.decode_queue_depth, 4);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PipelineConfig::from_path("/nonexistent/pipeline.yaml").unwrap_err();
        assert!(matches!(err, MediaError::File { .. }));
        assert!(err.to_string().contains("pipeline.yaml"));
    }
}
