use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::AnalyzeError;

/// Codec parsers available to an analysis, fixed before the first tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Parse AVC payloads. When off, AVC is treated like any other
    /// unsupported codec.
    pub h264: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self { h264: true }
    }
}

/// Tunables of an analysis.
///
/// Missing fields take their defaults when deserialized, so a partial JSON
/// object such as `{"window_ms": 500}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Width of a bitrate bucket.
    pub window_ms: u32,
    /// Allowed difference between the metadata duration and the observed
    /// one before a warning is raised.
    pub duration_tolerance_ms: u32,
    /// Tags buffered between reader and analyzer in threaded mode.
    pub queue_capacity: usize,
    /// Bytes requested from the source per read.
    pub read_chunk_size: usize,
    pub capabilities: Capabilities,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_ms: 1000,
            duration_tolerance_ms: 1000,
            queue_capacity: 64,
            read_chunk_size: flv::reader::DEFAULT_CHUNK_SIZE,
            capabilities: Capabilities::default(),
        }
    }
}

impl Display for AnalyzerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AnalyzerConfig {{ window: {}ms, duration tolerance: {}ms, queue: {}, chunk: {} bytes, h264: {} }}",
            self.window_ms,
            self.duration_tolerance_ms,
            self.queue_capacity,
            self.read_chunk_size,
            self.capabilities.h264
        )
    }
}

impl AnalyzerConfig {
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::default()
    }

    /// Loads a configuration from JSON and validates it.
    pub fn from_json(json: &str) -> Result<Self, AnalyzeError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| AnalyzeError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalyzeError> {
        if self.window_ms == 0 {
            return Err(AnalyzeError::Config("window_ms must be greater than 0".into()));
        }
        if self.queue_capacity == 0 {
            return Err(AnalyzeError::Config(
                "queue_capacity must be greater than 0".into(),
            ));
        }
        if self.read_chunk_size == 0 {
            return Err(AnalyzeError::Config(
                "read_chunk_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn window_ms(mut self, window_ms: u32) -> Self {
        self.config.window_ms = window_ms;
        self
    }

    pub fn duration_tolerance_ms(mut self, tolerance_ms: u32) -> Self {
        self.config.duration_tolerance_ms = tolerance_ms;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn read_chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.read_chunk_size = chunk_size;
        self
    }

    pub fn h264(mut self, enabled: bool) -> Self {
        self.config.capabilities.h264 = enabled;
        self
    }

    pub fn build(self) -> AnalyzerConfig {
        self.config
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();

        assert_eq!(config.window_ms, 1000);
        assert_eq!(config.duration_tolerance_ms, 1000);
        assert_eq!(config.queue_capacity, 64);
        assert!(config.capabilities.h264);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config =
            AnalyzerConfig::from_json(r#"{"window_ms": 500, "capabilities": {"h264": false}}"#)
                .unwrap();

        assert_eq!(config.window_ms, 500);
        assert_eq!(config.queue_capacity, 64);
        assert!(!config.capabilities.h264);
    }

    #[test]
    fn test_invalid_values() {
        for config in [
            AnalyzerConfig::builder().window_ms(0).build(),
            AnalyzerConfig::builder().queue_capacity(0).build(),
            AnalyzerConfig::builder().read_chunk_size(0).build(),
        ] {
            assert!(matches!(config.validate(), Err(AnalyzeError::Config(_))), "{config}");
        }

        assert!(matches!(
            AnalyzerConfig::from_json(r#"{"window_ms": 0}"#),
            Err(AnalyzeError::Config(_))
        ));
        assert!(matches!(
            AnalyzerConfig::from_json("not json"),
            Err(AnalyzeError::Config(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AnalyzerConfig::default().to_string(),
            "AnalyzerConfig { window: 1000ms, duration tolerance: 1000ms, queue: 64, chunk: 65536 bytes, h264: true }"
        );
    }
}
