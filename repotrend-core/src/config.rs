use std::time::Duration;

use anyhow::{bail, Result};

/// Pipeline configuration, passed explicitly at construction.
///
/// There are no process-wide constants: every stage receives the values it
/// needs from this structure, and the reference defaults live only here and
/// in the CLI flag definitions.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Length of each sliding count window.
    pub window_length: Duration,
    /// Spacing between consecutive window starts. `window_length` must be a
    /// positive integer multiple of this.
    pub slide_interval: Duration,
    /// Length of one top-K snapshot period. Independent of the window
    /// parameters.
    pub snapshot_period: Duration,
    /// Bound on the number of entries per snapshot.
    pub top_k: usize,
    /// Number of key-partitioned aggregator workers.
    pub parallelism: usize,
    /// Processing-time tick granularity for the worker loops. Must be well
    /// under the slide interval and the snapshot period.
    pub tick_interval: Duration,
    /// Capacity of the bounded channels between stages (backpressure depth).
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_length: Duration::from_secs(600),
            slide_interval: Duration::from_secs(120),
            snapshot_period: Duration::from_secs(120),
            top_k: 10,
            parallelism: 4,
            tick_interval: Duration::from_millis(100),
            channel_capacity: 1024,
        }
    }
}

impl PipelineConfig {
    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.slide_interval.is_zero() {
            bail!("slide interval must be positive");
        }
        if self.window_length.is_zero() {
            bail!("window length must be positive");
        }
        if self.window_length.as_millis() % self.slide_interval.as_millis() != 0 {
            bail!(
                "window length ({:?}) must be an integer multiple of the slide interval ({:?})",
                self.window_length,
                self.slide_interval
            );
        }
        if self.snapshot_period.is_zero() {
            bail!("snapshot period must be positive");
        }
        if self.top_k == 0 {
            bail!("top-k bound must be at least 1");
        }
        if self.parallelism == 0 {
            bail!("parallelism must be at least 1");
        }
        if self.tick_interval.is_zero() {
            bail!("tick interval must be positive");
        }
        if self.channel_capacity == 0 {
            bail!("channel capacity must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_window_must_be_multiple_of_slide() {
        let config = PipelineConfig {
            window_length: Duration::from_secs(10),
            slide_interval: Duration::from_secs(3),
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("integer multiple"));
    }

    #[test]
    fn test_zero_values_rejected() {
        for broken in [
            PipelineConfig {
                top_k: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                parallelism: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                slide_interval: Duration::ZERO,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                snapshot_period: Duration::ZERO,
                ..PipelineConfig::default()
            },
        ] {
            assert!(broken.validate().is_err());
        }
    }
}
