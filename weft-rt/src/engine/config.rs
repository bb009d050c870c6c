//! Engine configuration with sensible defaults.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::event::BUCKET_BYTES;

/// Default per-producer mailbox ring capacity, in buckets.
///
/// Sized so a ring can absorb four maximum-span events per producer.
pub const DEFAULT_MAILBOX_CAPACITY: usize = (u16::MAX as usize + 1) / BUCKET_BYTES * 4;

/// How a core waits when a tick moved no events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitMode {
    /// Spin. Lowest latency, one busy CPU per core.
    LowLatency,
    /// Spin briefly, then yield, then sleep in short naps.
    Friendly,
}

/// Engine-wide configuration.
///
/// The core consults no environment variables; everything is explicit
/// here.
///
/// # Examples
///
/// ```rust
/// use weft_rt::engine::{EngineConfig, WaitMode, DEFAULT_MAILBOX_CAPACITY};
///
/// let config = EngineConfig::default();
/// assert_eq!(config.mailbox_capacity, DEFAULT_MAILBOX_CAPACITY);
///
/// let config = EngineConfig::builder()
///     .with_mailbox_capacity(8192)
///     .with_wait_mode(WaitMode::LowLatency)
///     .build()
///     .unwrap();
/// assert_eq!(config.mailbox_capacity, 8192);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-producer mailbox ring capacity in buckets (power of two).
    pub mailbox_capacity: usize,

    /// Idle-wait behavior of the core loops.
    pub wait_mode: WaitMode,

    /// Process signals translated into `SignalEvent` broadcasts. Empty
    /// disables signal handling entirely.
    pub signals: Vec<i32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            wait_mode: WaitMode::Friendly,
            signals: default_signals(),
        }
    }
}

fn default_signals() -> Vec<i32> {
    #[cfg(unix)]
    {
        vec![nix::libc::SIGINT]
    }
    #[cfg(not(unix))]
    {
        Vec::new()
    }
}

impl EngineConfig {
    /// Create a configuration builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.mailbox_capacity < 8 {
            return Err("mailbox_capacity must be at least 8 buckets".to_string());
        }
        if !self.mailbox_capacity.is_power_of_two() {
            return Err("mailbox_capacity must be a power of two".to_string());
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    mailbox_capacity: Option<usize>,
    wait_mode: Option<WaitMode>,
    signals: Option<Vec<i32>>,
}

impl EngineConfigBuilder {
    /// Per-producer mailbox ring capacity in buckets.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = Some(capacity);
        self
    }

    /// Idle-wait behavior.
    pub fn with_wait_mode(mut self, mode: WaitMode) -> Self {
        self.wait_mode = Some(mode);
        self
    }

    /// Signals to trap and broadcast.
    pub fn with_signals(mut self, signals: Vec<i32>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<EngineConfig, String> {
        let config = EngineConfig {
            mailbox_capacity: self.mailbox_capacity.unwrap_or(DEFAULT_MAILBOX_CAPACITY),
            wait_mode: self.wait_mode.unwrap_or(WaitMode::Friendly),
            signals: self.signals.unwrap_or_else(default_signals),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::builder()
            .with_mailbox_capacity(1024)
            .with_wait_mode(WaitMode::LowLatency)
            .with_signals(Vec::new())
            .build()
            .unwrap();
        assert_eq!(config.mailbox_capacity, 1024);
        assert_eq!(config.wait_mode, WaitMode::LowLatency);
        assert!(config.signals.is_empty());
    }

    #[test]
    fn test_non_power_of_two_rejected() {
        assert!(EngineConfig::builder()
            .with_mailbox_capacity(1000)
            .build()
            .is_err());
    }

    #[test]
    fn test_tiny_capacity_rejected() {
        assert!(EngineConfig::builder().with_mailbox_capacity(4).build().is_err());
    }
}
