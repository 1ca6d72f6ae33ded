//! Packet cache configuration

use std::time::Duration;

use crate::error::{CacheError, Result};

/// Idle packets the trim timer always leaves in a cache
pub const DEFAULT_LOW_WATER_MARK: usize = 10;

/// Interval between trim timer ticks
pub const DEFAULT_TRIM_INTERVAL: Duration = Duration::from_secs(1);

/// Payload alignment; size classes are rounded up to a multiple of it
pub const DEFAULT_ALIGNMENT: usize = 64;

/// Configuration for one packet cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Name shown in diagnostics
    pub name: String,
    /// Requested payload size in bytes
    pub size_class: usize,
    /// Alignment of payload storage
    pub alignment: usize,
    /// Idle count the trim timer will not evict below
    pub low_water_mark: usize,
    /// Trim timer period; `None` leaves ticking to the caller
    pub trim_interval: Option<Duration>,
    /// Packets allocated onto the free list at creation
    pub initial_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            size_class: 2048,
            alignment: DEFAULT_ALIGNMENT,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            trim_interval: Some(DEFAULT_TRIM_INTERVAL),
            initial_count: 0,
        }
    }
}

impl CacheConfig {
    /// Create a configuration for the given payload size
    pub fn new(name: impl Into<String>, size_class: usize) -> Self {
        Self {
            name: name.into(),
            size_class,
            ..Default::default()
        }
    }

    /// Set payload alignment
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the low-water mark
    pub fn with_low_water_mark(mut self, mark: usize) -> Self {
        self.low_water_mark = mark;
        self
    }

    /// Set the trim interval
    pub fn with_trim_interval(mut self, interval: Option<Duration>) -> Self {
        self.trim_interval = interval;
        self
    }

    /// Set the number of packets allocated at creation
    pub fn with_initial_count(mut self, count: usize) -> Self {
        self.initial_count = count;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.size_class == 0 {
            return Err(CacheError::invalid_parameter(
                "size_class",
                "Size class cannot be zero",
            ));
        }

        if !self.alignment.is_power_of_two() {
            return Err(CacheError::invalid_parameter(
                "alignment",
                "Alignment must be a power of two",
            ));
        }

        if self.size_class.checked_add(self.alignment - 1).is_none() {
            return Err(CacheError::invalid_parameter(
                "size_class",
                "Size class overflows when aligned",
            ));
        }

        if self.trim_interval == Some(Duration::ZERO) {
            return Err(CacheError::invalid_parameter(
                "trim_interval",
                "Trim interval cannot be zero",
            ));
        }

        Ok(())
    }

    /// Payload size actually allocated: `size_class` rounded up to `alignment`
    pub fn aligned_size(&self) -> usize {
        (self.size_class + self.alignment - 1) & !(self.alignment - 1)
    }
}

/// Builder for [`CacheConfig`]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>, size_class: usize) -> Self {
        Self {
            config: CacheConfig::new(name, size_class),
        }
    }

    pub fn alignment(mut self, alignment: usize) -> Self {
        self.config.alignment = alignment;
        self
    }

    pub fn low_water_mark(mut self, mark: usize) -> Self {
        self.config.low_water_mark = mark;
        self
    }

    pub fn trim_interval(mut self, interval: Duration) -> Self {
        self.config.trim_interval = Some(interval);
        self
    }

    /// Disable the trim timer thread
    pub fn manual_trim(mut self) -> Self {
        self.config.trim_interval = None;
        self
    }

    pub fn initial_count(mut self, count: usize) -> Self {
        self.config.initial_count = count;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<CacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
