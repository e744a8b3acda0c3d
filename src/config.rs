//! Tunables for the elimination and flat-combining layers.

use core::time::Duration;
use std::time::Instant;

use crate::error::{Error, Result};

/// Parameters of an elimination array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElimConfig {
    /// Number of rendezvous slots.
    pub slots: usize,
    /// How long a pusher waits for a popper, and how long a popper probes for a pusher.
    pub timeout: Duration,
}

impl Default for ElimConfig {
    fn default() -> Self {
        Self {
            slots: 16,
            timeout: Duration::from_micros(100),
        }
    }
}

impl ElimConfig {
    /// Returns a builder starting from the defaults.
    pub fn builder() -> ElimConfigBuilder {
        ElimConfigBuilder::default()
    }

    /// Checks that the configuration can back an elimination array.
    pub fn validate(&self) -> Result<()> {
        if self.slots == 0 {
            return Err(Error::config("elimination array needs at least one slot"));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("elimination timeout must be non-zero"));
        }
        if Instant::now().checked_add(self.timeout).is_none() {
            return Err(Error::config("elimination timeout overflows a deadline"));
        }
        Ok(())
    }
}

/// Builder for [`ElimConfig`].
#[derive(Debug, Default)]
pub struct ElimConfigBuilder {
    config: ElimConfig,
}

impl ElimConfigBuilder {
    /// Sets the number of rendezvous slots.
    pub fn slots(mut self, slots: usize) -> Self {
        self.config.slots = slots;
        self
    }

    /// Sets the rendezvous timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<ElimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Parameters of a flat-combining container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcConfig {
    /// Number of operations the request log can hold over the container's lifetime.
    pub log_capacity: usize,
}

impl Default for FcConfig {
    fn default() -> Self {
        Self {
            log_capacity: 100_000,
        }
    }
}

impl FcConfig {
    /// Returns a builder starting from the defaults.
    pub fn builder() -> FcConfigBuilder {
        FcConfigBuilder::default()
    }

    /// Checks that the configuration can back a request log.
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(Error::config("request log capacity must be non-zero"));
        }
        Ok(())
    }
}

/// Builder for [`FcConfig`].
#[derive(Debug, Default)]
pub struct FcConfigBuilder {
    config: FcConfig,
}

impl FcConfigBuilder {
    /// Sets the request log capacity.
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.config.log_capacity = capacity;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<FcConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ElimConfig::default().validate().is_ok());
        assert!(FcConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_rejects_degenerate_values() {
        assert!(matches!(
            ElimConfig::builder().slots(0).build(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ElimConfig::builder().timeout(Duration::ZERO).build(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ElimConfig::builder().timeout(Duration::MAX).build(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            FcConfig::builder().log_capacity(0).build(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn builder_overrides() {
        let config = ElimConfig::builder()
            .slots(4)
            .timeout(Duration::from_millis(1))
            .build()
            .unwrap();
        assert_eq!(config.slots, 4);
        assert_eq!(config.timeout, Duration::from_millis(1));
        assert_eq!(
            FcConfig::builder().log_capacity(8).build().unwrap().log_capacity,
            8
        );
    }
}
