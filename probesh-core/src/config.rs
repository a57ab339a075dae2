//! Encoder configuration.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest number of sets the encoder accepts.
pub const MAX_K: usize = 128;
/// Largest number of light samples per set.
pub const MAX_LIGHT_SAMPLES: usize = 256;

/// Parameters of the set clustering and encoding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncoderConfig {
    /// Number of sets to cluster the capture into.
    pub k: usize,
    /// Balance between geometric (0) and albedo (1) separation.
    pub lambda: f32,
    /// Light samples kept per set.
    pub light_samples: usize,
    /// Importance of albedo differences, in `[0, 1]`.
    pub weight_albedo: f32,
    /// Importance of normal differences, in `[0, 1]`.
    pub weight_normal: f32,
    /// Importance of position differences, in `[0, 1]`.
    pub weight_position: f32,
    /// Only show this set in previews.
    pub isolate_set: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            k: 32,
            lambda: 0.5,
            light_samples: 64,
            weight_albedo: 1.0,
            weight_normal: 1.0,
            weight_position: 1.0,
            isolate_set: None,
        }
    }
}

impl EncoderConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of sets.
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets lambda.
    #[must_use]
    pub fn with_lambda(mut self, lambda: f32) -> Self {
        self.lambda = lambda;
        self
    }

    /// Sets the light sample count.
    #[must_use]
    pub fn with_light_samples(mut self, count: usize) -> Self {
        self.light_samples = count;
        self
    }

    /// Sets the albedo, normal and position importance weights.
    #[must_use]
    pub fn with_weights(mut self, albedo: f32, normal: f32, position: f32) -> Self {
        self.weight_albedo = albedo;
        self.weight_normal = normal;
        self.weight_position = position;
        self
    }

    /// Isolates a set in previews.
    #[must_use]
    pub fn with_isolate_set(mut self, set: Option<usize>) -> Self {
        self.isolate_set = set;
        self
    }

    /// Checks every parameter against its allowed range.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_K).contains(&self.k) {
            return Err(Error::ConfigError(format!(
                "k must be in 1..={MAX_K}, got {}",
                self.k
            )));
        }
        if !(1..=MAX_LIGHT_SAMPLES).contains(&self.light_samples) {
            return Err(Error::ConfigError(format!(
                "light_samples must be in 1..={MAX_LIGHT_SAMPLES}, got {}",
                self.light_samples
            )));
        }
        let unit = [
            ("lambda", self.lambda),
            ("weight_albedo", self.weight_albedo),
            ("weight_normal", self.weight_normal),
            ("weight_position", self.weight_position),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::ConfigError(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if let Some(set) = self.isolate_set {
            if set >= self.k {
                return Err(Error::ConfigError(format!(
                    "isolated set {set} is out of range for k = {}",
                    self.k
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.k, 32);
        assert!((config.lambda - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.light_samples, 64);
        assert!((config.weight_albedo - 1.0).abs() < f32::EPSILON);
        assert!(config.isolate_set.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EncoderConfig::new()
            .with_k(8)
            .with_lambda(0.25)
            .with_light_samples(16)
            .with_weights(0.5, 0.2, 0.1)
            .with_isolate_set(Some(3));

        assert_eq!(config.k, 8);
        assert_eq!(config.light_samples, 16);
        assert!((config.weight_normal - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.isolate_set, Some(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(EncoderConfig::new().with_k(0).validate().is_err());
        assert!(EncoderConfig::new().with_k(129).validate().is_err());
        assert!(EncoderConfig::new().with_lambda(1.5).validate().is_err());
        assert!(EncoderConfig::new().with_light_samples(0).validate().is_err());
        assert!(EncoderConfig::new().with_light_samples(257).validate().is_err());
        assert!(EncoderConfig::new()
            .with_weights(-0.1, 1.0, 1.0)
            .validate()
            .is_err());
        assert!(EncoderConfig::new()
            .with_k(4)
            .with_isolate_set(Some(4))
            .validate()
            .is_err());
    }

    #[test]
    fn test_nan_is_rejected() {
        let err = EncoderConfig::new().with_lambda(f32::NAN).validate();
        assert!(matches!(err, Err(Error::ConfigError(_))));
    }
}
