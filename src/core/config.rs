// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Configuration loaded from TOML with per-section defaults

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub encoder: EncoderConfig,
    pub index: IndexConfig,
    pub pipeline: PipelineConfig,
    pub cluster: ClusterConfig,
    pub logging: LoggingConfig,
}

/// Feature extraction and MinHash parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Number of bits used to encode feature ids
    pub hash_bit_size: u32,
    /// Seed mixed into every MinHash round
    pub random_seed: u32,
    pub radius: u32,
    pub min_radius: u32,
    pub distance: u32,
    pub min_distance: u32,
    /// Signature length after shingle compression
    pub num_hash_functions: u32,
    /// Raw minima folded into one signature value
    pub num_hash_shingles: u32,
    /// Sub-hash rounds per feature; 0 means one round per raw slot
    pub num_repeats_hash_function: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            hash_bit_size: 30,
            random_seed: 1,
            radius: 5,
            min_radius: 2,
            distance: 3,
            min_distance: 0,
            num_hash_functions: 400,
            num_hash_shingles: 1,
            num_repeats_hash_function: 0,
        }
    }
}

impl EncoderConfig {
    /// Number of raw MinHash slots before shingle compression
    ///
    /// Saturates on overflow; [`validate`](Self::validate) rejects such configs.
    pub fn num_raw_slots(&self) -> u32 {
        self.num_hash_functions.saturating_mul(self.num_hash_shingles)
    }

    /// Repeat factor actually used: zero or oversized values fall back to one
    /// round per raw slot
    pub fn effective_repeats(&self) -> u32 {
        let full = self.num_raw_slots();
        if self.num_repeats_hash_function == 0 || self.num_repeats_hash_function > full {
            full
        } else {
            self.num_repeats_hash_function
        }
    }

    pub fn hash_bit_mask(&self) -> u32 {
        ((1u64 << self.hash_bit_size) - 1) as u32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_hash_functions == 0 {
            return Err(ConfigError::InvalidParameter(
                "num_hash_functions must be greater than zero".to_string(),
            ));
        }
        if self.num_hash_shingles == 0 {
            return Err(ConfigError::InvalidParameter(
                "num_hash_shingles must be greater than zero".to_string(),
            ));
        }
        let raw_slots = self
            .num_hash_functions
            .checked_mul(self.num_hash_shingles)
            .ok_or_else(|| {
                ConfigError::InvalidParameter(format!(
                    "num_hash_functions {} times num_hash_shingles {} overflows",
                    self.num_hash_functions, self.num_hash_shingles
                ))
            })?;
        let repeats = self.effective_repeats();
        if raw_slots % repeats != 0 {
            return Err(ConfigError::InvalidParameter(format!(
                "num_repeats_hash_function {} must divide {} raw hash slots",
                repeats, raw_slots
            )));
        }
        if self.hash_bit_size == 0 || self.hash_bit_size > 32 {
            return Err(ConfigError::InvalidParameter(format!(
                "hash_bit_size must be in 1..=32, got {}",
                self.hash_bit_size
            )));
        }
        if self.min_radius > self.radius {
            return Err(ConfigError::InvalidParameter(format!(
                "min_radius {} exceeds radius {}",
                self.min_radius, self.radius
            )));
        }
        if self.min_distance > self.distance {
            return Err(ConfigError::InvalidParameter(format!(
                "min_distance {} exceeds distance {}",
                self.min_distance, self.distance
            )));
        }
        Ok(())
    }
}

/// Inverse index and neighborhood parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Bucket capacity; one more insert marks the bucket overflowed
    pub max_bucket_size: usize,
    /// Minimum fraction of informative bands a neighbor must share
    pub pure_approximate_sim: f64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_bucket_size: 1000,
            pure_approximate_sim: 0.5,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bucket_size == 0 {
            return Err(ConfigError::InvalidParameter(
                "max_bucket_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pure_approximate_sim) {
            return Err(ConfigError::InvalidParameter(format!(
                "pure_approximate_sim must be within [0, 1], got {}",
                self.pure_approximate_sim
            )));
        }
        Ok(())
    }
}

/// Ingestion pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Encoder threads; 0 uses the available hardware parallelism
    pub num_threads: usize,
    /// Queue length (in multiples of the encoder count) that blocks producers
    pub high_watermark_factor: usize,
    /// Queue length (in multiples of the encoder count) that releases producers
    pub low_watermark_factor: usize,
    /// Smallest chunk the reader emits; actual sizes are drawn from [min, 3*min]
    pub min_chunk: usize,
    /// Window length applied to each sequence; 0 keeps whole sequences
    pub seq_window: u32,
    /// Step between window starts; 0 means non-overlapping windows
    pub seq_shift: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            high_watermark_factor: 25,
            low_watermark_factor: 10,
            min_chunk: 100,
            seq_window: 0,
            seq_shift: 0,
        }
    }
}

impl PipelineConfig {
    pub fn encoder_threads(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            num_cpus::get()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.low_watermark_factor >= self.high_watermark_factor {
            return Err(ConfigError::InvalidParameter(format!(
                "low_watermark_factor {} must be below high_watermark_factor {}",
                self.low_watermark_factor, self.high_watermark_factor
            )));
        }
        if self.min_chunk == 0 {
            return Err(ConfigError::InvalidParameter(
                "min_chunk must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Compute per-instance densities on the rayon pool
    pub parallel_density: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            parallel_density: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.encoder.validate()?;
        self.index.validate()?;
        self.pipeline.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_effective_repeats() {
        let mut encoder = EncoderConfig {
            num_hash_functions: 8,
            num_hash_shingles: 2,
            ..Default::default()
        };
        assert_eq!(encoder.effective_repeats(), 16);
        encoder.num_repeats_hash_function = 4;
        assert_eq!(encoder.effective_repeats(), 4);
        encoder.num_repeats_hash_function = 100;
        assert_eq!(encoder.effective_repeats(), 16);
    }

    #[test]
    fn test_repeats_must_divide_raw_slots() {
        let mut encoder = EncoderConfig {
            num_hash_functions: 16,
            num_repeats_hash_function: 3,
            ..Default::default()
        };
        assert!(matches!(
            encoder.validate(),
            Err(ConfigError::InvalidParameter(_))
        ));
        encoder.num_repeats_hash_function = 4;
        assert!(encoder.validate().is_ok());
        encoder.num_repeats_hash_function = 17;
        assert!(encoder.validate().is_ok());
    }

    #[test]
    fn test_raw_slot_overflow_rejected() {
        let encoder = EncoderConfig {
            num_hash_functions: u32::MAX,
            num_hash_shingles: 2,
            ..Default::default()
        };
        assert_eq!(encoder.num_raw_slots(), u32::MAX);
        assert!(matches!(
            encoder.validate(),
            Err(ConfigError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_hash_bit_mask() {
        let mut encoder = EncoderConfig::default();
        encoder.hash_bit_size = 4;
        assert_eq!(encoder.hash_bit_mask(), 0xF);
        encoder.hash_bit_size = 32;
        assert_eq!(encoder.hash_bit_mask(), u32::MAX);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut config = Config::default();
        config.index.pure_approximate_sim = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.encoder.min_radius = config.encoder.radius + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.low_watermark_factor = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [encoder]
            num_hash_functions = 16

            [index]
            max_bucket_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.encoder.num_hash_functions, 16);
        assert_eq!(config.encoder.radius, EncoderConfig::default().radius);
        assert_eq!(config.index.max_bucket_size, 50);
        assert_eq!(config.pipeline.high_watermark_factor, 25);
    }
}
