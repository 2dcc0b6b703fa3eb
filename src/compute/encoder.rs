// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Sequence to MinHash signature encoder
//!
//! Encoding runs in three steps:
//! 1. rolling hash codes for every offset and radius
//! 2. endpoint-pair features per `(radius, distance)`, each group L2-normalized
//!    before it is added to the output vector
//! 3. MinHash reduction over the nonzero feature ids, followed by optional
//!    shingle compression down to `num_hash_functions` values

use crate::compute::hashing::{hash_list, int_hash, rolling_codes};
use crate::compute::sparse::SparseVector;
use crate::core::config::EncoderConfig;
use crate::core::error::ConfigError;
use crate::core::types::{Signature, SENTINEL_KEY};

/// Stateless signature encoder, safe to share between encoder threads
#[derive(Debug, Clone)]
pub struct SignatureCodec {
    config: EncoderConfig,
    bit_mask: u32,
    repeats: u32,
    sub_hash_range: u32,
}

impl SignatureCodec {
    pub fn new(config: EncoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let repeats = config.effective_repeats();
        let sub_hash_range = config.num_raw_slots() / repeats;
        let bit_mask = config.hash_bit_mask();
        Ok(Self {
            config: EncoderConfig {
                num_repeats_hash_function: repeats,
                ..config
            },
            bit_mask,
            repeats,
            sub_hash_range,
        })
    }

    /// Parameters with the repeat factor already normalized
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn num_hash_functions(&self) -> usize {
        self.config.num_hash_functions as usize
    }

    /// Encode one sequence into a signature of `num_hash_functions` keys
    pub fn encode(&self, sequence: &[u8]) -> Signature {
        let features = self.feature_vector(sequence);
        self.min_hash(&features)
    }

    /// Normalized endpoint-pair feature vector of a sequence
    pub fn feature_vector(&self, sequence: &[u8]) -> SparseVector {
        let mut x = SparseVector::new();
        let size = sequence.len();
        if size == 0 {
            return x;
        }

        let radius = self.config.radius as usize;
        let codes: Vec<Vec<u32>> = (0..size)
            .map(|start| rolling_codes(sequence, start, radius, self.bit_mask))
            .collect();

        for r in self.config.min_radius..=self.config.radius {
            for d in self.config.min_distance..=self.config.distance {
                let mut z = SparseVector::new();
                for start in 0..size {
                    let src = codes[start][r as usize];
                    let dest = codes[(start + d as usize).min(size - 1)][r as usize];
                    let (hi, lo) = if src > dest { (src, dest) } else { (dest, src) };
                    let feature = hash_list(&[r, d, hi, lo], self.bit_mask);
                    z.set(feature, 1.0);
                }
                z.normalize();
                x.add_assign(&z);
            }
        }
        x.normalize();
        x
    }

    /// MinHash reduction of a feature vector.
    ///
    /// Each round partitions the 32-bit key space into `sub_hash_range`
    /// contiguous slots; a key updates the minimum of the slot it lands in.
    /// Keys beyond the last full slot width are dropped.
    pub fn min_hash(&self, features: &SparseVector) -> Signature {
        let full = self.config.num_raw_slots() as usize;
        let mut raw = vec![SENTINEL_KEY; full];
        let slot_width = u32::MAX / self.sub_hash_range;

        for (feature_id, _) in features.iter() {
            for round in 1..=self.repeats {
                let key = int_hash(feature_id, self.config.random_seed, round);
                let slot = key / slot_width;
                if slot < self.sub_hash_range {
                    let target = (slot + (round - 1) * self.sub_hash_range) as usize;
                    if key < raw[target] {
                        raw[target] = key;
                    }
                }
            }
        }

        self.compress_shingles(raw)
    }

    fn compress_shingles(&self, raw: Vec<u32>) -> Signature {
        let shingles = self.config.num_hash_shingles as usize;
        if shingles == 1 {
            return raw;
        }
        raw.chunks(shingles)
            .take(self.num_hash_functions())
            .map(|group| {
                if group.iter().all(|&k| k == SENTINEL_KEY) {
                    SENTINEL_KEY
                } else {
                    hash_list(group, u32::MAX)
                }
            })
            .collect()
    }
}
