// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Banded MinHash inverse index
//!
//! One hash map per band maps a signature key to a bounded bucket of index
//! values. A bucket that fills up is replaced by a terminal overflow marker:
//! nothing is ever inserted into it again and queries treat it as a collision.

use std::collections::HashMap;

use crate::core::types::{is_reserved_key, IndexValue, InstanceId};

/// Bounded, insertion-ordered set of index values sharing one (band, key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    Members(Vec<IndexValue>),
    Overflowed,
}

impl Bucket {
    pub fn is_overflowed(&self) -> bool {
        matches!(self, Bucket::Overflowed)
    }

    pub fn members(&self) -> &[IndexValue] {
        match self {
            Bucket::Members(values) => values,
            Bucket::Overflowed => &[],
        }
    }
}

/// Raw vote counts from one query, before trimming
#[derive(Debug, Clone, Default)]
pub struct QueryVotes {
    pub votes: HashMap<IndexValue, u32>,
    pub collisions: u32,
}

/// Bucket occupancy statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndexStats {
    pub num_keys: u64,
    pub num_full_buckets: u64,
}

impl IndexStats {
    pub fn overflow_ratio(&self) -> f64 {
        if self.num_keys == 0 {
            0.0
        } else {
            self.num_full_buckets as f64 / self.num_keys as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct InverseIndex {
    bands: Vec<HashMap<u32, Bucket>>,
    max_bucket_size: usize,
    stats: IndexStats,
}

impl InverseIndex {
    pub fn new(num_hash_functions: usize, max_bucket_size: usize) -> Self {
        Self {
            bands: vec![HashMap::new(); num_hash_functions],
            max_bucket_size,
            stats: IndexStats::default(),
        }
    }

    /// Rebuild an index from persisted bands
    pub fn from_bands(bands: Vec<HashMap<u32, Bucket>>, max_bucket_size: usize) -> Self {
        let mut stats = IndexStats::default();
        for band in &bands {
            stats.num_keys += band.len() as u64;
            stats.num_full_buckets += band.values().filter(|b| b.is_overflowed()).count() as u64;
        }
        Self {
            bands,
            max_bucket_size,
            stats,
        }
    }

    pub fn num_hash_functions(&self) -> usize {
        self.bands.len()
    }

    pub fn max_bucket_size(&self) -> usize {
        self.max_bucket_size
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn bands(&self) -> &[HashMap<u32, Bucket>] {
        &self.bands
    }

    pub fn bucket(&self, band: usize, key: u32) -> Option<&Bucket> {
        self.bands.get(band).and_then(|b| b.get(&key))
    }

    /// Add `value` to the bucket of every non-reserved key of `signature`.
    ///
    /// Repeated values are kept, so a value inserted twice under the same key
    /// votes twice.
    pub fn insert(&mut self, signature: &[u32], value: IndexValue) {
        let max_bucket_size = self.max_bucket_size;
        for (band, &key) in self.bands.iter_mut().zip(signature) {
            if is_reserved_key(key) {
                continue;
            }
            match band.get_mut(&key) {
                None => {
                    band.insert(key, Bucket::Members(vec![value]));
                    self.stats.num_keys += 1;
                }
                Some(bucket) => {
                    let full = match bucket {
                        Bucket::Overflowed => false,
                        Bucket::Members(values) if values.len() < max_bucket_size => {
                            values.push(value);
                            false
                        }
                        Bucket::Members(_) => true,
                    };
                    if full {
                        *bucket = Bucket::Overflowed;
                        self.stats.num_full_buckets += 1;
                    }
                }
            }
        }
    }

    /// Informative bucket for one band, or `None` when the band collides
    fn informative(&self, band: usize, key: u32) -> Option<&[IndexValue]> {
        if is_reserved_key(key) {
            return None;
        }
        match self.bands.get(band)?.get(&key) {
            Some(Bucket::Overflowed) => None,
            Some(Bucket::Members(values)) => Some(values),
            None => Some(&[]),
        }
    }

    /// Count, per stored value, how many bands of `signature` it shares.
    ///
    /// Reserved keys, overflowed buckets and missing bands count as collisions.
    /// Self matches are included.
    pub fn query(&self, signature: &[u32]) -> QueryVotes {
        let mut result = QueryVotes::default();
        for band in 0..self.bands.len() {
            let key = signature.get(band).copied().unwrap_or(u32::MAX);
            match self.informative(band, key) {
                Some(values) => {
                    for &value in values {
                        *result.votes.entry(value).or_insert(0) += 1;
                    }
                }
                None => result.collisions += 1,
            }
        }
        result
    }

    /// Number of bands of `signature` whose bucket holds `value`, and the
    /// number of colliding bands
    pub fn matches(&self, value: IndexValue, signature: &[u32]) -> (u32, u32) {
        let mut matches = 0;
        let mut collisions = 0;
        for band in 0..self.bands.len() {
            let key = signature.get(band).copied().unwrap_or(u32::MAX);
            match self.informative(band, key) {
                Some(values) => {
                    matches += values.iter().filter(|&&v| v == value).count() as u32;
                }
                None => collisions += 1,
            }
        }
        (matches, collisions)
    }

    /// Per-feature band histogram for name-keyed indexes.
    ///
    /// Each band adds one to every distinct feature id (1-based) found in its
    /// bucket. Bands without a usable bucket are counted as empty.
    pub fn histogram(&self, signature: &[u32], size: usize) -> (Vec<f64>, u32) {
        let mut hist = vec![0.0; size];
        let mut empty_bands = 0;
        for band in 0..self.bands.len() {
            let key = signature.get(band).copied().unwrap_or(u32::MAX);
            match self.bucket(band, key) {
                Some(Bucket::Members(values)) if !is_reserved_key(key) => {
                    let mut seen = vec![false; size];
                    for &value in values {
                        let slot = value as usize;
                        if slot >= 1 && slot <= size && !seen[slot - 1] {
                            seen[slot - 1] = true;
                            hist[slot - 1] += 1.0;
                        }
                    }
                }
                _ => empty_bands += 1,
            }
        }
        (hist, empty_bands)
    }
}

/// Retained neighbors of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighborhood {
    /// (id, votes), highest votes first, ties by ascending id
    pub neighbors: Vec<(InstanceId, u32)>,
    pub collisions: u32,
    pub density: f64,
}

impl Neighborhood {
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.neighbors.iter().map(|&(id, _)| id)
    }
}

/// Keep candidates with `votes >= pure_approximate_sim * informative_bands`.
///
/// Density is the mean retained vote count divided by the number of
/// informative bands; zero when nothing is retained or every band collided.
pub fn trim_neighborhood(
    query: QueryVotes,
    num_hash_functions: usize,
    pure_approximate_sim: f64,
) -> Neighborhood {
    let informative = num_hash_functions.saturating_sub(query.collisions as usize);
    let threshold = pure_approximate_sim * informative as f64;

    let mut neighbors: Vec<(InstanceId, u32)> = query
        .votes
        .into_iter()
        .filter(|&(_, votes)| votes as f64 >= threshold)
        .collect();
    neighbors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let density = if informative > 0 && !neighbors.is_empty() {
        let total: u64 = neighbors.iter().map(|&(_, v)| v as u64).sum();
        (total as f64 / neighbors.len() as f64) / informative as f64
    } else {
        0.0
    };

    Neighborhood {
        neighbors,
        collisions: query.collisions,
        density,
    }
}
