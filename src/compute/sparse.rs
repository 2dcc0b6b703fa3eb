// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Sparse feature vector keyed by feature id

use std::collections::BTreeMap;

/// Sparse vector over a `2^hash_bit_size` feature space.
///
/// Entries are kept ordered by feature id so norms and sums are computed in a
/// stable order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: BTreeMap<u32, f64>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: u32) -> f64 {
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    /// Overwrite one coordinate
    pub fn set(&mut self, index: u32, value: f64) {
        if value == 0.0 {
            self.entries.remove(&index);
        } else {
            self.entries.insert(index, value);
        }
    }

    pub fn add_assign(&mut self, other: &SparseVector) {
        for (&index, &value) in &other.entries {
            *self.entries.entry(index).or_insert(0.0) += value;
        }
        self.entries.retain(|_, v| *v != 0.0);
    }

    pub fn norm(&self) -> f64 {
        self.entries.values().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Scale to unit L2 norm; the zero vector is left untouched
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for value in self.entries.values_mut() {
                *value /= norm;
            }
        }
    }

    /// Number of nonzero coordinates
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nonzero coordinates in ascending feature id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.entries.iter().map(|(&k, &v)| (k, v))
    }
}
