// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Neighborhood queries by instance id over a frozen inverse index

use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

use crate::core::config::IndexConfig;
use crate::core::error::IndexError;
use crate::core::types::{InstanceId, Signature};
use crate::index::inverse::{trim_neighborhood, InverseIndex, Neighborhood};

/// Signatures of ingested instances, addressed by instance id
#[derive(Debug, Clone, Default)]
pub struct SignatureCache {
    signatures: Vec<Option<Signature>>,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: InstanceId, signature: Signature) {
        let slot = id as usize;
        if slot >= self.signatures.len() {
            self.signatures.resize(slot + 1, None);
        }
        self.signatures[slot] = Some(signature);
    }

    pub fn get(&self, id: InstanceId) -> Result<&Signature, IndexError> {
        self.signatures
            .get(id as usize)
            .and_then(|s| s.as_ref())
            .ok_or(IndexError::MissingSignature(id))
    }

    /// One past the largest id seen
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Ids that have a signature, ascending
    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.signatures
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| i as InstanceId)
    }
}

/// Inverse index plus per-instance neighborhood memo.
///
/// The first query for an id computes and stores its neighborhood; later
/// queries return the stored value. The index must not change once queries
/// start, so entries are never invalidated (only [`cache_reset`] clears them).
///
/// [`cache_reset`]: NeighborhoodIndex::cache_reset
#[derive(Debug)]
pub struct NeighborhoodIndex {
    index: InverseIndex,
    signatures: SignatureCache,
    pure_approximate_sim: f64,
    cache: Vec<OnceCell<Arc<Neighborhood>>>,
}

impl NeighborhoodIndex {
    pub fn new(index: InverseIndex, signatures: SignatureCache, config: &IndexConfig) -> Self {
        let cache = (0..signatures.len()).map(|_| OnceCell::new()).collect();
        Self {
            index,
            signatures,
            pure_approximate_sim: config.pure_approximate_sim,
            cache,
        }
    }

    pub fn index(&self) -> &InverseIndex {
        &self.index
    }

    pub fn signatures(&self) -> &SignatureCache {
        &self.signatures
    }

    pub fn num_instances(&self) -> usize {
        self.signatures.len()
    }

    pub fn cache_reset(&mut self) {
        debug!("Nearest neighbor cache reset ({} slots)", self.signatures.len());
        self.cache = (0..self.signatures.len()).map(|_| OnceCell::new()).collect();
    }

    pub fn signature(&self, id: InstanceId) -> Result<&Signature, IndexError> {
        self.signatures.get(id)
    }

    /// Uncached neighborhood of an arbitrary signature
    pub fn query_signature(&self, signature: &[u32]) -> Neighborhood {
        trim_neighborhood(
            self.index.query(signature),
            self.index.num_hash_functions(),
            self.pure_approximate_sim,
        )
    }

    /// Memoized neighborhood of an ingested instance.
    ///
    /// Fails with [`IndexError::MissingSignature`] if the id was never encoded.
    pub fn neighborhood(&self, id: InstanceId) -> Result<Arc<Neighborhood>, IndexError> {
        let slot = self
            .cache
            .get(id as usize)
            .ok_or(IndexError::MissingSignature(id))?;
        slot.get_or_try_init(|| -> Result<Arc<Neighborhood>, IndexError> {
            let signature = self.signatures.get(id)?;
            Ok(Arc::new(self.query_signature(signature)))
        })
        .map(Arc::clone)
    }

    /// Symmetric band-sharing similarity of two ingested instances
    pub fn approximate_similarity(&self, a: InstanceId, b: InstanceId) -> Result<f64, IndexError> {
        let signature_a = self.signatures.get(a)?;
        let signature_b = self.signatures.get(b)?;

        let (matches_ab, collisions_ab) = self.index.matches(a, signature_b);
        let (matches_ba, collisions_ba) = self.index.matches(b, signature_a);

        let informative =
            2 * self.index.num_hash_functions() as i64 - collisions_ab as i64 - collisions_ba as i64;
        if informative <= 0 {
            return Ok(0.0);
        }
        Ok((matches_ab + matches_ba) as f64 / informative as f64)
    }
}
