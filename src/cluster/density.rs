// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Greedy density clustering
//!
//! Instances are visited from the densest neighborhood down. An unassigned
//! instance either joins the single existing cluster that already owns all of
//! its assigned neighbors (when few neighbors are still unassigned) or founds
//! a new cluster. Either way it pulls its unassigned neighbors along.

use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::core::config::ClusterConfig;
use crate::core::error::IndexError;
use crate::core::types::InstanceId;
use crate::index::neighborhood::NeighborhoodIndex;

/// Neighborhood of one instance annotated with its density score
#[derive(Debug, Clone, PartialEq)]
pub struct RankedNeighborhood {
    pub id: InstanceId,
    /// `density * neighborhood size`
    pub score: f64,
    pub density: f64,
    /// (neighbor id, shared bands), most shared first
    pub neighbors: Vec<(InstanceId, u32)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusteringResult {
    /// Founding seed id -> ascending member ids
    pub clusters: BTreeMap<InstanceId, Vec<InstanceId>>,
    /// Every working-set instance by descending score
    pub ranked: Vec<RankedNeighborhood>,
}

impl ClusteringResult {
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn cluster_of(&self, id: InstanceId) -> Option<InstanceId> {
        self.clusters
            .iter()
            .find(|(_, members)| members.binary_search(&id).is_ok())
            .map(|(&seed, _)| seed)
    }

    /// Membership sets, ignoring which seed founded each cluster
    pub fn partition(&self) -> Vec<Vec<InstanceId>> {
        let mut sets: Vec<Vec<InstanceId>> = self.clusters.values().cloned().collect();
        sets.sort();
        sets
    }
}

pub struct DensityClusterer<'a> {
    index: &'a NeighborhoodIndex,
    config: ClusterConfig,
}

impl<'a> DensityClusterer<'a> {
    pub fn new(index: &'a NeighborhoodIndex, config: ClusterConfig) -> Self {
        Self { index, config }
    }

    /// Cluster every instance that has a signature
    pub fn cluster_all(&self) -> Result<ClusteringResult, IndexError> {
        let working_set: Vec<InstanceId> = self.index.signatures().ids().collect();
        self.cluster(&working_set)
    }

    pub fn cluster(&self, working_set: &[InstanceId]) -> Result<ClusteringResult, IndexError> {
        info!("Computing densities for {} instances", working_set.len());
        let mut ranked: Vec<RankedNeighborhood> = if self.config.parallel_density {
            working_set
                .par_iter()
                .map(|&id| self.rank(id))
                .collect::<Result<_, _>>()?
        } else {
            working_set
                .iter()
                .map(|&id| self.rank(id))
                .collect::<Result<_, _>>()?
        };

        info!("Sorting instances by density score");
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));

        info!("Building adjacency list");
        let assignment = self.assign(&ranked)?;

        let mut clusters: BTreeMap<InstanceId, Vec<InstanceId>> = BTreeMap::new();
        for (&member, &seed) in &assignment {
            clusters.entry(seed).or_default().push(member);
        }
        for &id in working_set {
            if !assignment.contains_key(&id) {
                clusters.entry(id).or_default().push(id);
            }
        }
        for members in clusters.values_mut() {
            members.sort_unstable();
            members.dedup();
        }

        info!("✅ Found {} clusters", clusters.len());
        Ok(ClusteringResult { clusters, ranked })
    }

    fn rank(&self, id: InstanceId) -> Result<RankedNeighborhood, IndexError> {
        let neighborhood = self.index.neighborhood(id)?;
        Ok(RankedNeighborhood {
            id,
            score: neighborhood.density * neighborhood.len() as f64,
            density: neighborhood.density,
            neighbors: neighborhood.neighbors.clone(),
        })
    }

    /// Sequential pass: cluster assignment of an instance depends on every
    /// assignment made before it
    fn assign(
        &self,
        ranked: &[RankedNeighborhood],
    ) -> Result<HashMap<InstanceId, InstanceId>, IndexError> {
        let mut assignment: HashMap<InstanceId, InstanceId> = HashMap::new();

        for entry in ranked {
            let seed = entry.id;
            if assignment.contains_key(&seed) {
                continue;
            }
            let neighborhood = self.index.neighborhood(seed)?;

            let mut votes: BTreeMap<InstanceId, usize> = BTreeMap::new();
            let mut not_clustered = 0;
            for neighbor in neighborhood.ids() {
                match assignment.get(&neighbor) {
                    Some(&cluster) => *votes.entry(cluster).or_default() += 1,
                    None => not_clustered += 1,
                }
            }

            let target = merge_target(seed, &votes, not_clustered, neighborhood.len());
            if target != seed {
                debug!("instance {} joins cluster {}", seed, target);
            }
            for neighbor in neighborhood.ids() {
                assignment.entry(neighbor).or_insert(target);
            }
            assignment.entry(seed).or_insert(target);
        }
        Ok(assignment)
    }
}

/// Cluster an unassigned seed joins, or the seed itself for a new cluster.
///
/// The best cluster must own every assigned neighbor and
/// `(not_clustered + 2) * 2 <= size` must hold.
fn merge_target(
    seed: InstanceId,
    votes: &BTreeMap<InstanceId, usize>,
    not_clustered: usize,
    size: usize,
) -> InstanceId {
    let assigned = size.saturating_sub(not_clustered);
    let best = votes
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)));
    match best {
        Some((&cluster, &count)) if count >= assigned && (not_clustered + 2) * 2 <= size => cluster,
        _ => seed,
    }
}
