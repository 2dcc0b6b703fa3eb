// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Plain-text clustering output

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::cluster::density::{ClusteringResult, RankedNeighborhood};
use crate::core::types::InstanceId;

/// One line per cluster: `<seed>\t<member> <member> ...`
pub fn write_clusters<W: Write>(
    out: &mut W,
    clusters: &BTreeMap<InstanceId, Vec<InstanceId>>,
) -> io::Result<()> {
    for (seed, members) in clusters {
        write!(out, "{}\t", seed)?;
        for member in members {
            write!(out, "{} ", member)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One line per instance in rank order: `<id>:<score>\t<neighbor> <neighbor> ...`
pub fn write_neighborhoods<W: Write>(out: &mut W, ranked: &[RankedNeighborhood]) -> io::Result<()> {
    for entry in ranked {
        write!(out, "{}:{}\t", entry.id, entry.score)?;
        for (neighbor, _) in &entry.neighbors {
            write!(out, "{} ", neighbor)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn save_clustering(
    result: &ClusteringResult,
    cluster_path: &Path,
    neighborhood_path: &Path,
) -> io::Result<()> {
    let mut clusters = BufWriter::new(File::create(cluster_path)?);
    write_clusters(&mut clusters, &result.clusters)?;
    clusters.flush()?;
    info!("📝 Wrote {} clusters to {}", result.num_clusters(), cluster_path.display());

    let mut neighborhoods = BufWriter::new(File::create(neighborhood_path)?);
    write_neighborhoods(&mut neighborhoods, &result.ranked)?;
    neighborhoods.flush()?;
    info!(
        "📝 Wrote {} neighborhoods to {}",
        result.ranked.len(),
        neighborhood_path.display()
    );
    Ok(())
}
