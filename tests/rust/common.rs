//! Common utilities for integration tests

use std::io::Write;
use std::path::PathBuf;
use std::sync::Once;
use tempfile::TempDir;

use seqlsh::compute::SignatureCodec;
use seqlsh::ingest::IngestionPipeline;
use seqlsh::{EncoderConfig, IndexConfig, PipelineConfig};

static INIT: Once = Once::new();

/// Initialize test logging once per process
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("seqlsh=info")
            .with_test_writer()
            .try_init();
    });
}

pub fn small_encoder(num_hash_functions: u32) -> EncoderConfig {
    EncoderConfig {
        hash_bit_size: 24,
        radius: 5,
        min_radius: 2,
        distance: 3,
        min_distance: 0,
        num_hash_functions,
        ..Default::default()
    }
}

pub fn index_config(max_bucket_size: usize, sim: f64) -> IndexConfig {
    IndexConfig {
        max_bucket_size,
        pure_approximate_sim: sim,
    }
}

pub fn pipeline(num_hash_functions: u32, threads: usize) -> IngestionPipeline {
    let codec = SignatureCodec::new(small_encoder(num_hash_functions)).unwrap();
    IngestionPipeline::new(
        codec,
        PipelineConfig {
            num_threads: threads,
            min_chunk: 1,
            ..Default::default()
        },
    )
}

/// Write `(name, sequence)` records as FASTA into `dir`
pub fn write_fasta(dir: &TempDir, file_name: &str, records: &[(&str, &str)]) -> PathBuf {
    let path = dir.path().join(file_name);
    let mut file = std::fs::File::create(&path).unwrap();
    for (name, sequence) in records {
        writeln!(file, ">{}", name).unwrap();
        writeln!(file, "{}", sequence).unwrap();
    }
    path
}

/// Deterministic pseudo-random nucleotide sequence
pub fn nucleotides(len: usize, seed: u64) -> String {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 33) as usize % 4] as char
        })
        .collect()
}

/// Copy of `sequence` with the residue at `pos` replaced
pub fn point_mutation(sequence: &str, pos: usize) -> String {
    let mut bytes = sequence.as_bytes().to_vec();
    bytes[pos] = if bytes[pos] == b'A' { b'C' } else { b'A' };
    String::from_utf8(bytes).unwrap()
}
