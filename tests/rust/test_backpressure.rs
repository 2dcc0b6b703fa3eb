//! A slow finisher throttles the reader through both queues

use std::thread;
use std::time::Duration;

use seqlsh::index::{InverseIndex, SignatureCache};
use seqlsh::ingest::{FinishHook, SeqSource, WorkChunk};
use seqlsh::SeqFormat;

use crate::common::*;

/// Slows the finisher down and remembers what it saw
struct SlowHook {
    delay: Duration,
    chunks: usize,
    instances: usize,
}

impl FinishHook for SlowHook {
    fn finish_chunk(&mut self, chunk: &WorkChunk) {
        thread::sleep(self.delay);
        self.chunks += 1;
        self.instances += chunk.len();
        assert_eq!(chunk.instances.len(), chunk.signatures.len());
        assert!(chunk.instances.iter().all(|i| i.sequence.is_empty()));
    }
}

fn many_sequences(dir: &tempfile::TempDir, count: usize) -> std::path::PathBuf {
    let records: Vec<(String, String)> = (0..count)
        .map(|i| (format!("r{}", i), nucleotides(24, i as u64)))
        .collect();
    let borrowed: Vec<(&str, &str)> = records
        .iter()
        .map(|(n, s)| (n.as_str(), s.as_str()))
        .collect();
    write_fasta(dir, "many.fa", &borrowed)
}

#[test]
fn test_raw_queue_never_exceeds_high_watermark() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let path = many_sequences(&dir, 3000);

    let mut index = InverseIndex::new(8, 1000);
    let mut hook = SlowHook {
        delay: Duration::from_millis(3),
        chunks: 0,
        instances: 0,
    };
    let report = pipeline(8, 1)
        .run(&[SeqSource::new(&path, SeqFormat::Fasta)], &mut index, &mut hook)
        .unwrap();

    assert_eq!(report.encoder_threads, 1);
    assert_eq!(report.raw_queue_bound, 25);
    // the reader filled the raw queue and was held there until drained
    assert_eq!(report.raw_queue_peak, report.raw_queue_bound);
    assert!(report.signature_queue_peak <= 25);

    assert_eq!(report.instances, 3000);
    assert_eq!(report.signatures, 3000);
    assert_eq!(hook.instances, 3000);
    assert!(hook.chunks > 50);
}

#[test]
fn test_many_encoders_absorb_everything() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let path = many_sequences(&dir, 2000);

    let mut index = InverseIndex::new(8, 10_000);
    let mut cache = SignatureCache::new();
    let report = pipeline(8, 8)
        .run(&[SeqSource::new(&path, SeqFormat::Fasta)], &mut index, &mut cache)
        .unwrap();

    assert!(report.raw_queue_peak <= 25 * 8);
    assert_eq!(cache.ids().count(), 2000);
    assert_eq!(report.signatures, report.instances);

    // chunk arrival order is free, but every instance's own bands hold its id
    for id in [0u32, 999, 1999] {
        let signature = cache.get(id).unwrap();
        let (matches, collisions) = index.matches(id, signature);
        assert_eq!(matches + collisions, 8);
    }
}
