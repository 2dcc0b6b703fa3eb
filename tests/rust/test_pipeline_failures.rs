//! Structural input problems abort the run; local ones are skipped

use std::sync::Arc;

use seqlsh::index::{InverseIndex, SignatureCache};
use seqlsh::ingest::{IntervalTable, NoopHook, SeqSource};
use seqlsh::{IndexValueMode, InputError, PipelineError, SeqFormat};

use crate::common::*;

#[test]
fn test_unreadable_second_source_aborts() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let good = write_fasta(&dir, "good.fa", &[("a", "ACGTACGTAA")]);

    let mut index = InverseIndex::new(8, 100);
    let err = pipeline(8, 2)
        .run(
            &[
                SeqSource::new(&good, SeqFormat::Fasta),
                SeqSource::new(dir.path().join("missing.fa"), SeqFormat::Fasta).with_dataset(1),
            ],
            &mut index,
            &mut NoopHook,
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::Input(InputError::Unreadable { .. })));
}

#[test]
fn test_duplicate_names_across_sources_abort() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let first = write_fasta(&dir, "one.fa", &[("shared", "ACGTACGT")]);
    let second = write_fasta(&dir, "two.fa", &[("other", "GGCCAATT"), ("shared", "TTTTAAAA")]);

    let mut index = InverseIndex::new(8, 100);
    let err = pipeline(8, 2)
        .run(
            &[
                SeqSource::new(&first, SeqFormat::Fasta),
                SeqSource::new(&second, SeqFormat::Fasta),
            ],
            &mut index,
            &mut NoopHook,
        )
        .unwrap_err();
    match err {
        PipelineError::Input(InputError::DuplicateName { name, .. }) => assert_eq!(name, "shared"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_duplicate_names_allowed_without_index_updates() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_fasta(&dir, "dup.fa", &[("x", "ACGTACGT"), ("x", "TTGGCCAA")]);

    let mut index = InverseIndex::new(8, 100);
    let mut cache = SignatureCache::new();
    let report = pipeline(8, 2)
        .run(
            &[SeqSource::new(&path, SeqFormat::Fasta).with_index_mode(IndexValueMode::None)],
            &mut index,
            &mut cache,
        )
        .unwrap();

    assert_eq!(report.instances, 2);
    assert_eq!(cache.ids().count(), 2);
    assert_eq!(index.stats().num_keys, 0);
}

#[test]
fn test_nothing_to_ingest_is_fatal() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_fasta(&dir, "chr.fa", &[("chr1", "ACGTACGT")]);
    let intervals = IntervalTable::from_reader(std::io::Cursor::new("chr9\t0\t4\n")).unwrap();

    let mut index = InverseIndex::new(8, 100);
    let err = pipeline(8, 1)
        .run(
            &[SeqSource::new(&path, SeqFormat::Fasta).with_intervals(Arc::new(intervals))],
            &mut index,
            &mut NoopHook,
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoInstances));
}

#[test]
fn test_gzip_input_is_read() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lines.txt.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    writeln!(encoder, "ACGTACGTAC").unwrap();
    writeln!(encoder, "GGGTTTAAAC").unwrap();
    encoder.finish().unwrap();

    let mut index = InverseIndex::new(8, 100);
    let report = pipeline(8, 2)
        .run(&[SeqSource::new(&path, SeqFormat::StringSeq)], &mut index, &mut NoopHook)
        .unwrap();
    assert_eq!(report.instances, 2);
    assert_eq!(report.sources_read, 1);
}
