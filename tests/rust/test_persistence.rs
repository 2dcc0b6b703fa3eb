//! Persisted indexes read back exactly as written

use seqlsh::index::{IndexHeader, InverseIndex, PersistedIndex};
use seqlsh::ingest::{NoopHook, SeqSource};
use seqlsh::{EncoderConfig, IndexError, IndexValueMode, PipelineConfig, SeqFormat};

use crate::common::*;

fn name_keyed_index(dir: &tempfile::TempDir) -> PersistedIndex {
    let records: Vec<(String, String)> = (0..30)
        .map(|i| (format!("gene{:02}", i), nucleotides(200, 100 + i)))
        .collect();
    let borrowed: Vec<(&str, &str)> = records
        .iter()
        .map(|(n, s)| (n.as_str(), s.as_str()))
        .collect();
    let path = write_fasta(dir, "genes.fa", &borrowed);

    let pipeline = pipeline(12, 2);
    let mut index = InverseIndex::new(12, 3);
    let source = SeqSource::new(&path, SeqFormat::Fasta).with_index_mode(IndexValueMode::SequenceName);
    let report = pipeline.run(&[source], &mut index, &mut NoopHook).unwrap();
    assert_eq!(report.features.len(), 30);

    let pipeline_config = PipelineConfig {
        seq_window: 50,
        seq_shift: 25,
        ..Default::default()
    };
    PersistedIndex::new(pipeline.codec().config(), &pipeline_config, report.features, index)
}

fn assert_same(a: &PersistedIndex, b: &PersistedIndex) {
    assert_eq!(a.header, b.header);
    assert_eq!(a.features, b.features);
    assert_eq!(a.index.bands(), b.index.bands());
    assert_eq!(a.index.stats(), b.index.stats());
}

#[test]
fn test_plain_and_gzip_round_trip() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let original = name_keyed_index(&dir);

    for name in ["index.bin", "index.bin.gz"] {
        let path = dir.path().join(name);
        original.save(&path).unwrap();
        let loaded = PersistedIndex::load(&path, 3).unwrap();
        assert_same(&original, &loaded);
    }

    let plain = std::fs::metadata(dir.path().join("index.bin")).unwrap().len();
    let packed = std::fs::metadata(dir.path().join("index.bin.gz")).unwrap().len();
    assert!(packed < plain);
}

#[test]
fn test_header_restores_parameters() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let original = name_keyed_index(&dir);

    let mut encoder = EncoderConfig::default();
    let mut pipeline_config = PipelineConfig::default();
    original.header.apply_to(&mut encoder, &mut pipeline_config);

    assert_eq!(encoder.hash_bit_size, small_encoder(12).hash_bit_size);
    assert_eq!(pipeline_config.seq_window, 50);
    assert_eq!(pipeline_config.seq_shift, 25);
    assert_eq!(original.header.histogram_size, 30);
    // repeat factor as the codec used it, not the unset default
    assert_eq!(original.header.num_repeats_hash_function, 12);
    assert_eq!(
        IndexHeader::from_fields(original.header.fields()),
        original.header
    );
}

#[test]
fn test_truncated_file_is_a_format_error() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let original = name_keyed_index(&dir);

    let mut buffer = Vec::new();
    original.write_to(&mut buffer).unwrap();
    buffer.truncate(buffer.len() - 3);

    let err = PersistedIndex::read_from(&mut buffer.as_slice(), 3).unwrap_err();
    assert!(matches!(err, IndexError::Format(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = PersistedIndex::load(std::path::Path::new("/nonexistent/index.bin"), 3).unwrap_err();
    assert!(matches!(err, IndexError::Io(_)));
}
