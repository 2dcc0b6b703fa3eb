//! Ingest -> neighborhood index -> density clustering

use seqlsh::cluster::{save_clustering, DensityClusterer};
use seqlsh::ingest::SeqSource;
use seqlsh::{ClusterConfig, SeqFormat};

use crate::common::*;

const PROTEIN: &str = "MKTAYIAKQRQISFVKSHFSRQLEERLGLIEVQAPILSRVGDGTQDNLSGAEKAVQVKVKALPDAQFEVVHSLAKWKRQTLGQHDFSAGEGLYTHMKALRPDEDRLSPLHSVYVDQWDWERVMGDGERQFSTLKSTVEAIWAGIKATEAAVSEEF";

fn near_identical_plus_outlier(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let base = nucleotides(150, 7);
    let first = point_mutation(&base, 40);
    let second = point_mutation(&base, 110);
    write_fasta(
        dir,
        "scenario.fa",
        &[
            ("base", &base),
            ("first", &first),
            ("second", &second),
            ("outlier", PROTEIN),
        ],
    )
}

#[test]
fn test_near_identical_sequences_share_a_cluster() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let path = near_identical_plus_outlier(&dir);

    let (index, report) = pipeline(16, 2)
        .build_neighborhood_index(
            &[SeqSource::new(&path, SeqFormat::Fasta)],
            &index_config(50, 0.3),
        )
        .unwrap();
    assert_eq!(report.instances, 4);

    let result = DensityClusterer::new(&index, ClusterConfig::default())
        .cluster_all()
        .unwrap();

    assert_eq!(result.partition(), vec![vec![0, 1, 2], vec![3]]);
    assert_eq!(result.cluster_of(3), Some(3));
    assert_eq!(result.ranked.len(), 4);
}

#[test]
fn test_clustering_is_idempotent_on_a_frozen_index() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let records: Vec<(String, String)> = (0..40)
        .map(|i| {
            let family = nucleotides(120, i / 4);
            (format!("seq{}", i), point_mutation(&family, (i as usize * 13) % 120))
        })
        .collect();
    let borrowed: Vec<(&str, &str)> = records
        .iter()
        .map(|(n, s)| (n.as_str(), s.as_str()))
        .collect();
    let path = write_fasta(&dir, "families.fa", &borrowed);

    let (mut index, _) = pipeline(32, 4)
        .build_neighborhood_index(
            &[SeqSource::new(&path, SeqFormat::Fasta)],
            &index_config(100, 0.4),
        )
        .unwrap();

    let first = DensityClusterer::new(&index, ClusterConfig::default())
        .cluster_all()
        .unwrap();
    let again = DensityClusterer::new(&index, ClusterConfig::default())
        .cluster_all()
        .unwrap();
    assert_eq!(first.partition(), again.partition());

    index.cache_reset();
    let after_reset = DensityClusterer::new(&index, ClusterConfig::default())
        .cluster_all()
        .unwrap();
    assert_eq!(first.partition(), after_reset.partition());

    let members: usize = first.clusters.values().map(|m| m.len()).sum();
    assert_eq!(members, 40);
}

#[test]
fn test_similarity_is_symmetric() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let path = near_identical_plus_outlier(&dir);
    let (index, _) = pipeline(16, 2)
        .build_neighborhood_index(
            &[SeqSource::new(&path, SeqFormat::Fasta)],
            &index_config(50, 0.3),
        )
        .unwrap();

    for a in 0..4 {
        assert!((index.approximate_similarity(a, a).unwrap() - 1.0).abs() < 1e-12);
        for b in 0..4 {
            let ab = index.approximate_similarity(a, b).unwrap();
            let ba = index.approximate_similarity(b, a).unwrap();
            assert_eq!(ab, ba);
            assert!((0.0..=1.0).contains(&ab));
        }
    }
    assert!(index.approximate_similarity(0, 9).is_err());
}

#[test]
fn test_output_files() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let path = near_identical_plus_outlier(&dir);
    let (index, _) = pipeline(16, 1)
        .build_neighborhood_index(
            &[SeqSource::new(&path, SeqFormat::Fasta)],
            &index_config(50, 0.3),
        )
        .unwrap();
    let result = DensityClusterer::new(&index, ClusterConfig::default())
        .cluster_all()
        .unwrap();

    let clusters = dir.path().join("clusters.txt");
    let neighborhoods = dir.path().join("neighborhoods.txt");
    save_clustering(&result, &clusters, &neighborhoods).unwrap();

    let cluster_lines = std::fs::read_to_string(&clusters).unwrap();
    assert_eq!(cluster_lines.lines().count(), 2);
    assert!(cluster_lines.lines().any(|l| l.starts_with("3\t3 ")));

    let neighborhood_lines = std::fs::read_to_string(&neighborhoods).unwrap();
    let scores: Vec<f64> = neighborhood_lines
        .lines()
        .map(|l| l.split('\t').next().unwrap().split(':').nth(1).unwrap().parse().unwrap())
        .collect();
    assert_eq!(scores.len(), 4);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}
