//! Overflow of a single bucket is terminal and confined to its band

use seqlsh::index::{trim_neighborhood, Bucket, FeatureTable, InverseIndex, PersistedIndex};
use seqlsh::{EncoderConfig, PipelineConfig};

const H: usize = 4;
const MAX_BUCKET: usize = 5;

/// Every signature shares key 7 in band 0 and is unique elsewhere
fn crowded_signature(i: u32) -> Vec<u32> {
    vec![7, 100 + i, 200 + i, 300 + i]
}

fn crowded_index() -> InverseIndex {
    let mut index = InverseIndex::new(H, MAX_BUCKET);
    for i in 0..=MAX_BUCKET as u32 {
        index.insert(&crowded_signature(i), i);
    }
    index
}

#[test]
fn test_one_more_than_capacity_overflows() {
    let index = crowded_index();
    assert_eq!(index.bucket(0, 7), Some(&Bucket::Overflowed));
    assert_eq!(index.stats().num_full_buckets, 1);

    for band in 1..H {
        let bucket = index.bucket(band, 100 * band as u32).unwrap();
        assert_eq!(bucket.members(), &[0]);
    }
}

#[test]
fn test_overflowed_band_counts_as_collision_for_every_query() {
    let mut index = crowded_index();
    index.insert(&[7, 999, 998, 997], 42);
    assert_eq!(index.bucket(0, 7), Some(&Bucket::Overflowed));

    let votes = index.query(&crowded_signature(2));
    assert_eq!(votes.collisions, 1);
    assert_eq!(votes.votes.get(&2), Some(&3));
    assert_eq!(votes.votes.len(), 1);

    let neighborhood = trim_neighborhood(votes, H, 1.0);
    assert_eq!(neighborhood.ids().collect::<Vec<_>>(), vec![2]);
    assert!((neighborhood.density - 1.0).abs() < 1e-12);

    let fresh = index.query(&[7, 1, 2, 3]);
    assert_eq!(fresh.collisions, 1);
    assert!(fresh.votes.is_empty());
}

#[test]
fn test_overflow_survives_persistence() {
    let index = crowded_index();
    let persisted = PersistedIndex::new(
        &EncoderConfig::default(),
        &PipelineConfig::default(),
        FeatureTable::new(),
        index,
    );
    let mut buffer = Vec::new();
    persisted.write_to(&mut buffer).unwrap();

    let loaded = PersistedIndex::read_from(&mut buffer.as_slice(), MAX_BUCKET).unwrap();
    assert_eq!(loaded.index.bucket(0, 7), Some(&Bucket::Overflowed));
    assert_eq!(loaded.index.stats(), persisted.index.stats());
    assert_eq!(loaded.index.query(&crowded_signature(3)).collisions, 1);
}
