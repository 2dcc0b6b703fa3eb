// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Binary inverse-index layout
//!
//! All fields are little-endian `u32`:
//!
//! ```text
//! header:   hash_bit_size random_seed radius min_radius distance min_distance
//!           num_hash_shingles num_repeats_hash_function seq_window seq_shift
//!           histogram_size
//! features: histogram_size x (value, name_len, name bytes), ascending name
//! index:    num_hash_functions
//!           per band:   num_buckets
//!           per bucket: key, num_entries, num_entries x value
//! ```
//!
//! An overflowed bucket is stored as one entry equal to `u32::MAX`. Files whose
//! name ends in `.gz` are gzip-compressed.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::core::config::{EncoderConfig, PipelineConfig};
use crate::core::error::IndexError;
use crate::index::features::FeatureTable;
use crate::index::inverse::{Bucket, InverseIndex};

const OVERFLOW_ENTRY: u32 = u32::MAX;

/// Upper bound on capacity reserved from counts read off disk
const MAX_PRESIZE: usize = 1 << 16;

/// Encoder parameters an index was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexHeader {
    pub hash_bit_size: u32,
    pub random_seed: u32,
    pub radius: u32,
    pub min_radius: u32,
    pub distance: u32,
    pub min_distance: u32,
    pub num_hash_shingles: u32,
    pub num_repeats_hash_function: u32,
    pub seq_window: u32,
    pub seq_shift: u32,
    pub histogram_size: u32,
}

impl IndexHeader {
    pub fn new(encoder: &EncoderConfig, pipeline: &PipelineConfig, histogram_size: u32) -> Self {
        Self {
            hash_bit_size: encoder.hash_bit_size,
            random_seed: encoder.random_seed,
            radius: encoder.radius,
            min_radius: encoder.min_radius,
            distance: encoder.distance,
            min_distance: encoder.min_distance,
            num_hash_shingles: encoder.num_hash_shingles,
            num_repeats_hash_function: encoder.num_repeats_hash_function,
            seq_window: pipeline.seq_window,
            seq_shift: pipeline.seq_shift,
            histogram_size,
        }
    }

    /// Copy the persisted parameters back into live configuration
    pub fn apply_to(&self, encoder: &mut EncoderConfig, pipeline: &mut PipelineConfig) {
        encoder.hash_bit_size = self.hash_bit_size;
        encoder.random_seed = self.random_seed;
        encoder.radius = self.radius;
        encoder.min_radius = self.min_radius;
        encoder.distance = self.distance;
        encoder.min_distance = self.min_distance;
        encoder.num_hash_shingles = self.num_hash_shingles;
        encoder.num_repeats_hash_function = self.num_repeats_hash_function;
        pipeline.seq_window = self.seq_window;
        pipeline.seq_shift = self.seq_shift;
    }

    /// Fields in on-disk order
    pub fn fields(&self) -> [u32; 11] {
        [
            self.hash_bit_size,
            self.random_seed,
            self.radius,
            self.min_radius,
            self.distance,
            self.min_distance,
            self.num_hash_shingles,
            self.num_repeats_hash_function,
            self.seq_window,
            self.seq_shift,
            self.histogram_size,
        ]
    }

    pub fn from_fields(f: [u32; 11]) -> Self {
        Self {
            hash_bit_size: f[0],
            random_seed: f[1],
            radius: f[2],
            min_radius: f[3],
            distance: f[4],
            min_distance: f[5],
            num_hash_shingles: f[6],
            num_repeats_hash_function: f[7],
            seq_window: f[8],
            seq_shift: f[9],
            histogram_size: f[10],
        }
    }
}

/// Index together with the header and feature table it is persisted with
#[derive(Debug, Clone)]
pub struct PersistedIndex {
    pub header: IndexHeader,
    pub features: FeatureTable,
    pub index: InverseIndex,
}

impl PersistedIndex {
    pub fn new(
        encoder: &EncoderConfig,
        pipeline: &PipelineConfig,
        features: FeatureTable,
        index: InverseIndex,
    ) -> Self {
        let header = IndexHeader::new(encoder, pipeline, features.len() as u32);
        Self {
            header,
            features,
            index,
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), IndexError> {
        if self.features.len() != self.header.histogram_size as usize {
            return Err(IndexError::Format(format!(
                "histogram size {} differs from feature table size {}",
                self.header.histogram_size,
                self.features.len()
            )));
        }

        for field in self.header.fields() {
            out.write_u32::<LittleEndian>(field)?;
        }

        for (name, value) in self.features.iter() {
            out.write_u32::<LittleEndian>(value)?;
            out.write_u32::<LittleEndian>(name.len() as u32)?;
            out.write_all(name.as_bytes())?;
        }

        let bands = self.index.bands();
        out.write_u32::<LittleEndian>(bands.len() as u32)?;
        for band in bands {
            out.write_u32::<LittleEndian>(band.len() as u32)?;
            let mut keys: Vec<u32> = band.keys().copied().collect();
            keys.sort_unstable();
            for key in keys {
                out.write_u32::<LittleEndian>(key)?;
                match &band[&key] {
                    Bucket::Overflowed => {
                        out.write_u32::<LittleEndian>(1)?;
                        out.write_u32::<LittleEndian>(OVERFLOW_ENTRY)?;
                    }
                    Bucket::Members(values) => {
                        out.write_u32::<LittleEndian>(values.len() as u32)?;
                        for &value in values {
                            out.write_u32::<LittleEndian>(value)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Read an index written by [`write_to`](Self::write_to).
    ///
    /// `max_bucket_size` is not part of the layout and is supplied by the caller.
    pub fn read_from<R: Read>(input: &mut R, max_bucket_size: usize) -> Result<Self, IndexError> {
        let mut fields = [0u32; 11];
        for field in fields.iter_mut() {
            *field = read_u32(input)?;
        }
        let header = IndexHeader::from_fields(fields);

        let mut features = FeatureTable::new();
        for _ in 0..header.histogram_size {
            let value = read_u32(input)?;
            let len = read_u32(input)? as u64;
            let mut raw = Vec::new();
            input.by_ref().take(len).read_to_end(&mut raw)?;
            if (raw.len() as u64) < len {
                return Err(IndexError::Format("unexpected end of index data".to_string()));
            }
            let name = String::from_utf8(raw)
                .map_err(|e| IndexError::Format(format!("feature name is not UTF-8: {}", e)))?;
            features.insert(name, value);
        }

        let num_hash_functions = read_u32(input)?;
        if num_hash_functions == 0 {
            return Err(IndexError::Format(
                "number of hash functions must be positive".to_string(),
            ));
        }

        let mut bands = Vec::with_capacity((num_hash_functions as usize).min(MAX_PRESIZE));
        for band_no in 0..num_hash_functions {
            let num_buckets = read_u32(input)?;
            let mut band = HashMap::with_capacity((num_buckets as usize).min(MAX_PRESIZE));
            for _ in 0..num_buckets {
                let key = read_u32(input)?;
                let num_entries = read_u32(input)?;
                if key == 0 || num_entries == 0 {
                    return Err(IndexError::Format(format!(
                        "band {}: bucket key {} with {} entries",
                        band_no, key, num_entries
                    )));
                }
                let mut values = Vec::with_capacity((num_entries as usize).min(MAX_PRESIZE));
                for _ in 0..num_entries {
                    values.push(read_u32(input)?);
                }
                let bucket = if values == [OVERFLOW_ENTRY] {
                    Bucket::Overflowed
                } else {
                    Bucket::Members(values)
                };
                band.insert(key, bucket);
            }
            bands.push(band);
        }

        Ok(Self {
            header,
            features,
            index: InverseIndex::from_bands(bands, max_bucket_size),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let file = BufWriter::new(File::create(path)?);
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(file, Compression::default());
            self.write_to(&mut encoder)?;
            encoder.finish()?.flush()?;
        } else {
            let mut file = file;
            self.write_to(&mut file)?;
            file.flush()?;
        }
        info!(
            "💾 Wrote index with {} hash functions and {} features to {}",
            self.index.num_hash_functions(),
            self.features.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: &Path, max_bucket_size: usize) -> Result<Self, IndexError> {
        let file = BufReader::new(File::open(path)?);
        let loaded = if is_gzip(path) {
            Self::read_from(&mut MultiGzDecoder::new(file), max_bucket_size)?
        } else {
            let mut file = file;
            Self::read_from(&mut file, max_bucket_size)?
        };
        debug!(
            "Loaded index from {}: {:?}, {} keys",
            path.display(),
            loaded.header,
            loaded.index.stats().num_keys
        );
        Ok(loaded)
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

fn truncated(e: std::io::Error) -> IndexError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        IndexError::Format("unexpected end of index data".to_string())
    } else {
        IndexError::Io(e)
    }
}

fn read_u32<R: Read>(input: &mut R) -> Result<u32, IndexError> {
    input.read_u32::<LittleEndian>().map_err(truncated)
}
