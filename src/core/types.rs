// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Shared identifiers and signature types

use serde::{Deserialize, Serialize};

/// Dense, monotonically assigned instance identifier (0-based)
pub type InstanceId = u32;

/// Value stored in an inverse-index bucket. Equal to the instance id unless
/// the index is keyed by sequence or interval names.
pub type IndexValue = u32;

/// MinHash signature: one key per band
pub type Signature = Vec<u32>;

/// Key marking "no feature" in a band
pub const EMPTY_KEY: u32 = 0;

/// Uninitialized MinHash slot
pub const SENTINEL_KEY: u32 = u32::MAX;

/// Reserved keys are never indexed and always count as collisions
#[inline]
pub fn is_reserved_key(key: u32) -> bool {
    key == EMPTY_KEY || key == SENTINEL_KEY
}

/// Input file format tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeqFormat {
    /// `>name` header followed by sequence lines
    Fasta,
    /// One sequence per line, no names
    StringSeq,
}

impl std::str::FromStr for SeqFormat {
    type Err = crate::core::error::InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fasta" | "fa" => Ok(SeqFormat::Fasta),
            "seq" | "stringseq" | "string_seq" | "lines" => Ok(SeqFormat::StringSeq),
            other => Err(crate::core::error::InputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Which value an instance contributes to the inverse index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexValueMode {
    /// Signatures are computed but the index is left untouched
    None,
    /// Each instance is indexed under its own id
    #[default]
    InstanceId,
    /// All windows of a sequence share the id of the sequence name
    SequenceName,
    /// Windows are indexed under the name of the interval they came from
    IntervalName,
}
