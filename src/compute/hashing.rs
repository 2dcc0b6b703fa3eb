// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Non-cryptographic 32-bit hash primitives used by the signature encoder

const HASH_INIT: u32 = 0xAAAA_AAAA;

#[inline]
fn mix(hash: u32, position: usize, value: u32) -> u32 {
    if position & 1 == 0 {
        hash ^ ((hash << 7) ^ value.wrapping_mul(hash >> 3))
    } else {
        hash ^ !((hash << 11).wrapping_add(value) ^ (hash >> 5))
    }
}

/// Rolling codes of the windows starting at `start`.
///
/// Entry `r` holds the hash of `seq[start..=start + r]` masked to the feature
/// space. Radii that run past the end of the sequence stay zero. The mix uses
/// the absolute position, so identical substrings at offsets of different
/// parity hash differently.
pub fn rolling_codes(seq: &[u8], start: usize, max_radius: usize, bit_mask: u32) -> Vec<u32> {
    let mut codes = vec![0u32; max_radius + 1];
    if seq.is_empty() || start >= seq.len() {
        return codes;
    }
    let effective_end = (seq.len() - 1).min(start + max_radius);
    let mut hash = HASH_INIT;
    for (radius, position) in (start..=effective_end).enumerate() {
        hash = mix(hash, position, seq[position] as u32);
        codes[radius] = hash & bit_mask;
    }
    codes
}

/// Order-sensitive hash of a list of values, masked to `bit_mask`
pub fn hash_list(values: &[u32], bit_mask: u32) -> u32 {
    let mut hash = HASH_INIT;
    for (position, &value) in values.iter().enumerate() {
        hash = mix(hash, position, value);
    }
    hash & bit_mask
}

/// Seeded integer hash for MinHash rounds (murmur3 finalizer)
#[inline]
pub fn int_hash(key: u32, seed: u32, round: u32) -> u32 {
    let mut h = key
        ^ seed.wrapping_mul(0x9E37_79B9)
        ^ round.wrapping_mul(0x85EB_CA6B).rotate_left(13);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85EB_CA6B);
    h ^= h >> 13;
    h = h.wrapping_mul(0xC2B2_AE35);
    h ^= h >> 16;
    h
}
