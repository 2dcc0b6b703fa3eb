/*
 * Copyright 2025 Vijaykumar Singh
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # seqlsh - MinHash Inverse Index for Sequences
//!
//! seqlsh builds an approximate nearest-neighbor index over large sequence
//! collections using MinHash signatures and clusters the indexed instances by
//! local neighborhood density, without ever materializing pairwise similarities.
//!
//! ## Key Features
//!
//! - **Signature Encoding**: rolling-hash endpoint-pair features reduced to MinHash signatures
//! - **Banded Inverse Index**: bounded buckets with terminal overflow semantics
//! - **Concurrent Ingestion**: reader / parallel encoders / single-writer finisher with backpressure
//! - **Density Clustering**: greedy streaming clustering driven by index neighborhoods
//! - **Persistence**: symmetric binary index layout, optionally gzip-compressed

pub mod cluster;
pub mod compute;
pub mod core;
pub mod index;
pub mod ingest;

pub use crate::core::*;

pub type Result<T> = std::result::Result<T, SeqLshError>;
