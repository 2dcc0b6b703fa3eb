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

//! MinHash inverse index, neighborhood queries and index persistence

pub mod features;
pub mod inverse;
pub mod neighborhood;
pub mod persistence;

pub use features::FeatureTable;
pub use inverse::{trim_neighborhood, Bucket, IndexStats, InverseIndex, Neighborhood, QueryVotes};
pub use neighborhood::{NeighborhoodIndex, SignatureCache};
pub use persistence::{IndexHeader, PersistedIndex};
