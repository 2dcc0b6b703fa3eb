// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Name to index-value table for name-keyed indexes

use std::collections::BTreeMap;

use crate::core::types::IndexValue;

/// Sequence or interval names mapped to 1-based index values.
///
/// Iteration is in ascending name order, which is also the persisted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureTable {
    by_name: BTreeMap<String, IndexValue>,
    last_value: IndexValue,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `name`, assigning the next free value on first sight
    pub fn value_for(&mut self, name: &str) -> IndexValue {
        if let Some(&value) = self.by_name.get(name) {
            return value;
        }
        self.last_value += 1;
        self.by_name.insert(name.to_string(), self.last_value);
        self.last_value
    }

    /// Insert a persisted entry as-is
    pub fn insert(&mut self, name: String, value: IndexValue) {
        self.last_value = self.last_value.max(value);
        self.by_name.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<IndexValue> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, IndexValue)> {
        self.by_name.iter().map(|(k, &v)| (k.as_str(), v))
    }
}
