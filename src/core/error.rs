// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Error types for seqlsh

use std::path::PathBuf;
use thiserror::Error;

use crate::core::types::{IndexValueMode, InstanceId};

#[derive(Error, Debug)]
pub enum SeqLshError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Cannot read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Cannot open file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sequence names are not unique in {path}: {name}")]
    DuplicateName { path: PathBuf, name: String },

    #[error("Interval {start}-{end} is outside sequence {sequence} of length {length}")]
    IntervalOutOfRange {
        sequence: String,
        start: usize,
        end: usize,
        length: usize,
    },

    #[error("Malformed interval line {line}: {reason}")]
    MalformedInterval { line: usize, reason: String },

    #[error("File type not recognized: {0}")]
    UnknownFormat(String),
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Signature for instance {0} was never computed")]
    MissingSignature(InstanceId),

    #[error("Index format error: {0}")]
    Format(String),

    #[error("Index I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("No instances/signatures produced")]
    NoInstances,

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    #[error("{path}: neighborhoods need instance-id indexing, got {mode:?}")]
    UnsupportedIndexMode { path: PathBuf, mode: IndexValueMode },
}
