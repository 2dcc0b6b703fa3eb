// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Sequence sources, interval tables and window segmentation

use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::core::error::InputError;
use crate::core::types::SeqFormat;

/// One named sequence as read from a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    /// Empty for formats without names
    pub name: String,
    pub sequence: Vec<u8>,
}

/// Open a file for buffered reading, decompressing `.gz` transparently
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>, InputError> {
    let file = File::open(path).map_err(|source| InputError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Streaming reader over FASTA or one-sequence-per-line input
pub struct SequenceReader {
    input: Box<dyn BufRead + Send>,
    format: SeqFormat,
    path: PathBuf,
    pending_header: Option<String>,
    line: String,
}

impl SequenceReader {
    pub fn open(path: &Path, format: SeqFormat) -> Result<Self, InputError> {
        Ok(Self::from_reader(open_input(path)?, format, path.to_path_buf()))
    }

    pub fn from_reader(input: Box<dyn BufRead + Send>, format: SeqFormat, path: PathBuf) -> Self {
        Self {
            input,
            format,
            path,
            pending_header: None,
            line: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_record(&mut self) -> Result<Option<SeqRecord>, InputError> {
        match self.format {
            SeqFormat::Fasta => self.next_fasta(),
            SeqFormat::StringSeq => self.next_line_seq(),
        }
    }

    /// Read one line into `self.line`; false at end of input
    fn read_line(&mut self) -> Result<bool, InputError> {
        self.line.clear();
        let n = self
            .input
            .read_line(&mut self.line)
            .map_err(|source| InputError::Unreadable {
                path: self.path.clone(),
                source,
            })?;
        Ok(n > 0)
    }

    fn next_fasta(&mut self) -> Result<Option<SeqRecord>, InputError> {
        let name = match self.pending_header.take() {
            Some(name) => name,
            None => loop {
                if !self.read_line()? {
                    return Ok(None);
                }
                if let Some(header) = self.line.trim_end().strip_prefix('>') {
                    break header_name(header);
                }
            },
        };

        let mut sequence = Vec::new();
        while self.read_line()? {
            let line = self.line.trim();
            if let Some(header) = line.strip_prefix('>') {
                self.pending_header = Some(header_name(header));
                break;
            }
            sequence.extend_from_slice(line.as_bytes());
        }
        Ok(Some(SeqRecord { name, sequence }))
    }

    fn next_line_seq(&mut self) -> Result<Option<SeqRecord>, InputError> {
        while self.read_line()? {
            let line = self.line.trim();
            if !line.is_empty() {
                return Ok(Some(SeqRecord {
                    name: String::new(),
                    sequence: line.as_bytes().to_vec(),
                }));
            }
        }
        Ok(None)
    }
}

fn header_name(header: &str) -> String {
    header.split_whitespace().next().unwrap_or("").to_string()
}

/// One annotated region of a sequence (0-based, half-open)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

/// BED-like annotation table keyed by sequence name
#[derive(Debug, Clone, Default)]
pub struct IntervalTable {
    by_sequence: HashMap<String, Vec<Interval>>,
}

impl IntervalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        Self::from_reader(open_input(path)?)
    }

    /// Parse `name start end [label]` lines; `#`, `track` and `browser` lines are skipped
    pub fn from_reader<R: BufRead>(input: R) -> Result<Self, InputError> {
        let mut table = Self::new();
        for (line_no, line) in input.lines().enumerate() {
            let line = line.map_err(|e| InputError::MalformedInterval {
                line: line_no + 1,
                reason: e.to_string(),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("track")
                || trimmed.starts_with("browser")
            {
                continue;
            }
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() < 3 {
                return Err(InputError::MalformedInterval {
                    line: line_no + 1,
                    reason: format!("expected at least 3 fields, got {}", fields.len()),
                });
            }
            let parse = |s: &str| {
                s.parse::<usize>().map_err(|e| InputError::MalformedInterval {
                    line: line_no + 1,
                    reason: format!("{}: {}", s, e),
                })
            };
            let start = parse(fields[1])?;
            let end = parse(fields[2])?;
            if start > end {
                return Err(InputError::MalformedInterval {
                    line: line_no + 1,
                    reason: format!("start {} after end {}", start, end),
                });
            }
            let name = fields
                .get(3)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("{}:{}-{}", fields[0], start, end));
            table.insert(fields[0], Interval { start, end, name });
        }
        Ok(table)
    }

    pub fn insert(&mut self, sequence: &str, interval: Interval) {
        self.by_sequence
            .entry(sequence.to_string())
            .or_default()
            .push(interval);
    }

    pub fn get(&self, sequence: &str) -> Option<&[Interval]> {
        self.by_sequence.get(sequence).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.by_sequence.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }
}

/// Half-open windows covering `0..len`.
///
/// `window == 0` keeps the whole range. `shift == 0` steps by the window
/// length. The last window may be shorter.
pub fn windows(len: usize, window: usize, shift: usize) -> Vec<(usize, usize)> {
    if len == 0 {
        return Vec::new();
    }
    if window == 0 || len <= window {
        return vec![(0, len)];
    }
    let step = if shift == 0 { window } else { shift };
    let mut out = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(len);
        out.push((start, end));
        if end == len {
            break;
        }
        start += step;
    }
    out
}
