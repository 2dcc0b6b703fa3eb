// Copyright 2025 Vijaykumar Singh
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.

//! Three-stage ingestion pipeline
//!
//! ```text
//! reader (1) --raw queue--> encoders (N) --signature queue--> finisher (1)
//! ```
//!
//! The reader splits inputs into randomly sized chunks, encoders compute
//! signatures, and the finisher is the only thread that touches the inverse
//! index. The calling thread supervises: once the reader is done and every
//! produced instance has been absorbed, it closes both queues and joins all
//! stages before returning.

use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::compute::encoder::SignatureCodec;
use crate::core::config::{IndexConfig, PipelineConfig};
use crate::core::error::{InputError, PipelineError};
use crate::core::types::{IndexValue, IndexValueMode, InstanceId, SeqFormat, Signature};
use crate::index::features::FeatureTable;
use crate::index::inverse::{IndexStats, InverseIndex};
use crate::index::neighborhood::{NeighborhoodIndex, SignatureCache};
use crate::ingest::queue::WatermarkQueue;
use crate::ingest::reader::{windows, IntervalTable, SeqRecord, SequenceReader};

/// One input file and how its instances enter the index
#[derive(Debug, Clone)]
pub struct SeqSource {
    pub path: PathBuf,
    pub format: SeqFormat,
    pub dataset: u32,
    pub index_mode: IndexValueMode,
    /// Restricts and segments sequences to annotated regions when present
    pub intervals: Option<Arc<IntervalTable>>,
}

impl SeqSource {
    pub fn new(path: impl Into<PathBuf>, format: SeqFormat) -> Self {
        Self {
            path: path.into(),
            format,
            dataset: 0,
            index_mode: IndexValueMode::default(),
            intervals: None,
        }
    }

    pub fn with_dataset(mut self, dataset: u32) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_index_mode(mut self, mode: IndexValueMode) -> Self {
        self.index_mode = mode;
        self
    }

    pub fn with_intervals(mut self, intervals: Arc<IntervalTable>) -> Self {
        self.intervals = Some(intervals);
        self
    }
}

/// Sequence fragment travelling through the pipeline
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    /// Value inserted into the index for this instance
    pub value: IndexValue,
    pub name: String,
    /// Cleared by the encoder once the signature exists
    pub sequence: Vec<u8>,
}

/// Unit of work passed between stages. Instance order inside a chunk is
/// preserved; chunks themselves may reach the finisher in any order.
#[derive(Debug, Clone)]
pub struct WorkChunk {
    pub dataset: u32,
    pub index_mode: IndexValueMode,
    pub instances: Vec<Instance>,
    pub signatures: Vec<Signature>,
}

impl WorkChunk {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// Callback run by the finisher after a chunk has been inserted
pub trait FinishHook: Send {
    fn finish_chunk(&mut self, chunk: &WorkChunk);
}

/// Finish hook that does nothing
#[derive(Debug, Default)]
pub struct NoopHook;

impl FinishHook for NoopHook {
    fn finish_chunk(&mut self, _chunk: &WorkChunk) {}
}

impl FinishHook for SignatureCache {
    fn finish_chunk(&mut self, chunk: &WorkChunk) {
        for (instance, signature) in chunk.instances.iter().zip(&chunk.signatures) {
            self.insert(instance.id, signature.clone());
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub instances: u64,
    pub signatures: u64,
    /// Sequences or fragments dropped as empty or unannotated
    pub skipped: u64,
    pub sources_read: usize,
    pub encoder_threads: usize,
    pub raw_queue_bound: usize,
    pub raw_queue_peak: usize,
    pub signature_queue_peak: usize,
    pub index_stats: IndexStats,
    pub features: FeatureTable,
}

#[derive(Debug, Default)]
struct Progress {
    produced: u64,
    absorbed: u64,
    reader_done: bool,
    failed: bool,
}

/// Shared run state owned by one pipeline invocation
struct Coordinator {
    progress: Mutex<Progress>,
    changed: Condvar,
    done: AtomicBool,
    raw: WatermarkQueue<WorkChunk>,
    signed: WatermarkQueue<WorkChunk>,
}

impl Coordinator {
    fn new(high: usize, low: usize) -> Self {
        Self {
            progress: Mutex::new(Progress::default()),
            changed: Condvar::new(),
            done: AtomicBool::new(false),
            raw: WatermarkQueue::new(high, low),
            signed: WatermarkQueue::new(high, low),
        }
    }

    fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn record_produced(&self, n: u64) {
        self.progress.lock().produced += n;
    }

    /// Returns the cumulative number of absorbed signatures
    fn record_absorbed(&self, n: u64) -> u64 {
        let mut progress = self.progress.lock();
        progress.absorbed += n;
        self.changed.notify_all();
        progress.absorbed
    }

    fn finish_reading(&self, ok: bool) {
        let mut progress = self.progress.lock();
        progress.reader_done = true;
        progress.failed |= !ok;
        self.changed.notify_all();
    }

    fn abort(&self) {
        let mut progress = self.progress.lock();
        progress.failed = true;
        self.changed.notify_all();
        drop(progress);
        self.shutdown();
    }

    fn wait_until_drained(&self) {
        let mut progress = self.progress.lock();
        while !(progress.failed || (progress.reader_done && progress.absorbed == progress.produced)) {
            self.changed.wait(&mut progress);
        }
    }

    fn shutdown(&self) {
        self.done.store(true, Ordering::SeqCst);
        self.raw.close();
        self.signed.close();
    }
}

/// Aborts the run if a stage thread unwinds
struct PanicGuard<'a>(&'a Coordinator);

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.abort();
        }
    }
}

pub struct IngestionPipeline {
    codec: SignatureCodec,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(codec: SignatureCodec, config: PipelineConfig) -> Self {
        Self { codec, config }
    }

    pub fn codec(&self) -> &SignatureCodec {
        &self.codec
    }

    /// Ingest every source into `index`, calling `hook` after each chunk.
    ///
    /// Fails on unreadable input, duplicate FASTA names (when the index is
    /// updated), out-of-range intervals, or if no instance was produced.
    pub fn run(
        &self,
        sources: &[SeqSource],
        index: &mut InverseIndex,
        hook: &mut dyn FinishHook,
    ) -> Result<IngestReport, PipelineError> {
        let workers = self.config.encoder_threads().max(1);
        self.log_parameters(sources.len(), workers);

        let coordinator = Coordinator::new(
            workers * self.config.high_watermark_factor,
            workers * self.config.low_watermark_factor,
        );
        let codec = &self.codec;
        let config = &self.config;
        let seed = self.codec.config().random_seed as u64;
        let sink = &mut *index;
        let hook = &mut *hook;

        let reader_output = crossbeam::thread::scope(|scope| {
            let coordinator = &coordinator;

            let finisher = scope.spawn(move |_| {
                let _guard = PanicGuard(coordinator);
                finish_loop(coordinator, sink, hook)
            });
            let encoders: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move |_| {
                        let _guard = PanicGuard(coordinator);
                        encode_loop(codec, coordinator)
                    })
                })
                .collect();
            let reader = scope.spawn(move |_| {
                let _guard = PanicGuard(coordinator);
                let output = ReaderStage::new(config, coordinator, seed).run(sources);
                coordinator.finish_reading(output.is_ok());
                output
            });

            coordinator.wait_until_drained();
            coordinator.shutdown();

            let reader_output = reader
                .join()
                .map_err(|_| PipelineError::WorkerPanicked("reader"))?;
            for encoder in encoders {
                encoder
                    .join()
                    .map_err(|_| PipelineError::WorkerPanicked("encoder"))?;
            }
            finisher
                .join()
                .map_err(|_| PipelineError::WorkerPanicked("finisher"))?;
            reader_output
        })
        .map_err(|_| PipelineError::WorkerPanicked("pipeline"))??;

        let progress = coordinator.progress.lock();
        let stats = index.stats();
        if stats.num_keys > 0 {
            info!(
                "Inverse index ratio of overfull buckets: {:.6} {}/{} instances {}",
                stats.overflow_ratio(),
                stats.num_full_buckets,
                stats.num_keys,
                progress.produced
            );
        }
        if progress.produced == 0 {
            return Err(PipelineError::NoInstances);
        }
        info!("✅ Instances/signatures produced {}", progress.produced);

        Ok(IngestReport {
            instances: progress.produced,
            signatures: progress.absorbed,
            skipped: reader_output.skipped,
            sources_read: reader_output.sources_read,
            encoder_threads: workers,
            raw_queue_bound: coordinator.raw.high_watermark(),
            raw_queue_peak: coordinator.raw.peak(),
            signature_queue_peak: coordinator.signed.peak(),
            index_stats: stats,
            features: reader_output.features,
        })
    }

    /// Run the pipeline into a fresh index while caching every signature, so
    /// neighborhoods can be queried by instance id afterwards.
    ///
    /// Every source must index by [`IndexValueMode::InstanceId`].
    pub fn build_neighborhood_index(
        &self,
        sources: &[SeqSource],
        index_config: &IndexConfig,
    ) -> Result<(NeighborhoodIndex, IngestReport), PipelineError> {
        let mut index = InverseIndex::new(
            self.codec.num_hash_functions(),
            index_config.max_bucket_size,
        );
        if let Some(source) = sources
            .iter()
            .find(|s| s.index_mode != IndexValueMode::InstanceId)
        {
            return Err(PipelineError::UnsupportedIndexMode {
                path: source.path.clone(),
                mode: source.index_mode,
            });
        }
        let mut signatures = SignatureCache::new();
        let report = self.run(sources, &mut index, &mut signatures)?;
        Ok((NeighborhoodIndex::new(index, signatures, index_config), report))
    }

    fn log_parameters(&self, num_sources: usize, workers: usize) {
        let encoder = self.codec.config();
        info!("Using {} bits to encode features", encoder.hash_bit_size);
        info!("Using {} as random seed", encoder.random_seed);
        info!(
            "Using {} hash functions (with factor {} for single minhash)",
            encoder.num_hash_functions, encoder.num_repeats_hash_function
        );
        info!("Using {} as hash shingle factor", encoder.num_hash_shingles);
        info!("Using feature radius   {}..{}", encoder.min_radius, encoder.radius);
        info!("Using feature distance {}..{}", encoder.min_distance, encoder.distance);
        info!(
            "Using sequence window  {} shift {}",
            self.config.seq_window, self.config.seq_shift
        );
        info!(
            "🚀 Computing MinHash signatures on the fly while reading {} file(s) with {} worker threads and 2 helper threads",
            num_sources, workers
        );
    }
}

fn encode_loop(codec: &SignatureCodec, coordinator: &Coordinator) {
    while let Some(mut chunk) = coordinator.raw.pop() {
        chunk.signatures = chunk
            .instances
            .iter_mut()
            .map(|instance| {
                let signature = codec.encode(&instance.sequence);
                instance.sequence = Vec::new();
                signature
            })
            .collect();
        if !coordinator.signed.push(chunk) {
            break;
        }
    }
}

fn finish_loop(coordinator: &Coordinator, index: &mut InverseIndex, hook: &mut dyn FinishHook) {
    while let Some(chunk) = coordinator.signed.pop() {
        if chunk.index_mode != IndexValueMode::None {
            for (instance, signature) in chunk.instances.iter().zip(&chunk.signatures) {
                index.insert(signature, instance.value);
            }
        }
        hook.finish_chunk(&chunk);

        let n = chunk.len() as u64;
        let absorbed = coordinator.record_absorbed(n);
        if absorbed % 1_000_000 < n {
            info!(
                "finisher updated index with {} signatures, all_sigs={} sig_queue={}",
                n,
                absorbed,
                coordinator.signed.len()
            );
        }
    }
}

struct ReaderOutput {
    features: FeatureTable,
    skipped: u64,
    sources_read: usize,
}

/// Single-threaded producer of instance chunks
struct ReaderStage<'a> {
    config: &'a PipelineConfig,
    coordinator: &'a Coordinator,
    rng: StdRng,
    features: FeatureTable,
    seen_names: HashSet<String>,
    next_id: InstanceId,
    skipped: u64,
}

impl<'a> ReaderStage<'a> {
    fn new(config: &'a PipelineConfig, coordinator: &'a Coordinator, seed: u64) -> Self {
        Self {
            config,
            coordinator,
            rng: StdRng::seed_from_u64(seed),
            features: FeatureTable::new(),
            seen_names: HashSet::new(),
            next_id: 0,
            skipped: 0,
        }
    }

    fn run(mut self, sources: &[SeqSource]) -> Result<ReaderOutput, PipelineError> {
        let mut sources_read = 0;
        for source in sources {
            if self.coordinator.is_done() {
                break;
            }
            self.read_source(source)?;
            sources_read += 1;
        }
        Ok(ReaderOutput {
            features: self.features,
            skipped: self.skipped,
            sources_read,
        })
    }

    /// Random chunk size that grows with the amount of data already read
    fn chunk_target(&mut self) -> usize {
        let min_chunk = self.config.min_chunk;
        let scaled = (self.next_id.max(1) as f64).log2() as usize * min_chunk;
        let base = min_chunk.max(scaled);
        self.rng.gen_range(base..=base * 3)
    }

    fn new_chunk(&mut self, source: &SeqSource) -> (WorkChunk, usize) {
        let target = self.chunk_target();
        let chunk = WorkChunk {
            dataset: source.dataset,
            index_mode: source.index_mode,
            instances: Vec::with_capacity(target),
            signatures: Vec::new(),
        };
        (chunk, target)
    }

    /// Hand a chunk to the encoders; false once the pipeline is shutting down
    fn emit(&mut self, chunk: WorkChunk) -> bool {
        if chunk.is_empty() {
            return true;
        }
        let n = chunk.len() as u64;
        self.coordinator.record_produced(n);
        let produced = self.next_id as u64;
        if produced % 1_000_000 < n {
            info!(
                "instances read {} raw_queue={}",
                produced,
                self.coordinator.raw.len()
            );
        }
        self.coordinator.raw.push(chunk)
    }

    fn read_source(&mut self, source: &SeqSource) -> Result<(), PipelineError> {
        info!("📖 Reading {}", source.path.display());
        let mut reader = SequenceReader::open(&source.path, source.format)?;
        let mut file_instances = 0u64;
        let (mut chunk, mut target) = self.new_chunk(source);

        while let Some(record) = reader.next_record()? {
            if source.format == SeqFormat::Fasta
                && source.index_mode != IndexValueMode::None
                && !self.seen_names.insert(record.name.clone())
            {
                return Err(InputError::DuplicateName {
                    path: source.path.clone(),
                    name: record.name,
                }
                .into());
            }

            for (value, fragment) in self.fragments(source, &record)? {
                let id = self.next_id;
                self.next_id += 1;
                file_instances += 1;
                let name = if record.name.is_empty() {
                    id.to_string()
                } else {
                    record.name.clone()
                };
                chunk.instances.push(Instance {
                    id,
                    value: value.unwrap_or(id),
                    name,
                    sequence: fragment,
                });

                if chunk.len() >= target {
                    let (next, next_target) = self.new_chunk(source);
                    let full = std::mem::replace(&mut chunk, next);
                    target = next_target;
                    if !self.emit(full) {
                        return Ok(());
                    }
                }
            }
        }
        self.emit(chunk);
        info!(
            "{} instances produced from {}",
            file_instances,
            source.path.display()
        );
        Ok(())
    }

    /// Non-empty fragments of one record with their name-derived index value.
    ///
    /// `None` as value means the instance is indexed under its own id.
    fn fragments(
        &mut self,
        source: &SeqSource,
        record: &SeqRecord,
    ) -> Result<Vec<(Option<IndexValue>, Vec<u8>)>, PipelineError> {
        let len = record.sequence.len();
        let intervals = match &source.intervals {
            Some(table) => match table.get(&record.name) {
                Some(intervals) => Some(intervals),
                None => {
                    debug!("no interval entry for sequence {}", record.name);
                    self.skipped += 1;
                    return Ok(Vec::new());
                }
            },
            None => None,
        };

        // Only sequences that reach the index get a feature value
        let sequence_value = match source.index_mode {
            IndexValueMode::SequenceName => Some(self.features.value_for(&record.name)),
            IndexValueMode::IntervalName if intervals.is_none() => {
                Some(self.features.value_for(&record.name))
            }
            _ => None,
        };

        let mut regions = Vec::new();
        match intervals {
            Some(intervals) => {
                for interval in intervals {
                    if interval.start > interval.end || interval.end > len {
                        return Err(InputError::IntervalOutOfRange {
                            sequence: record.name.clone(),
                            start: interval.start,
                            end: interval.end,
                            length: len,
                        }
                        .into());
                    }
                    let value = if source.index_mode == IndexValueMode::IntervalName {
                        Some(self.features.value_for(&interval.name))
                    } else {
                        sequence_value
                    };
                    regions.push((value, interval.start, interval.end));
                }
            }
            None => regions.push((sequence_value, 0, len)),
        }

        let window = self.config.seq_window as usize;
        let shift = self.config.seq_shift as usize;
        let mut fragments = Vec::new();
        for (value, start, end) in regions {
            let region = &record.sequence[start..end];
            let pieces = windows(region.len(), window, shift);
            if pieces.is_empty() {
                self.skipped += 1;
                continue;
            }
            for (from, to) in pieces {
                fragments.push((value, region[from..to].to_vec()));
            }
        }
        if fragments.is_empty() && len == 0 {
            warn!("empty sequence {} skipped", record.name);
        }
        Ok(fragments)
    }
}
