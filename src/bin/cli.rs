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

//! seqlsh - build, persist and cluster MinHash sequence indexes

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use seqlsh::cluster::{save_clustering, DensityClusterer};
use seqlsh::compute::SignatureCodec;
use seqlsh::index::{InverseIndex, PersistedIndex};
use seqlsh::ingest::{IngestionPipeline, IntervalTable, NoopHook, SeqSource};
use seqlsh::{Config, IndexValueMode, SeqFormat};

#[derive(Parser)]
#[command(name = "seqlsh")]
#[command(about = "MinHash inverse index and density clustering for sequence collections")]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Encoder threads (0 = all cores)
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest sequences and write density clusters
    Cluster {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, default_value = "clusters.txt")]
        clusters: PathBuf,

        #[arg(long, default_value = "neighborhoods.txt")]
        neighborhoods: PathBuf,
    },
    /// Ingest sequences and persist the inverse index
    Index {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, value_enum, default_value_t = ModeArg::InstanceId)]
        mode: ModeArg,

        /// Output path; a `.gz` suffix compresses the index
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the header and bucket summary of a persisted index
    Inspect { index: PathBuf },
}

#[derive(Args)]
struct InputArgs {
    /// Sequence files, gzip accepted
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = FormatArg::Fasta)]
    format: FormatArg,

    /// BED-like table restricting sequences to annotated regions
    #[arg(long)]
    intervals: Option<PathBuf>,

    #[arg(long)]
    num_hash_functions: Option<u32>,

    #[arg(long)]
    max_bucket_size: Option<usize>,

    /// Minimum fraction of informative bands a neighbor must share
    #[arg(long)]
    sim: Option<f64>,

    #[arg(long)]
    window: Option<u32>,

    #[arg(long)]
    shift: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Fasta,
    Seq,
}

impl From<FormatArg> for SeqFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Fasta => SeqFormat::Fasta,
            FormatArg::Seq => SeqFormat::StringSeq,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    None,
    InstanceId,
    SequenceName,
    IntervalName,
}

impl From<ModeArg> for IndexValueMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::None => IndexValueMode::None,
            ModeArg::InstanceId => IndexValueMode::InstanceId,
            ModeArg::SequenceName => IndexValueMode::SequenceName,
            ModeArg::IntervalName => IndexValueMode::IntervalName,
        }
    }
}

impl InputArgs {
    fn apply_to(&self, config: &mut Config) {
        if let Some(n) = self.num_hash_functions {
            config.encoder.num_hash_functions = n;
        }
        if let Some(n) = self.max_bucket_size {
            config.index.max_bucket_size = n;
        }
        if let Some(sim) = self.sim {
            config.index.pure_approximate_sim = sim;
        }
        if let Some(window) = self.window {
            config.pipeline.seq_window = window;
        }
        if let Some(shift) = self.shift {
            config.pipeline.seq_shift = shift;
        }
    }

    fn sources(&self, mode: IndexValueMode) -> Result<Vec<SeqSource>> {
        let intervals = match &self.intervals {
            Some(path) => Some(Arc::new(IntervalTable::load(path).with_context(|| {
                format!("failed to load intervals from {}", path.display())
            })?)),
            None => None,
        };
        Ok(self
            .inputs
            .iter()
            .enumerate()
            .map(|(dataset, path)| {
                let source = SeqSource::new(path, self.format.into())
                    .with_dataset(dataset as u32)
                    .with_index_mode(mode);
                match &intervals {
                    Some(table) => source.with_intervals(Arc::clone(table)),
                    None => source,
                }
            })
            .collect())
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_toml_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(threads) = cli.threads {
        config.pipeline.num_threads = threads;
    }
    match &cli.command {
        Command::Cluster { input, .. } | Command::Index { input, .. } => input.apply_to(&mut config),
        Command::Inspect { .. } => {}
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn pipeline(config: &Config) -> Result<IngestionPipeline> {
    let codec = SignatureCodec::new(config.encoder.clone()).context("invalid encoder parameters")?;
    Ok(IngestionPipeline::new(codec, config.pipeline.clone()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &cli.command {
        Command::Cluster {
            input,
            clusters,
            neighborhoods,
        } => {
            let sources = input.sources(IndexValueMode::InstanceId)?;
            let (index, report) = pipeline(&config)?
                .build_neighborhood_index(&sources, &config.index)
                .context("ingestion failed")?;
            info!(
                "Ingested {} instances ({} skipped) with {} encoder threads",
                report.instances, report.skipped, report.encoder_threads
            );

            let result = DensityClusterer::new(&index, config.cluster.clone())
                .cluster_all()
                .context("clustering failed")?;
            save_clustering(&result, clusters, neighborhoods)
                .context("failed to write clustering output")?;
        }
        Command::Index {
            input,
            mode,
            output,
        } => {
            let sources = input.sources((*mode).into())?;
            let mut index =
                InverseIndex::new(config.encoder.num_hash_functions as usize, config.index.max_bucket_size);
            let pipeline = pipeline(&config)?;
            let report = pipeline
                .run(&sources, &mut index, &mut NoopHook)
                .context("ingestion failed")?;

            PersistedIndex::new(pipeline.codec().config(), &config.pipeline, report.features, index)
                .save(output)
                .with_context(|| format!("failed to save index to {}", output.display()))?;
        }
        Command::Inspect { index } => {
            let persisted = PersistedIndex::load(index, config.index.max_bucket_size)
                .with_context(|| format!("failed to load index {}", index.display()))?;
            let stats = persisted.index.stats();

            println!("{}", serde_json::to_string_pretty(&persisted.header)?);
            println!("features:        {}", persisted.features.len());
            println!("hash functions:  {}", persisted.index.num_hash_functions());
            println!("bucket keys:     {}", stats.num_keys);
            println!(
                "overfull:        {} ({:.4})",
                stats.num_full_buckets,
                stats.overflow_ratio()
            );
            for (band, buckets) in persisted.index.bands().iter().enumerate() {
                let entries: usize = buckets.values().map(|b| b.members().len()).sum();
                println!("band {:>4}: {} buckets, {} entries", band, buckets.len(), entries);
            }
        }
    }
    Ok(())
}
