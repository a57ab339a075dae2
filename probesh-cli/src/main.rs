//! probesh: Command-line light-probe set encoder.
//!
//! Reads `.pom` cube-map captures, clusters them into probe sets and writes
//! `.probeset` files, JSON summaries and PNG previews.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use probesh_algorithms::{
    compute_statistics, encode_probe, AlgorithmParams, ClusteringMethod, EncoderConfig,
};
use probesh_core::{BoxRoom, SampleBatch};
use probesh_io::{
    save_preview, write_summary_json, PomFileReader, PomFileWriter, PreviewOptions,
    ProbeSetWriter, ViewMode,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    ProbeshIo(#[from] probesh_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] probesh_core::Error),

    #[error("Config file error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Set segmentation method.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Method {
    /// Weighted k-means with k-means++ seeding (primary)
    #[default]
    Kmeans,
    /// Region growing over adjacent texels
    Filling,
}

impl From<Method> for ClusteringMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Kmeans => ClusteringMethod::KMeans,
            Method::Filling => ClusteringMethod::Filling,
        }
    }
}

/// Preview display mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Albedo,
    Distance,
    Normal,
    SetIndex,
    SetColor,
    SetDistance,
    SetNormal,
    SetSamples,
    Sh,
}

impl From<Mode> for ViewMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Albedo => ViewMode::Albedo,
            Mode::Distance => ViewMode::Distance,
            Mode::Normal => ViewMode::Normal,
            Mode::SetIndex => ViewMode::SetIndex,
            Mode::SetColor => ViewMode::SetColor,
            Mode::SetDistance => ViewMode::SetDistance,
            Mode::SetNormal => ViewMode::SetNormal,
            Mode::SetSamples => ViewMode::SetSamples,
            Mode::Sh => ViewMode::Sh,
        }
    }
}

/// Clustering parameters shared by `encode` and `preview`.
///
/// Unset flags fall back to the config file, then to the defaults.
#[derive(Args, Debug, Clone, Default)]
struct ClusterArgs {
    /// Set segmentation method
    #[arg(short, long, value_enum, default_value = "kmeans")]
    method: Method,

    /// Number of sets (1-128)
    #[arg(short, long)]
    k: Option<usize>,

    /// Geometric (0) vs albedo (1) balance
    #[arg(long)]
    lambda: Option<f32>,

    /// Light samples per set (1-256)
    #[arg(long)]
    light_samples: Option<usize>,

    /// Albedo importance (0-1)
    #[arg(long)]
    weight_albedo: Option<f32>,

    /// Normal importance (0-1)
    #[arg(long)]
    weight_normal: Option<f32>,

    /// Position importance (0-1)
    #[arg(long)]
    weight_position: Option<f32>,

    /// k-means iteration cap
    #[arg(long)]
    max_iterations: Option<usize>,

    /// k-means seed
    #[arg(long)]
    seed: Option<u64>,

    /// Filling tolerance between adjacent samples
    #[arg(long)]
    tolerance: Option<f32>,

    /// Filling regions below this size are dropped
    #[arg(long)]
    min_set_size: Option<usize>,

    /// JSON parameter file
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Parameter file layout: encoder fields and algorithm fields side by side.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ParamsFile {
    #[serde(flatten)]
    encoder: EncoderConfig,
    max_iterations: usize,
    seed: u64,
    tolerance: f32,
    min_set_size: usize,
}

impl Default for ParamsFile {
    fn default() -> Self {
        let params = AlgorithmParams::default();
        Self {
            encoder: EncoderConfig::default(),
            max_iterations: params.max_iterations,
            seed: params.seed,
            tolerance: params.fill_tolerance,
            min_set_size: params.min_set_size,
        }
    }
}

impl ClusterArgs {
    /// Merges defaults, the config file and command-line flags, in that order.
    fn resolve(&self) -> Result<(EncoderConfig, AlgorithmParams)> {
        let file = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str::<ParamsFile>(&text)?
            }
            None => ParamsFile::default(),
        };

        let mut config = file.encoder;
        if let Some(k) = self.k {
            config.k = k;
        }
        if let Some(lambda) = self.lambda {
            config.lambda = lambda;
        }
        if let Some(count) = self.light_samples {
            config.light_samples = count;
        }
        if let Some(w) = self.weight_albedo {
            config.weight_albedo = w;
        }
        if let Some(w) = self.weight_normal {
            config.weight_normal = w;
        }
        if let Some(w) = self.weight_position {
            config.weight_position = w;
        }

        let params = AlgorithmParams {
            max_iterations: self.max_iterations.unwrap_or(file.max_iterations),
            seed: self.seed.unwrap_or(file.seed),
            fill_tolerance: self.tolerance.unwrap_or(file.tolerance),
            min_set_size: self.min_set_size.unwrap_or(file.min_set_size),
        };
        Ok((config, params))
    }
}

/// Light-probe set encoder.
#[derive(Parser)]
#[command(name = "probesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug logging (otherwise RUST_LOG, default info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a capture into probe sets
    Encode {
        /// Input capture (.pom)
        input: PathBuf,

        /// Output probe set file (.probeset)
        #[arg(short, long)]
        output: PathBuf,

        /// Also write a JSON summary
        #[arg(long)]
        summary: Option<PathBuf>,

        #[command(flatten)]
        cluster: ClusterArgs,
    },

    /// Show information about a capture
    Info {
        /// Input capture (.pom)
        input: PathBuf,
    },

    /// Render a cube-cross PNG of the capture and its sets
    Preview {
        /// Input capture (.pom)
        input: PathBuf,

        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,

        /// What to display
        #[arg(long, value_enum, default_value = "set-color")]
        mode: Mode,

        /// Only show this set
        #[arg(long)]
        isolate_set: Option<usize>,

        /// Show set averages in albedo/distance/normal modes
        #[arg(long)]
        set_average: bool,

        #[command(flatten)]
        cluster: ClusterArgs,
    },

    /// Write a synthetic box-room capture
    Synth {
        /// Output capture (.pom)
        #[arg(short, long)]
        output: PathBuf,

        /// Cube face resolution
        #[arg(long, default_value = "64")]
        face_size: u32,

        /// Leave the ceiling open to the sky
        #[arg(long)]
        open_ceiling: bool,
    },

    /// Benchmark k-means against filling
    Benchmark {
        /// Input capture (.pom)
        input: PathBuf,

        /// Number of iterations
        #[arg(short, long, default_value = "3")]
        iterations: usize,
    },
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn load_capture(path: &Path) -> Result<SampleBatch> {
    let reader = PomFileReader::open(path)?;
    Ok(reader.read_batch()?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Encode {
            input,
            output,
            summary,
            cluster,
        } => {
            // Encoding pipeline:
            // 1. Load the capture
            // 2. Cluster samples into sets
            // 3. Encode sets (SH9, light samples)
            // 4. Write outputs
            let (config, params) = cluster.resolve()?;
            config.validate()?;

            let start = Instant::now();
            let mut batch = load_capture(&input)?;
            info!("loaded {} samples from {}", batch.len(), input.display());

            let probe = encode_probe(&mut batch, cluster.method.into(), &config, &params)?;

            ProbeSetWriter::create(&output)?.write_probe(&probe)?;
            info!("wrote {}", output.display());
            if let Some(path) = summary {
                write_summary_json(&path, &probe)?;
                info!("wrote summary {}", path.display());
            }

            let elapsed = start.elapsed();
            println!(
                "Encoded {} in {:.2}s",
                input.display(),
                elapsed.as_secs_f64()
            );
            println!("Sets: {}", probe.sets.len());
            println!("Light samples: {}", probe.light_sample_count());
        }

        Commands::Info { input } => {
            let reader = PomFileReader::open(&input)?;
            let header = *reader.header();
            let file_size = reader.file_size();

            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                file_size,
                file_size as f64 / 1_000_000.0
            );
            println!("Version: {}", header.version);
            println!("Face size: {}", header.face_size);
            println!("Samples: {}", header.sample_count());
            println!(
                "Probe position: ({:.3}, {:.3}, {:.3})",
                header.position.x, header.position.y, header.position.z
            );
            println!("Far distance: {}", header.far_distance);

            let batch = reader.read_batch()?;
            let stats = compute_statistics(&batch);
            println!(
                "Geometry samples: {} (sky: {})",
                stats.geometry_samples, stats.sky_samples
            );
            if stats.geometry_samples > 0 {
                println!(
                    "Distance: mean {:.3}, harmonic {:.3}, range {:.3} - {:.3}",
                    stats.mean_distance,
                    stats.mean_harmonic_distance,
                    stats.min_distance,
                    stats.max_distance
                );
                println!(
                    "Bounds: ({:.3}, {:.3}, {:.3}) - ({:.3}, {:.3}, {:.3})",
                    stats.bbox_min.x,
                    stats.bbox_min.y,
                    stats.bbox_min.z,
                    stats.bbox_max.x,
                    stats.bbox_max.y,
                    stats.bbox_max.z
                );
            }
        }

        Commands::Preview {
            input,
            output,
            mode,
            isolate_set,
            set_average,
            cluster,
        } => {
            let (config, params) = cluster.resolve()?;
            let config = config.with_isolate_set(isolate_set);
            config.validate()?;

            let mut batch = load_capture(&input)?;
            let probe = encode_probe(&mut batch, cluster.method.into(), &config, &params)?;

            let options = PreviewOptions {
                mode: mode.into(),
                isolate_set: config.isolate_set,
                set_average,
            };
            save_preview(&output, &batch, &probe, &options)?;
            println!(
                "Wrote {} ({:?}, {} sets)",
                output.display(),
                mode,
                probe.sets.len()
            );
        }

        Commands::Synth {
            output,
            face_size,
            open_ceiling,
        } => {
            let room = BoxRoom::default().with_open_ceiling(open_ceiling);
            let batch = room.capture(room.center(), face_size);
            PomFileWriter::create(&output)?.write_batch(&batch)?;
            println!(
                "Wrote {} ({} samples, face size {})",
                output.display(),
                batch.len(),
                face_size
            );
        }

        Commands::Benchmark { input, iterations } => {
            let base_batch = load_capture(&input)?;
            let config = EncoderConfig::default();
            let params = AlgorithmParams::default();

            println!(
                "Benchmarking with {} samples, {} iterations",
                base_batch.len(),
                iterations
            );
            println!(
                "{:<10} | {:<15} | {:<15} | {:<15} | {:<6}",
                "Method", "Mean Time (ms)", "Min Time (ms)", "Max Time (ms)", "Sets"
            );
            println!("{:-<74}", "");

            let methods = [
                (ClusteringMethod::KMeans, "k-means"),
                (ClusteringMethod::Filling, "Filling"),
            ];
            for (method, name) in methods {
                let mut times = Vec::with_capacity(iterations);
                let mut sets = 0;

                for _ in 0..iterations {
                    let start = Instant::now();
                    let mut batch = base_batch.clone();
                    let probe = encode_probe(&mut batch, method, &config, &params)?;
                    times.push(start.elapsed().as_secs_f64() * 1000.0);
                    sets = probe.sets.len();
                }

                if times.is_empty() {
                    continue;
                }
                let min_time = times.iter().fold(f64::INFINITY, |a, &b| a.min(b));
                let max_time = times.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let mean_time = times.iter().sum::<f64>() / times.len() as f64;

                println!(
                    "{:<10} | {:<15.2} | {:<15.2} | {:<15.2} | {:<6}",
                    name, mean_time, min_time, max_time, sets
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let (config, params) = ClusterArgs::default().resolve().unwrap();
        assert_eq!(config, EncoderConfig::default());
        assert_eq!(params.max_iterations, AlgorithmParams::default().max_iterations);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"k": 12, "lambda": 0.25, "seed": 9, "tolerance": 0.3}"#)
            .unwrap();

        let args = ClusterArgs {
            k: Some(20),
            config: Some(path),
            ..ClusterArgs::default()
        };
        let (config, params) = args.resolve().unwrap();
        assert_eq!(config.k, 20);
        assert!((config.lambda - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.light_samples, 64);
        assert_eq!(params.seed, 9);
        assert!((params.fill_tolerance - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_bad_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, "{ not json").unwrap();
        let args = ClusterArgs {
            config: Some(path),
            ..ClusterArgs::default()
        };
        assert!(matches!(args.resolve(), Err(CliError::Json(_))));
    }

    #[test]
    fn test_cli_parses_encode() {
        let cli = Cli::try_parse_from([
            "probesh", "encode", "in.pom", "-o", "out.probeset", "--k", "8", "--method",
            "filling", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Encode { cluster, .. } => {
                assert_eq!(cluster.k, Some(8));
                assert!(matches!(cluster.method, Method::Filling));
            }
            _ => panic!("expected encode"),
        }
    }
}
