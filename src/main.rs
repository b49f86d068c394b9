//! EMG Gesture Pipeline CLI
//!
//! Fit models, convert and analyse recordings, and replay them through the
//! gesture pipeline.

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use emg_gesture_pipeline::{
    config::{Config, ConfigError, StreamConfig, TrainingSource},
    core::{ModelKind, ModelRef, ReductionKind},
    recording::RecordingReader,
    stats::create_shared_log,
    stream::{Playback, PlaybackStep, Recorder, Stream},
    training, PipelineError, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Parser)]
#[command(name = "emg-pipeline")]
#[command(version = VERSION)]
#[command(about = "Streaming EMG gesture recognition", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model and save it
    #[command(group(ArgGroup::new("kind").required(true).args(["pca", "ica", "svm"])))]
    Fit {
        /// Training recordings (raw for PCA/ICA, reduced for SVM)
        #[arg(required = true)]
        recordings: Vec<PathBuf>,

        /// Fit a PCA projection
        #[arg(long)]
        pca: bool,

        /// Fit an ICA projection
        #[arg(long)]
        ica: bool,

        /// Fit the SVM gesture classifier
        #[arg(long)]
        svm: bool,

        /// Projection dimensionality
        #[arg(long, short)]
        components: Option<usize>,

        /// Output model file (defaults to the models directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Convert raw recordings into reduced recordings
    #[command(group(ArgGroup::new("reduction").required(true).args(["pca", "ica"])))]
    Convert {
        /// Raw recordings to convert
        #[arg(required = true)]
        recordings: Vec<PathBuf>,

        /// PCA training recordings or a fitted PCA model
        #[arg(long, num_args = 1..)]
        pca: Vec<PathBuf>,

        /// ICA training recordings or a fitted ICA model
        #[arg(long, num_args = 1..)]
        ica: Vec<PathBuf>,

        /// Projection dimensionality when fitting
        #[arg(long, short)]
        components: Option<usize>,

        /// Output directory (defaults to the converted recordings directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show how much signal energy the principal axes capture
    Analyse {
        /// Raw recordings to analyse
        #[arg(required = true)]
        recordings: Vec<PathBuf>,

        /// Analyse RMS-smoothed samples instead of raw values
        #[arg(long)]
        rms: bool,
    },

    /// Replay a recording through the pipeline
    Play {
        /// Recording to replay
        recording: PathBuf,

        /// PCA training recordings or a fitted PCA model
        #[arg(long, num_args = 1.., conflicts_with = "ica")]
        pca: Vec<PathBuf>,

        /// ICA training recordings or a fitted ICA model
        #[arg(long, num_args = 1..)]
        ica: Vec<PathBuf>,

        /// Reduced training recordings or a fitted SVM model
        #[arg(long, num_args = 1..)]
        svm: Vec<PathBuf>,

        /// Projection dimensionality when fitting
        #[arg(long, short)]
        components: Option<usize>,

        /// Samples per second (0 replays as fast as possible)
        #[arg(long)]
        rate: Option<f64>,

        /// Record the pipeline output to the recordings directory
        #[arg(long)]
        record: bool,
    },

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = Config::load()
        .map_err(anyhow::Error::from)
        .and_then(|config| run(cli.command, config));

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Fit {
            recordings,
            pca,
            ica,
            svm: _,
            components,
            output,
        } => {
            let kind = if pca {
                ModelKind::Pca
            } else if ica {
                ModelKind::Ica
            } else {
                ModelKind::Svm
            };
            cmd_fit(&config, &recordings, kind, components, output)
        }
        Commands::Convert {
            recordings,
            pca,
            ica,
            components,
            output,
        } => {
            let reduction = reduction_source(pca, ica)
                .context("Either --pca or --ica is required")?;
            cmd_convert(&config, &recordings, reduction, components, output)
        }
        Commands::Analyse { recordings, rms } => cmd_analyse(&config, &recordings, rms),
        Commands::Play {
            recording,
            pca,
            ica,
            svm,
            components,
            rate,
            record,
        } => {
            let reduction = reduction_source(pca, ica);
            let classifier = (!svm.is_empty()).then(|| TrainingSource::from_args(svm));
            cmd_play(
                &config, &recording, reduction, classifier, components, rate, record,
            )
        }
        Commands::Config => {
            cmd_config(&config);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Exit code for a failed command: 1 usage/config, 2 invalid recording,
/// 3 training or model failure.
fn exit_code(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<ConfigError>().is_some() {
        return 1;
    }
    match error.downcast_ref::<PipelineError>() {
        Some(
            PipelineError::InvalidHeader { .. }
            | PipelineError::Parse { .. }
            | PipelineError::Io { .. },
        ) => 2,
        Some(_) => 3,
        None => 1,
    }
}

fn stream_config(config: &Config, components: Option<usize>) -> Result<StreamConfig, ConfigError> {
    let stream = match components {
        Some(k) => config.stream.clone().with_components(k),
        None => config.stream.clone(),
    };
    stream.validate()?;
    Ok(stream)
}

fn reduction_source(
    pca: Vec<PathBuf>,
    ica: Vec<PathBuf>,
) -> Option<(ReductionKind, TrainingSource)> {
    if !pca.is_empty() {
        Some((ReductionKind::Pca, TrainingSource::from_args(pca)))
    } else if !ica.is_empty() {
        Some((ReductionKind::Ica, TrainingSource::from_args(ica)))
    } else {
        None
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d-%H%M%S").to_string()
}

fn cmd_fit(
    config: &Config,
    recordings: &[PathBuf],
    kind: ModelKind,
    components: Option<usize>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let stream_config = stream_config(config, components)?;
    let path = output.unwrap_or_else(|| {
        config
            .models_path
            .join(format!("{}_model.{}", timestamp(), kind.extension()))
    });

    println!("Fitting {kind} model from {} recording(s)", recordings.len());

    match kind {
        ModelKind::Pca | ModelKind::Ica => {
            let reduction_kind = if kind == ModelKind::Pca {
                ReductionKind::Pca
            } else {
                ReductionKind::Ica
            };
            let projection = training::fit_reduction(recordings, reduction_kind, &stream_config)?;
            // Only PCA reports explained variance
            if !projection.explained_variance_ratio().is_empty() {
                let kept: f64 = projection
                    .explained_variance_ratio()
                    .iter()
                    .take(projection.components())
                    .sum();
                println!(
                    "{} components => {:.0} % energy",
                    projection.components(),
                    kept * 100.0
                );
            }
            ModelRef::Reduction(&projection).save_to_path(&path)?;
        }
        ModelKind::Svm => {
            let classifier = training::fit_classifier(recordings, &stream_config)?;
            println!("Classes: {}", classifier.classes().join(", "));
            ModelRef::Classifier(&classifier).save_to_path(&path)?;
        }
    }

    println!("Model saved to {path:?}");
    Ok(())
}

fn cmd_convert(
    config: &Config,
    recordings: &[PathBuf],
    reduction: (ReductionKind, TrainingSource),
    components: Option<usize>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let stream_config = stream_config(config, components)?;
    let channels = stream_config.channels;
    let output_dir = output.unwrap_or_else(|| config.converted_path.clone());
    let mut stream = Stream::from_sources(stream_config, Some(reduction), None)?;

    for recording in recordings {
        stream.reset();

        // Validate before anything is written
        let reader = RecordingReader::open(recording, channels)?;
        if !reader.format().is_raw() {
            warn!(path = ?recording, "Skipping recording that is already reduced");
            continue;
        }

        let file_name = recording
            .file_name()
            .with_context(|| format!("Not a file: {recording:?}"))?;
        let target = output_dir.join(file_name);
        let mut recorder = Recorder::create(&target, &stream, reader.format())?;
        for record in reader {
            let record = record?;
            let output = stream.process(&record.payload);
            recorder.record(&record, &output)?;
        }
        let rows = recorder.rows();
        recorder.finish()?;
        println!("{recording:?} -> {target:?} ({rows} rows)");
    }
    Ok(())
}

fn cmd_analyse(config: &Config, recordings: &[PathBuf], rms: bool) -> anyhow::Result<()> {
    let report = training::analyse_energy(recordings, rms, &config.stream)?;
    println!("Energy analysis{}", if rms { " (RMS)" } else { "" });
    println!("===============");
    println!();
    print!("{report}");
    Ok(())
}

fn cmd_play(
    config: &Config,
    recording: &Path,
    reduction: Option<(ReductionKind, TrainingSource)>,
    classifier: Option<TrainingSource>,
    components: Option<usize>,
    rate: Option<f64>,
    record: bool,
) -> anyhow::Result<()> {
    println!("EMG Gesture Pipeline v{VERSION}");
    println!();

    let stream_config = stream_config(config, components)?;
    let mut playback = Playback::open(recording, stream_config.channels)?;
    let mut stream = Stream::from_sources(stream_config, reduction, classifier)?;

    let mut recorder = if record {
        let stem = recording
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("playback");
        let path = config
            .recordings_path
            .join(format!("{}_{stem}.csv", timestamp()));
        println!("Recording to {path:?}");
        Some(Recorder::create(&path, &stream, playback.format())?)
    } else {
        None
    };

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let rate = rate.unwrap_or(config.playback_rate_hz);
    let interval = (rate > 0.0).then(|| Duration::from_secs_f64(1.0 / rate));
    let log = create_shared_log();
    let mut last_gesture: Option<String> = None;

    println!("Press Ctrl+C to stop.");
    println!();

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();

        match playback.play_frame(&mut stream)? {
            PlaybackStep::Frame(frame) => {
                log.record_sample();
                log.set_frequency(stream.frequency());
                if let Some(gesture) = &frame.output.gesture {
                    log.record_gesture();
                    if last_gesture.as_ref() != Some(gesture) {
                        println!("[{}] {gesture}", frame.record.timestamp);
                        last_gesture = Some(gesture.clone());
                    }
                }
                if let Some(recorder) = recorder.as_mut() {
                    recorder.record(&frame.record, &frame.output)?;
                }
            }
            PlaybackStep::Paused => log.record_paused_sample(),
            PlaybackStep::Ended => break,
        }

        if let Some(interval) = interval {
            let elapsed = started.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
    }

    if let Some(recorder) = recorder {
        let rows = recorder.rows();
        recorder.finish()?;
        println!("Recorded {rows} rows");
    }

    println!();
    println!("{}", log.summary());
    Ok(())
}

fn cmd_config(config: &Config) {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "missing")
    }

    #[test]
    fn test_missing_model_exits_with_model_failure() {
        let err = Stream::from_sources(
            StreamConfig::default(),
            Some((
                ReductionKind::Pca,
                TrainingSource::PretrainedModel(PathBuf::from("/nonexistent/model.pca")),
            )),
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, PipelineError::ModelIo { .. }));

        let err = anyhow::Error::from(err).context("Failed to build stream");
        assert_eq!(exit_code(&err), 3);
    }

    #[test]
    fn test_exit_codes() {
        let recording = anyhow::Error::from(PipelineError::Io {
            path: PathBuf::from("a.csv"),
            source: not_found(),
        });
        assert_eq!(exit_code(&recording), 2);

        let header = anyhow::Error::from(PipelineError::InvalidHeader {
            path: PathBuf::from("a.csv"),
        });
        assert_eq!(exit_code(&header), 2);

        let config = anyhow::Error::from(ConfigError::InvalidValue("vote_window".into()));
        assert_eq!(exit_code(&config), 1);

        assert_eq!(exit_code(&PipelineError::EmptyTrainingSet.into()), 3);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
