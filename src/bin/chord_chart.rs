use std::path::{Path, PathBuf};
use std::time::Instant;

use chord_chart_rs::pipeline::batch::default_workers;
use chord_chart_rs::report::build_report;
use chord_chart_rs::{process_batch, ChartConfig, ChartPipelineBuilder, SongJob, SongOutcome};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

#[path = "chord_chart/json_report_formatter.rs"]
mod json_report_formatter;
#[path = "chord_chart/track_catalog.rs"]
mod track_catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BpmFold {
    /// Fold into the configured range (60-160 by default).
    Range,
    /// Keep the measured tempo as is.
    Off,
}

#[derive(Debug, Parser)]
#[command(name = "chord_chart")]
#[command(about = "Generate bar-aligned chord and lyric charts with confidence scores")]
struct Args {
    /// Track names to process (file names without extension).
    tracks: Vec<String>,
    /// Process every track in the input directory.
    #[arg(long, default_value_t = false)]
    all: bool,
    #[arg(long, env = "CHORD_CHART_INPUT_DIR", default_value = "input_songs")]
    input_dir: PathBuf,
    #[arg(long, env = "CHORD_CHART_OUT_DIR", default_value = "output_charts")]
    out_dir: PathBuf,
    #[arg(long, env = "CHORD_CHART_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "CHORD_CHART_JOBS")]
    jobs: Option<usize>,
    /// Write a JSON batch report to this path.
    #[arg(long, env = "CHORD_CHART_REPORT")]
    report: Option<PathBuf>,
    /// Parent directory for per-song scratch storage.
    #[arg(long, env = "CHORD_CHART_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,
    #[arg(long)]
    accept_threshold: Option<f64>,
    #[arg(long)]
    beats_per_bar: Option<u32>,
    #[arg(long)]
    subdivisions: Option<u32>,
    #[arg(long)]
    bars_per_line: Option<u32>,
    #[arg(long)]
    chord_weight: Option<f64>,
    #[arg(long)]
    lyric_weight: Option<f64>,
    #[arg(long, value_enum)]
    bpm_fold: Option<BpmFold>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    let available = track_catalog::discover_tracks(&args.input_dir)?;
    let selected = if args.all {
        available
            .iter()
            .map(|(name, path)| (name.clone(), path.clone()))
            .collect::<Vec<_>>()
    } else if args.tracks.is_empty() {
        print_available(&args.input_dir, available.keys());
        return Ok(());
    } else {
        track_catalog::select_tracks(&available, &args.tracks)?
    };
    if selected.is_empty() {
        return Err(format!(
            "No tracks found in '{}'.",
            args.input_dir.display()
        ));
    }

    let mut builder = ChartPipelineBuilder::new(config.clone());
    if let Some(scratch_dir) = &args.scratch_dir {
        builder = builder.with_scratch_root(scratch_dir);
    }
    let pipeline = builder
        .build()
        .map_err(|err| format!("Failed to set up chart pipeline: {err}"))?;

    let jobs: Vec<SongJob> = selected
        .into_iter()
        .map(|(name, path)| SongJob { name, path })
        .collect();
    let workers = args.jobs.unwrap_or_else(default_workers);
    eprintln!("Batch: {} track(s), jobs={}", jobs.len(), workers);

    let progress = ProgressBar::new(jobs.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );

    let started = Instant::now();
    let outcomes = process_batch(&pipeline, &jobs, &args.out_dir, workers, |outcome| {
        progress.println(outcome_line(outcome));
        progress.set_message(outcome.job.name.clone());
        progress.inc(1);
    })
    .map_err(|err| format!("Failed to run batch: {err}"))?;
    progress.finish_and_clear();

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    println!(
        "{succeeded} succeeded, {} failed in {:.1}s",
        outcomes.len() - succeeded,
        started.elapsed().as_secs_f64()
    );

    if let Some(report_path) = &args.report {
        let report = build_report(&outcomes, &config, Utc::now().to_rfc3339());
        json_report_formatter::write_report(report_path, &report)?;
        println!("{}", report_path.display());
    }
    Ok(())
}

fn resolve_config(args: &Args) -> Result<ChartConfig, String> {
    let mut config = match &args.config {
        Some(path) => ChartConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => ChartConfig::default(),
    };
    if let Some(value) = args.accept_threshold {
        config.accept_threshold = value;
    }
    if let Some(value) = args.beats_per_bar {
        config.beats_per_bar = value;
    }
    if let Some(value) = args.subdivisions {
        config.subdivisions_per_bar = value;
    }
    if let Some(value) = args.bars_per_line {
        config.bars_per_line = value;
    }
    if let Some(value) = args.chord_weight {
        config.chord_weight = value;
    }
    if let Some(value) = args.lyric_weight {
        config.lyric_weight = value;
    }
    match args.bpm_fold {
        Some(BpmFold::Off) => config.bpm_fold_range = None,
        Some(BpmFold::Range) if config.bpm_fold_range.is_none() => {
            config.bpm_fold_range = Some(ChartConfig::DEFAULT_BPM_FOLD_RANGE);
        }
        _ => {}
    }
    config
        .validate()
        .map_err(|err| format!("Invalid configuration: {err}"))?;
    Ok(config)
}

fn outcome_line(outcome: &SongOutcome) -> String {
    match &outcome.result {
        Ok(success) => format!(
            "Saved chart to {} (overall {:.1}%)",
            success.chart_path.display(),
            success.chart.meta.overall_confidence.percent()
        ),
        Err(err) => format!("Failed on {}: {err}", outcome.job.name),
    }
}

fn print_available<'a>(input_dir: &Path, names: impl Iterator<Item = &'a String>) {
    let names: Vec<&String> = names.collect();
    if names.is_empty() {
        println!("No tracks found in '{}'.", input_dir.display());
        return;
    }
    println!("Available tracks in '{}':", input_dir.display());
    for name in names {
        println!("  {name}");
    }
    println!("Run with --all or pass track names to generate charts.");
}
