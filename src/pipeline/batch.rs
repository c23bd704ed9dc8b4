use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::chart::{write_chart, ChartFormatter};
use crate::error::ChartError;
use crate::pipeline::runtime::{song_title, ChartPipeline};
use crate::types::Chart;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongJob {
    pub name: String,
    pub path: PathBuf,
}

impl SongJob {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: song_title(&path),
            path,
        }
    }
}

#[derive(Debug)]
pub struct SongSuccess {
    pub chart: Chart,
    pub chart_path: PathBuf,
}

#[derive(Debug)]
pub struct SongOutcome {
    pub job: SongJob,
    pub result: Result<SongSuccess, ChartError>,
}

impl SongOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs every job on its own worker and writes each chart under `out_dir`.
///
/// A failing song only fails its own outcome. Outcomes come back in job
/// order; `on_done` is called as each song finishes, from worker threads.
pub fn process_batch<F>(
    pipeline: &ChartPipeline,
    jobs: &[SongJob],
    out_dir: &Path,
    workers: usize,
    on_done: F,
) -> Result<Vec<SongOutcome>, ChartError>
where
    F: Fn(&SongOutcome) + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| {
            ChartError::invalid_input(format!("cannot start {workers} chart workers: {e}"))
        })?;
    let formatter = ChartFormatter::new(pipeline.config());

    let outcomes = pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let result = pipeline
                    .process_titled(&job.path, &job.name)
                    .and_then(|chart| {
                        let chart_path = write_chart(out_dir, &chart, &formatter)?;
                        Ok(SongSuccess { chart, chart_path })
                    });
                if let Err(err) = &result {
                    if err.is_invariant_violation() {
                        tracing::error!(song = job.name.as_str(), error = %err, "song failed on an internal invariant");
                    } else {
                        tracing::warn!(song = job.name.as_str(), error = %err, "song failed");
                    }
                }
                let outcome = SongOutcome {
                    job: job.clone(),
                    result,
                };
                on_done(&outcome);
                outcome
            })
            .collect::<Vec<_>>()
    });

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    tracing::info!(songs = outcomes.len(), failed, "batch finished");
    Ok(outcomes)
}

/// Default worker count: the available parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
