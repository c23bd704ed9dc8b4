use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ChartConfig;
use crate::pipeline::batch::SongOutcome;
use crate::types::TempoSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub schema_version: u32,
    pub meta: Meta,
    pub songs: Vec<SongReport>,
    pub aggregates: AggregateReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub generated_at: String,
    pub song_count: usize,
    pub config: ChartConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongReport {
    pub name: String,
    pub input: PathBuf,
    pub status: SongStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_source: Option<TempoSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyric_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Over succeeded songs; `None` when nothing succeeded.
    pub mean_overall_confidence: Option<f64>,
    pub fallback_tempo_count: usize,
}

pub fn song_report(outcome: &SongOutcome) -> SongReport {
    let base = SongReport {
        name: outcome.job.name.clone(),
        input: outcome.job.path.clone(),
        status: SongStatus::Failed,
        chart_path: None,
        bpm: None,
        bpm_source: None,
        bpm_confidence: None,
        key: None,
        lyric_confidence: None,
        overall_confidence: None,
        bar_count: None,
        error: None,
    };
    match &outcome.result {
        Ok(success) => {
            let meta = &success.chart.meta;
            SongReport {
                status: SongStatus::Succeeded,
                chart_path: Some(success.chart_path.clone()),
                bpm: Some(meta.bpm),
                bpm_source: Some(meta.bpm_source),
                bpm_confidence: Some(meta.bpm_confidence.value()),
                key: meta.key.clone(),
                lyric_confidence: Some(meta.lyric_confidence.value()),
                overall_confidence: Some(meta.overall_confidence.value()),
                bar_count: Some(success.chart.rows.len()),
                ..base
            }
        }
        Err(err) => SongReport {
            error: Some(err.to_string()),
            ..base
        },
    }
}

pub fn aggregate_reports(songs: &[SongReport]) -> AggregateReport {
    let succeeded: Vec<&SongReport> = songs
        .iter()
        .filter(|song| song.status == SongStatus::Succeeded)
        .collect();
    let confidences: Vec<f64> = succeeded
        .iter()
        .filter_map(|song| song.overall_confidence)
        .collect();
    let mean_overall_confidence = (!confidences.is_empty())
        .then(|| confidences.iter().sum::<f64>() / confidences.len() as f64);

    AggregateReport {
        succeeded: succeeded.len(),
        failed: songs.len() - succeeded.len(),
        mean_overall_confidence,
        fallback_tempo_count: succeeded
            .iter()
            .filter(|song| song.bpm_source == Some(TempoSource::Fallback))
            .count(),
    }
}

pub fn build_report(outcomes: &[SongOutcome], config: &ChartConfig, generated_at: String) -> BatchReport {
    let songs: Vec<SongReport> = outcomes.iter().map(song_report).collect();
    let aggregates = aggregate_reports(&songs);
    BatchReport {
        schema_version: 1,
        meta: Meta {
            generated_at,
            song_count: songs.len(),
            config: config.clone(),
        },
        songs,
        aggregates,
    }
}
