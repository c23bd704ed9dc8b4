use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chord_chart_rs::pipeline::recorded::{bundle_song_name, is_bundle_path};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: [&str; 6] = ["wav", "mp3", "flac", "m4a", "ogg", "aiff"];

/// Track name to input path, sorted by name. A song present both as audio
/// and as an analysis bundle is listed once, under its audio path.
pub fn discover_tracks(input_dir: &Path) -> Result<BTreeMap<String, PathBuf>, String> {
    if !input_dir.is_dir() {
        return Err(format!(
            "Input directory '{}' does not exist.",
            input_dir.display()
        ));
    }

    let mut tracks = BTreeMap::new();
    for entry in WalkDir::new(input_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            format!("Failed to list input directory '{}': {err}", input_dir.display())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_bundle_path(path) {
            if let Some(name) = bundle_song_name(path) {
                tracks.entry(name).or_insert_with(|| path.to_path_buf());
            }
        } else if is_audio_file(path) {
            if let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) {
                tracks.insert(name, path.to_path_buf());
            }
        }
    }
    Ok(tracks)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Picks the requested tracks, failing on the first unknown names.
pub fn select_tracks(
    available: &BTreeMap<String, PathBuf>,
    requested: &[String],
) -> Result<Vec<(String, PathBuf)>, String> {
    let missing: Vec<&str> = requested
        .iter()
        .filter(|name| !available.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(format!("Unknown track(s): {}", missing.join(", ")));
    }
    let mut selected = Vec::with_capacity(requested.len());
    for name in requested {
        if selected.iter().any(|(n, _): &(String, PathBuf)| n == name) {
            continue;
        }
        if let Some(path) = available.get(name) {
            selected.push((name.clone(), path.clone()));
        }
    }
    Ok(selected)
}
