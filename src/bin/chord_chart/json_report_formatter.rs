use std::fs;
use std::io::Write;
use std::path::Path;

use chord_chart_rs::BatchReport;
use tempfile::NamedTempFile;

/// Pretty JSON, staged beside `path` and renamed over it, so readers never
/// see a half-written report.
pub fn write_report(path: &Path, report: &BatchReport) -> Result<(), String> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|err| format!("Cannot create report directory '{}': {err}", dir.display()))?;

    let mut body = serde_json::to_vec_pretty(report)
        .map_err(|err| format!("Cannot encode batch report: {err}"))?;
    body.push(b'\n');

    let mut staged = NamedTempFile::new_in(dir)
        .map_err(|err| format!("Cannot stage report in '{}': {err}", dir.display()))?;
    staged
        .write_all(&body)
        .map_err(|err| format!("Cannot write staged report: {err}"))?;
    staged
        .persist(path)
        .map_err(|err| format!("Cannot move report to '{}': {}", path.display(), err.error))?;
    Ok(())
}
