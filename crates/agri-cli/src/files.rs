//! Saved report files.

use agri_core::CommuneReport;
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Load reports from JSON files. A file may hold one report or an array.
/// Directories are scanned for `*.json` files, sorted by name.
pub fn load_reports(paths: &[PathBuf]) -> Result<Vec<CommuneReport>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("reading directory {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }

    let mut reports = Vec::new();
    for file in files {
        let text = std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", file.display()))?;
        match value {
            Value::Array(items) => {
                for item in items {
                    reports.push(
                        serde_json::from_value(item)
                            .with_context(|| format!("decoding report in {}", file.display()))?,
                    );
                }
            }
            other => reports.push(
                serde_json::from_value(other)
                    .with_context(|| format!("decoding report in {}", file.display()))?,
            ),
        }
    }
    Ok(reports)
}

/// Pretty-print `value` to `path`, or to stdout when `path` is `-`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    if path == Path::new("-") {
        println!("{text}");
    } else {
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
