//! Stage 4: write the documents into the output directory.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::PipelineError;
use crate::schema::Artifacts;

// ---

pub const HOURLY_STATS_FILE: &str = "hourly-stats.json";
pub const SENSORS_FILE: &str = "sensors.json";
pub const CLIP_INDEX_FILE: &str = "clip-index.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Compact,
    /// Two-space indent; the clip index is meant to be edited by hand.
    Pretty,
}

/// Write all three artifacts, creating `out_dir` if needed. Returns the
/// written paths in write order.
pub fn write_artifacts(out_dir: &Path, artifacts: &Artifacts) -> Result<Vec<PathBuf>, PipelineError> {
    // ---
    fs::create_dir_all(out_dir).map_err(|e| PipelineError::Io {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let written = vec![
        write_one(out_dir, HOURLY_STATS_FILE, &artifacts.hourly_stats, Layout::Compact)?,
        write_one(out_dir, SENSORS_FILE, &artifacts.sensors, Layout::Compact)?,
        write_one(out_dir, CLIP_INDEX_FILE, &artifacts.clip_index, Layout::Pretty)?,
    ];

    Ok(written)
}

fn write_one<T: Serialize>(
    out_dir: &Path,
    name: &str,
    value: &T,
    layout: Layout,
) -> Result<PathBuf, PipelineError> {
    // ---
    let path = out_dir.join(name);
    let bytes = write_json(&path, value, layout)?;
    info!("  Written: {} ({:.1} KB)", path.display(), bytes as f64 / 1024.0);
    Ok(path)
}

/// Serialize `value` to `path`, returning the file size in bytes.
fn write_json<T: Serialize>(path: &Path, value: &T, layout: Layout) -> Result<u64, PipelineError> {
    // ---
    let io_error = |e: std::io::Error| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let json_error = |e: serde_json::Error| PipelineError::Json {
        path: path.to_path_buf(),
        source: e,
    };

    let json = match layout {
        Layout::Compact => serde_json::to_string(value).map_err(json_error)?,
        Layout::Pretty => serde_json::to_string_pretty(value).map_err(json_error)?,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut out = BufWriter::new(file);
    out.write_all(escape_non_ascii(&json).as_bytes()).map_err(io_error)?;
    out.flush().map_err(io_error)?;

    let size = fs::metadata(path).map_err(io_error)?.len();
    Ok(size)
}

/// Replace every non-ASCII char with `\uXXXX` escapes (UTF-16 units).
///
/// Only valid on serialized JSON: outside strings the output is pure ASCII,
/// so every replaced char sits inside a string literal.
fn escape_non_ascii(json: &str) -> String {
    // ---
    if json.is_ascii() {
        return json.to_string();
    }

    let mut out = String::with_capacity(json.len() + 16);
    let mut units = [0u16; 2];
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
