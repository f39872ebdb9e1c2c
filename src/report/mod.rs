//! Coverage reports from call logs
//!
//! Every call log holds `Function` lines (routines probed at image load) and
//! `Called` lines (routines actually entered). Per image, coverage is the
//! share of discovered routines that were called.
//!
//! Output formats:
//! - `txt`: console summary on stdout
//! - `html`: `coverage_<image>.html` per image plus `aggregate_coverage.html`
//! - `xml`: xUnit `coverage_<image>.xml` per image, for CI dashboards
//! - `json`: a single `coverage.json`

pub mod html;
pub mod json;
pub mod text;
pub mod xunit;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::call_log::LogRecord;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("could not open log file {path}: {source}")]
    OpenLog {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no .log files found in directory {0}")]
    NoLogFiles(PathBuf),

    #[error("unknown report format {0:?} (expected html, xml, txt or json)")]
    UnknownFormat(String),

    #[error("must specify at least one of html, xml, txt, json")]
    NoFormats,

    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Html,
    Xml,
    Json,
}

impl ReportFormat {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim() {
            "txt" | "text" => Ok(ReportFormat::Text),
            "html" => Ok(ReportFormat::Html),
            "xml" => Ok(ReportFormat::Xml),
            "json" => Ok(ReportFormat::Json),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }

    /// Parse a comma-separated list like `html,txt`; duplicates are dropped
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        let mut formats = Vec::new();
        for part in list.split(',').filter(|p| !p.trim().is_empty()) {
            let format = Self::parse(part)?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        if formats.is_empty() {
            return Err(ReportError::NoFormats);
        }
        Ok(formats)
    }
}

/// Discovered and called routines of one image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCoverage {
    pub defined: BTreeSet<String>,
    pub called: BTreeSet<String>,
}

impl ImageCoverage {
    pub fn total(&self) -> usize {
        self.defined.len()
    }

    pub fn called_count(&self) -> usize {
        self.called.len()
    }

    /// Routines discovered but never entered, sorted
    pub fn uncalled(&self) -> impl Iterator<Item = &str> {
        self.defined
            .iter()
            .filter(|f| !self.called.contains(*f))
            .map(String::as_str)
    }

    pub fn uncalled_count(&self) -> usize {
        self.uncalled().count()
    }

    /// Called share of discovered routines, 0.0 when nothing was discovered
    pub fn percentage(&self) -> f64 {
        if self.defined.is_empty() {
            return 0.0;
        }
        self.called_count() as f64 / self.total() as f64 * 100.0
    }

    fn add(&mut self, record: LogRecord) {
        match record {
            LogRecord::Definition { function, .. } => {
                self.defined.insert(function);
            }
            LogRecord::Call { function, .. } => {
                self.called.insert(function);
            }
        }
    }
}

/// Coverage per image, ordered by image name
pub type CoverageMap = BTreeMap<String, ImageCoverage>;

/// Fold records into a coverage map
pub fn aggregate<I: IntoIterator<Item = LogRecord>>(records: I) -> CoverageMap {
    let mut coverage = CoverageMap::new();
    for record in records {
        coverage
            .entry(record.image().to_string())
            .or_default()
            .add(record);
    }
    coverage
}

/// Read call logs and build per-image coverage
///
/// Lines that are not records are skipped.
pub fn analyze_logs<P: AsRef<Path>>(log_files: &[P]) -> Result<CoverageMap> {
    let mut coverage = CoverageMap::new();

    for path in log_files {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|source| ReportError::OpenLog {
            path: path.to_path_buf(),
            source,
        })?;

        let mut lines = 0usize;
        for line in BufReader::new(file).lines() {
            let line = line?;
            lines += 1;
            if let Some(record) = LogRecord::parse(&line) {
                coverage
                    .entry(record.image().to_string())
                    .or_default()
                    .add(record);
            }
        }
        tracing::debug!("read {} lines from {}", lines, path.display());
    }

    Ok(coverage)
}

/// Resolve the `<logdir|log1,log2>` argument into log file paths
///
/// A directory yields its regular `*.log` files, sorted. Anything else is
/// treated as a comma-separated list of files.
pub fn collect_log_files(arg: &str) -> Result<Vec<PathBuf>> {
    let dir = Path::new(arg);
    if !dir.is_dir() {
        return Ok(arg
            .split(',')
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect());
    }

    let entries = fs::read_dir(dir).map_err(|source| ReportError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(ReportError::NoLogFiles(dir.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// File-name-safe form of an image: basename with anything outside
/// `[A-Za-z0-9._-]` replaced by `_`
pub fn safe_name(image: &str) -> String {
    let base = Path::new(image)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.to_string());

    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn write_file(path: PathBuf, content: &str) -> Result<PathBuf> {
    fs::write(&path, content).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Render every requested format; returns the files written
///
/// The text report goes to stdout rather than a file.
pub fn write_reports(
    coverage: &CoverageMap,
    formats: &[ReportFormat],
    outdir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    if formats.iter().any(|f| *f != ReportFormat::Text) {
        fs::create_dir_all(outdir).map_err(|source| ReportError::Write {
            path: outdir.to_path_buf(),
            source,
        })?;
    }

    for format in formats {
        match format {
            ReportFormat::Text => print!("{}", text::render_text(coverage)),
            ReportFormat::Html => {
                for (image, data) in coverage {
                    let path = outdir.join(format!("coverage_{}.html", safe_name(image)));
                    written.push(write_file(path, &html::render_image_html(image, data))?);
                }
                let path = outdir.join("aggregate_coverage.html");
                written.push(write_file(path, &html::render_aggregate_html(coverage))?);
            }
            ReportFormat::Xml => {
                for (image, data) in coverage {
                    let path = outdir.join(format!("coverage_{}.xml", safe_name(image)));
                    written.push(write_file(path, &xunit::render_xunit(image, data))?);
                }
            }
            ReportFormat::Json => {
                let path = outdir.join("coverage.json");
                written.push(write_file(path, &json::render_json(coverage)?)?);
            }
        }
    }

    tracing::info!("wrote {} report files to {}", written.len(), outdir.display());
    Ok(written)
}
