//! JSON coverage report

use serde::{Deserialize, Serialize};

use super::{CoverageMap, Result};

/// Coverage of a single image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonImageCoverage {
    pub image: String,
    pub total: usize,
    pub called: usize,
    pub coverage_pct: f64,
    pub called_functions: Vec<String>,
    pub uncalled_functions: Vec<String>,
}

/// Whole report, images sorted by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonCoverageReport {
    pub version: String,
    pub images: Vec<JsonImageCoverage>,
}

impl JsonCoverageReport {
    pub fn from_coverage(coverage: &CoverageMap) -> Self {
        let images = coverage
            .iter()
            .map(|(image, data)| JsonImageCoverage {
                image: image.clone(),
                total: data.total(),
                called: data.called_count(),
                coverage_pct: data.percentage(),
                called_functions: data.called.iter().cloned().collect(),
                uncalled_functions: data.uncalled().map(str::to_string).collect(),
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            images,
        }
    }
}

pub fn render_json(coverage: &CoverageMap) -> Result<String> {
    Ok(serde_json::to_string_pretty(
        &JsonCoverageReport::from_coverage(coverage),
    )?)
}
