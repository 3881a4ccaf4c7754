// Failure artifacts
//
// A failed scenario can be written to disk as one JSON document holding the
// failing step, the account registry, the submitted transaction ids and the
// execution log, so the run can be inspected against the node afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

use super::executor::{ScenarioReport, StepFailure};
use crate::context::FailureDiagnostics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub feature: String,
    pub scenario: String,
    /// RFC 3339 time the artifact was created
    pub timestamp: String,
    pub duration_ms: u64,
    pub failure: Option<StepFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureArtifact {
    pub metadata: ArtifactMetadata,
    pub diagnostics: FailureDiagnostics,
    pub log: Vec<String>,
}

impl FailureArtifact {
    pub fn from_report(report: &ScenarioReport) -> Self {
        Self {
            metadata: ArtifactMetadata {
                feature: report.feature.clone(),
                scenario: report.name.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                duration_ms: report.duration_ms,
                failure: report.failure.clone(),
            },
            diagnostics: report.diagnostics.clone().unwrap_or_default(),
            log: report.log.clone(),
        }
    }

    // File name safe version of the scenario name
    fn file_stem(&self) -> String {
        let stem: String = self
            .metadata
            .scenario
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        if stem.is_empty() {
            "scenario".to_string()
        } else {
            stem
        }
    }

    /// Save the artifact as pretty JSON into `output_dir`, returning its path
    pub async fn save(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)
            .await
            .context("Failed to create artifact directory")?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let filepath = output_dir.join(format!("{}_{}.json", self.file_stem(), timestamp));

        let json = serde_json::to_string_pretty(self).context("Failed to serialize artifact")?;
        let mut file = fs::File::create(&filepath)
            .await
            .context("Failed to create artifact file")?;
        file.write_all(json.as_bytes())
            .await
            .context("Failed to write artifact data")?;
        file.flush()
            .await
            .context("Failed to flush artifact file")?;

        Ok(filepath)
    }

    pub async fn load(filepath: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(filepath.as_ref())
            .await
            .context("Failed to read artifact file")?;
        serde_json::from_str(&content).context("Failed to parse artifact JSON")
    }
}
