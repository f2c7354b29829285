//! Config snapshots embedded in extraction reports.
//!
//! The hash covers the canonical JSON of the effective configuration, so two
//! runs with the same hash extracted under identical settings regardless of
//! where the file lived.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::extraction::ExtractionConfig;
use crate::resolve::ResolvedConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub config: ExtractionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    pub sha256: String,
    pub captured_at: String,
}

impl ConfigSnapshot {
    pub fn capture(resolved: &ResolvedConfig) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_vec(&resolved.config)?;
        Ok(Self {
            config: resolved.config.clone(),
            source_path: resolved
                .source
                .path()
                .map(|p| p.display().to_string()),
            sha256: hex::encode(Sha256::digest(&canonical)),
            captured_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}
