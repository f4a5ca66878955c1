//! Runtime configuration.
//!
//! All sections default to the production values, so an empty TOML document
//! (or no file at all) yields a working configuration:
//!
//! ```toml
//! [gate]
//! hub_keywords = ["city centre", "airport"]
//! admission_delay_minutes = 10
//!
//! [compiler]
//! secondary_limit = 2
//!
//! [pipeline]
//! dedupe_by_source_reference = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{DetourError, Result};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetourConfig {
    pub gate: GateConfig,
    pub compiler: CompilerConfig,
    pub pipeline: PipelineConfig,
}

impl DetourConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: DetourConfig =
            toml::from_str(raw).map_err(|e| DetourError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.compiler.walking_speed_m_per_min == 0 {
            return Err(DetourError::Config(
                "compiler.walking_speed_m_per_min must be positive".to_string(),
            ));
        }
        if self
            .gate
            .hub_keywords
            .iter()
            .any(|keyword| keyword.trim().is_empty())
        {
            return Err(DetourError::Config(
                "gate.hub_keywords must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }
}

/// Admission and severity settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Case-insensitive substrings marking a high-traffic location
    pub hub_keywords: Vec<String>,
    /// Delay at or above which an event is always admitted
    pub admission_delay_minutes: u32,
    /// Delay at or above which notification is escalated
    pub immediate_action_delay_minutes: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            hub_keywords: [
                "city centre",
                "city center",
                "central station",
                "main station",
                "airport",
                "interchange",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            admission_delay_minutes: 10,
            immediate_action_delay_minutes: 30,
        }
    }
}

/// Solution compilation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// How many runner-up candidates accompany the primary
    pub secondary_limit: usize,
    /// Travelers assumed per affected route
    pub baseline_travelers: u32,
    /// Used to turn walking distance into minutes
    pub walking_speed_m_per_min: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            secondary_limit: 2,
            baseline_travelers: 200,
            walking_speed_m_per_min: 80,
        }
    }
}

/// Orchestrator behaviour switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Skip detections whose `source_reference_id` matches an open record
    pub dedupe_by_source_reference: bool,
}
