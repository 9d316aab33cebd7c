use crate::endpoint::Endpoint;
use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub message: String,
}

// ---------------------------------------------------------------------------
// PreambleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreambleConfig {
    #[serde(default = "default_preambles_enabled")]
    pub enabled: bool,
    /// Inject the endpoint's preamble on every Nth send (0 = never, 1 = always).
    #[serde(default = "default_every_n")]
    pub every_n: u64,
}

fn default_preambles_enabled() -> bool {
    true
}

fn default_every_n() -> u64 {
    1
}

impl Default for PreambleConfig {
    fn default() -> Self {
        Self {
            enabled: default_preambles_enabled(),
            every_n: default_every_n(),
        }
    }
}

// ---------------------------------------------------------------------------
// WaitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Poll interval between capture rounds. Floored at 100ms when used.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Scrollback window requested from the terminal on each capture.
    #[serde(default = "default_capture_lines")]
    pub capture_lines: u32,
    /// Extraction fallback window when the instruction anchor has scrolled out.
    #[serde(default = "default_fallback_lines")]
    pub fallback_lines: usize,
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_capture_lines() -> u32 {
    2_000
}

fn default_fallback_lines() -> usize {
    100
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            capture_lines: default_capture_lines(),
            fallback_lines: default_fallback_lines(),
        }
    }
}

impl WaitConfig {
    /// Effective poll interval: configured value floored at 100ms.
    pub fn effective_poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.max(100)
    }
}

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub preambles: PreambleConfig,
    #[serde(default)]
    pub wait: WaitConfig,
}

impl RelayConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RelayError::InvalidConfig(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn endpoint(&self, name: &str) -> Result<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| RelayError::EndpointNotFound(name.to_string()))
    }

    /// Non-fatal sanity checks, surfaced as warnings rather than errors.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for ep in &self.endpoints {
            if !seen.insert(ep.name.as_str()) {
                warnings.push(ConfigWarning {
                    message: format!("duplicate endpoint name: {}", ep.name),
                });
            }
            if ep.address.trim().is_empty() {
                warnings.push(ConfigWarning {
                    message: format!("endpoint '{}' has an empty address", ep.name),
                });
            }
        }
        if self.wait.poll_interval_ms < 100 {
            warnings.push(ConfigWarning {
                message: format!(
                    "poll_interval_ms {} below the 100ms floor; 100ms will be used",
                    self.wait.poll_interval_ms
                ),
            });
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
