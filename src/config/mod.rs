//! Configuration for framepipe
//!
//! A pipeline is configured by one file holding the scheduler settings and the
//! side packets handed to stages at registration. TOML is the primary format;
//! files ending in `.json` are read as JSON.
//!
//! # Example
//!
//! ```toml
//! [scheduler]
//! frame_rate_hz = 30
//! port_capacity = 100
//!
//! [side_packets]
//! redCount = 3
//! spread = 1.5
//! pixelShape = "circle"
//! ```
//!
//! ```ignore
//! use framepipe::config::PipelineConfig;
//! use framepipe::pipeline::Scheduler;
//!
//! let config = PipelineConfig::load("pipeline.toml")?;
//! let mut scheduler = Scheduler::from_config(&config.scheduler)?;
//! let side = config.side_packets();
//! scheduler.register_stage_with(my_stage, side.clone())?;
//! ```

use crate::pipeline::context::SidePackets;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::port::DEFAULT_PORT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub use crate::pipeline::packet::ConfigValue;

/// Default scheduling rate in Hz
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

/// Tag the first stage reads external input from
pub const DEFAULT_INGRESS_TAG: &str = "kTagInput";

/// Tag the last stage writes external output to
pub const DEFAULT_EGRESS_TAG: &str = "kTagOutput";

// ==================== Scheduler Config ====================

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Target passes per second; each pass gets `1 / frame_rate_hz` seconds
    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,

    /// Capacity of the scheduler's ingress and egress ports
    #[serde(default = "default_port_capacity")]
    pub port_capacity: usize,

    /// Input tag of the first stage bound to the ingress port
    #[serde(default = "default_ingress_tag")]
    pub ingress_tag: String,

    /// Output tag of the last stage bound to the egress port
    #[serde(default = "default_egress_tag")]
    pub egress_tag: String,
}

fn default_frame_rate_hz() -> u32 {
    DEFAULT_FRAME_RATE_HZ
}

fn default_port_capacity() -> usize {
    DEFAULT_PORT_CAPACITY
}

fn default_ingress_tag() -> String {
    DEFAULT_INGRESS_TAG.to_string()
}

fn default_egress_tag() -> String {
    DEFAULT_EGRESS_TAG.to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            port_capacity: DEFAULT_PORT_CAPACITY,
            ingress_tag: default_ingress_tag(),
            egress_tag: default_egress_tag(),
        }
    }
}

impl SchedulerConfig {
    /// Config with the given rate and defaults elsewhere
    pub fn with_frame_rate(frame_rate_hz: u32) -> Self {
        Self {
            frame_rate_hz,
            ..Default::default()
        }
    }

    /// Wall-clock time allotted to one scheduling pass
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate_hz.max(1) as f64)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.frame_rate_hz == 0 {
            return Err(PipelineError::InvalidConfig(
                "frame_rate_hz must be greater than zero".to_string(),
            ));
        }
        if self.port_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "port_capacity must be greater than zero".to_string(),
            ));
        }
        if self.ingress_tag.trim().is_empty() || self.egress_tag.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "ingress_tag and egress_tag must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Pipeline Config ====================

/// Complete pipeline configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Side values shared by every stage registered with them
    #[serde(default)]
    pub side_packets: BTreeMap<String, ConfigValue>,
}

impl PipelineConfig {
    /// Load and validate a config file. `.json` files are parsed as JSON,
    /// everything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let config = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
        .map_err(|e| match e {
            PipelineError::Parse(msg) => {
                PipelineError::Parse(format!("Failed to parse config file {:?}: {}", path, msg))
            }
            other => other,
        })?;

        tracing::info!(
            "Loaded pipeline config from {:?} ({} Hz, {} side packets)",
            path,
            config.scheduler.frame_rate_hz,
            config.side_packets.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PipelineError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> PipelineResult<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| PipelineError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as TOML (or JSON for `.json` paths)
    pub fn save(&self, path: impl AsRef<Path>) -> PipelineResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let content = if is_json {
            serde_json::to_string_pretty(self)
                .map_err(|e| PipelineError::Parse(format!("Failed to serialize config: {}", e)))?
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| PipelineError::Parse(format!("Failed to serialize config: {}", e)))?
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> PipelineResult<()> {
        self.scheduler.validate()?;
        if let Some(tag) = self.side_packets.keys().find(|k| k.trim().is_empty()) {
            return Err(PipelineError::InvalidConfig(format!(
                "side packet tag {:?} is empty",
                tag
            )));
        }
        Ok(())
    }

    /// Freeze the `[side_packets]` table into packets.
    ///
    /// Integers become `i64`, floats `f64`, booleans `bool`, strings `String`.
    pub fn side_packets(&self) -> SidePackets {
        SidePackets::from(self.side_packets.clone())
    }
}
