use std::env;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{PipelineError, Result};
use crate::handoff::{DEFAULT_FRAME_CAPACITY, DEFAULT_PACKET_CAPACITY};

const CONFIG_PATHS: [&str; 2] = ["./avpipe.toml", "./config.toml"];

const TEMPLATE: &str = include_str!("config.template.toml");

/// Sizing and diagnostics settings for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub video_frame_capacity: usize,
    pub audio_frame_capacity: usize,
    pub audio_packet_capacity: usize,
    pub progress_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            video_frame_capacity: DEFAULT_FRAME_CAPACITY,
            audio_frame_capacity: DEFAULT_FRAME_CAPACITY,
            audio_packet_capacity: DEFAULT_PACKET_CAPACITY,
            progress_interval: 10,
        }
    }
}

impl PipelineConfig {
    /// Loads defaults, then the first readable config file, then
    /// `AVPIPE_*` environment variables.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        for path in CONFIG_PATHS {
            if let Ok(content) = fs::read_to_string(path) {
                debug!("loading pipeline config from {}", path);
                config.apply_file(&content)?;
                break;
            }
        }
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses `key = value` lines; unknown keys and comments are ignored.
    pub fn from_str_lossy(content: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_file(content)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, content: &str) -> Result<()> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'');
            self.set(key.trim(), value)?;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        for key in [
            "video_frame_capacity",
            "audio_frame_capacity",
            "audio_packet_capacity",
            "progress_interval",
        ] {
            let var = format!("AVPIPE_{}", key.to_uppercase());
            if let Ok(value) = env::var(&var) {
                self.set(key, value.trim())?;
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "video_frame_capacity" => self.video_frame_capacity = value.parse()?,
            "audio_frame_capacity" => self.audio_frame_capacity = value.parse()?,
            "audio_packet_capacity" => self.audio_packet_capacity = value.parse()?,
            "progress_interval" => self.progress_interval = value.parse()?,
            _ => debug!("ignoring unknown config key {}", key),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let capacities = [
            ("video_frame_capacity", self.video_frame_capacity),
            ("audio_frame_capacity", self.audio_frame_capacity),
            ("audio_packet_capacity", self.audio_packet_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(PipelineError::Config(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        fs::write(path, TEMPLATE)?;
    }
    Ok(())
}
