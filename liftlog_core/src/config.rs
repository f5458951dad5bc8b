//! Configuration file support for Liftlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liftlog/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub timer: TimerConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Progression heuristics used by the advisor
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressionConfig {
    /// How many recent logs are inspected before a session
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Consecutive hard sessions that trigger a deload
    #[serde(default = "default_burnout_window")]
    pub burnout_window: usize,

    #[serde(default = "default_burnout_rpe")]
    pub burnout_rpe: f64,

    /// At or below this RPE the session counts as too easy
    #[serde(default = "default_easy_rpe")]
    pub easy_rpe: f64,

    /// Above this RPE the target is held
    #[serde(default = "default_hard_rpe")]
    pub hard_rpe: f64,

    #[serde(default = "default_deload_fraction")]
    pub deload_fraction: f64,

    #[serde(default = "default_deload_time_seconds")]
    pub deload_time_seconds: f64,

    #[serde(default = "default_time_step_seconds")]
    pub time_step_seconds: f64,

    #[serde(default = "default_weight_step_kg")]
    pub weight_step_kg: f64,

    #[serde(default = "default_weight_range")]
    pub weight_range: DeltaRange,

    #[serde(default = "default_time_range")]
    pub time_range: DeltaRange,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            burnout_window: default_burnout_window(),
            burnout_rpe: default_burnout_rpe(),
            easy_rpe: default_easy_rpe(),
            hard_rpe: default_hard_rpe(),
            deload_fraction: default_deload_fraction(),
            deload_time_seconds: default_deload_time_seconds(),
            time_step_seconds: default_time_step_seconds(),
            weight_step_kg: default_weight_step_kg(),
            weight_range: default_weight_range(),
            time_range: default_time_range(),
        }
    }
}

/// Bounds of the manual progression adjustment
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeltaRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl DeltaRange {
    /// Clamp into range and snap to the nearest step
    pub fn snap(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        let steps = ((clamped - self.min) / self.step).round();
        (self.min + steps * self.step).min(self.max)
    }

    /// Widen the range until it reaches `value`, staying on the step grid
    pub fn covering(mut self, value: f64) -> Self {
        if value < self.min {
            self.min = if self.step > 0.0 {
                self.min - ((self.min - value) / self.step).ceil() * self.step
            } else {
                value
            };
        }
        if value > self.max {
            self.max = value;
        }
        self
    }
}

/// Countdown driver configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Wall-clock length of one countdown tick
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_millis: default_tick_millis(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("liftlog")
}

fn default_history_window() -> usize {
    5
}

fn default_burnout_window() -> usize {
    3
}

fn default_burnout_rpe() -> f64 {
    9.0
}

fn default_easy_rpe() -> f64 {
    6.0
}

fn default_hard_rpe() -> f64 {
    9.0
}

fn default_deload_fraction() -> f64 {
    0.10
}

fn default_deload_time_seconds() -> f64 {
    10.0
}

fn default_time_step_seconds() -> f64 {
    5.0
}

fn default_weight_step_kg() -> f64 {
    2.5
}

fn default_weight_range() -> DeltaRange {
    DeltaRange {
        min: -5.0,
        max: 15.0,
        step: 1.25,
    }
}

fn default_time_range() -> DeltaRange {
    DeltaRange {
        min: -30.0,
        max: 60.0,
        step: 5.0,
    }
}

fn default_tick_millis() -> u64 {
    1000
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("liftlog").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let p = &self.progression;
        if p.burnout_window == 0 {
            return Err(Error::Config("burnout_window must be at least 1".into()));
        }
        if p.history_window < p.burnout_window {
            return Err(Error::Config(
                "history_window must cover burnout_window".into(),
            ));
        }
        if p.easy_rpe > p.hard_rpe {
            return Err(Error::Config("easy_rpe must not exceed hard_rpe".into()));
        }
        if self.timer.tick_millis == 0 {
            return Err(Error::Config("tick_millis must be positive".into()));
        }
        Ok(())
    }
}
