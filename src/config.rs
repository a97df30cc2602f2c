//! Sweep and log-replay configuration.
//!
//! Values are layered: built-in defaults, then the `[sweep]` / `[frametime]`
//! tables of a TOML file, then command-line flags. Each layer is a section
//! struct whose `Some` fields override the layer below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::SweepError;
use crate::runner::RunTiming;
use crate::types::SweepRange;

pub const DEFAULT_PROGRAM_PATH: &str = "./bin/main";
pub const DEFAULT_DEVICE_NAME: &str = "Intel(R) Graphics";
pub const DEFAULT_START: i64 = 3;
pub const DEFAULT_END: i64 = 3000;
pub const DEFAULT_STEP: usize = 12;
pub const DEFAULT_WARM_UP_MS: u64 = 2000;
pub const DEFAULT_COOLDOWN_MS: u64 = 2000;
pub const DEFAULT_TERMINATION_WAIT_MS: u64 = 1000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
pub const DEFAULT_FRAME_LOG_PATH: &str = "./drawer/headless_frame_time.txt";
pub const DEFAULT_FRAME_CHART_PATH: &str = "headless_frame_time.png";

/// Contents of a config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub sweep: SweepSection,
    #[serde(default)]
    pub frametime: FrameTimeSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSection {
    pub program_path: Option<PathBuf>,
    pub device_name: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub step: Option<usize>,
    pub warm_up_ms: Option<u64>,
    pub cooldown_ms: Option<u64>,
    pub termination_wait_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub run_timeout_ms: Option<u64>,
    pub stimulus: Option<String>,
    pub output: Option<PathBuf>,
    pub show: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameTimeSection {
    pub log_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub show: Option<bool>,
}

/// Everything one sweep needs. Built once and passed into the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub program_path: PathBuf,
    pub device_name: String,
    pub range: SweepRange,
    pub timing: RunTiming,
    /// Pause between the teardown of one run and the launch of the next.
    pub cooldown_delay: Duration,
    /// Helper command run once per launch after the warm-up wait.
    pub stimulus: Option<String>,
    /// Chart path; derived from the device name when unset.
    pub output: Option<PathBuf>,
    pub show: bool,
}

impl SweepConfig {
    /// Apply `layers` in order over the built-in defaults and validate.
    pub fn resolve(layers: &[SweepSection]) -> Result<Self, SweepError> {
        let mut program_path = PathBuf::from(DEFAULT_PROGRAM_PATH);
        let mut device_name = DEFAULT_DEVICE_NAME.to_string();
        let mut start = DEFAULT_START;
        let mut end = DEFAULT_END;
        let mut step = DEFAULT_STEP;
        let mut warm_up_ms = DEFAULT_WARM_UP_MS;
        let mut cooldown_ms = DEFAULT_COOLDOWN_MS;
        let mut termination_wait_ms = DEFAULT_TERMINATION_WAIT_MS;
        let mut poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
        let mut run_timeout_ms = None;
        let mut stimulus = None;
        let mut output = None;
        let mut show = true;

        for layer in layers {
            if let Some(v) = &layer.program_path {
                program_path = v.clone();
            }
            if let Some(v) = &layer.device_name {
                device_name = v.clone();
            }
            start = layer.start.unwrap_or(start);
            end = layer.end.unwrap_or(end);
            step = layer.step.unwrap_or(step);
            warm_up_ms = layer.warm_up_ms.unwrap_or(warm_up_ms);
            cooldown_ms = layer.cooldown_ms.unwrap_or(cooldown_ms);
            termination_wait_ms = layer.termination_wait_ms.unwrap_or(termination_wait_ms);
            poll_interval_ms = layer.poll_interval_ms.unwrap_or(poll_interval_ms);
            if layer.run_timeout_ms.is_some() {
                run_timeout_ms = layer.run_timeout_ms;
            }
            if layer.stimulus.is_some() {
                stimulus = layer.stimulus.clone();
            }
            if layer.output.is_some() {
                output = layer.output.clone();
            }
            show = layer.show.unwrap_or(show);
        }

        if device_name.trim().is_empty() {
            return Err(SweepError::InvalidConfig {
                detail: "device name must not be empty".to_string(),
            });
        }
        if program_path.as_os_str().is_empty() {
            return Err(SweepError::InvalidConfig {
                detail: "program path must not be empty".to_string(),
            });
        }
        if poll_interval_ms == 0 {
            return Err(SweepError::InvalidConfig {
                detail: "poll interval must be at least 1 ms".to_string(),
            });
        }

        Ok(Self {
            program_path,
            device_name,
            range: SweepRange::new(start, end, step)?,
            timing: RunTiming {
                warm_up: Duration::from_millis(warm_up_ms),
                termination_wait: Duration::from_millis(termination_wait_ms),
                poll_interval: Duration::from_millis(poll_interval_ms),
                run_timeout: run_timeout_ms.map(Duration::from_millis),
            },
            cooldown_delay: Duration::from_millis(cooldown_ms),
            stimulus: stimulus.filter(|s| !s.trim().is_empty()),
            output,
            show,
        })
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            program_path: PathBuf::from(DEFAULT_PROGRAM_PATH),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            range: SweepRange::new(DEFAULT_START, DEFAULT_END, DEFAULT_STEP)
                .unwrap_or_else(|_| unreachable!("default step is non-zero")),
            timing: RunTiming::default(),
            cooldown_delay: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            stimulus: None,
            output: None,
            show: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTimeConfig {
    pub log_path: PathBuf,
    pub output: PathBuf,
    pub show: bool,
}

impl FrameTimeConfig {
    pub fn resolve(layers: &[FrameTimeSection]) -> Self {
        let mut config = Self::default();
        for layer in layers {
            if let Some(v) = &layer.log_path {
                config.log_path = v.clone();
            }
            if let Some(v) = &layer.output {
                config.output = v.clone();
            }
            config.show = layer.show.unwrap_or(config.show);
        }
        config
    }
}

impl Default for FrameTimeConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_FRAME_LOG_PATH),
            output: PathBuf::from(DEFAULT_FRAME_CHART_PATH),
            show: true,
        }
    }
}

/// `<config dir>/shadersweep/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shadersweep").join("config.toml"))
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile, SweepError> {
    let content = std::fs::read_to_string(path).map_err(|source| SweepError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| SweepError::ConfigParse {
        path: path.to_path_buf(),
        detail: e.message().to_string(),
    })
}

/// Load `explicit` if given (it must exist), otherwise the default config
/// file when present, otherwise an empty config.
pub fn load_layered(explicit: Option<&Path>) -> Result<ConfigFile, SweepError> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => load_config_file(&path),
        _ => Ok(ConfigFile::default()),
    }
}
