use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum SweepError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read output of the running program: {source}")]
    Read { source: std::io::Error },

    #[error("No data collected.")]
    NoDataCollected,

    #[error("GPU and CPU data length mismatch ({gpu} GPU samples vs {cpu} CPU samples)")]
    DataIntegrity { gpu: usize, cpu: usize },

    #[error("No valid frame time data found in {path}")]
    NoFrameData { path: PathBuf },

    #[error("Failed to read frame time log {path}: {source}")]
    LogRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Sweep step must be greater than zero")]
    InvalidStep,

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {detail}")]
    ConfigParse { path: PathBuf, detail: String },

    #[error("Failed to render chart: {detail}")]
    Render { detail: String },
}
