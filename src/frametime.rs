use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::SweepError;
use crate::types::FrameTimeLog;

static FRAME_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(GPU|CPU) Headless frame time:\s*([0-9.]+)\s*ms\s*$")
        .expect("frame time pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    Gpu,
    Cpu,
}

/// Parse one trimmed log line into a labelled duration in milliseconds.
pub fn parse_frame_line(line: &str) -> Option<(FrameSource, f64)> {
    let caps = FRAME_TIME_RE.captures(line)?;
    let source = match &caps[1] {
        "GPU" => FrameSource::Gpu,
        _ => FrameSource::Cpu,
    };
    // `[0-9.]+` also admits things like "1.2.3"; those are skipped.
    let value = caps[2].parse().ok()?;
    Some((source, value))
}

/// Read a frame time log. Unrecognised lines are skipped. A log missing
/// either series is [`SweepError::NoFrameData`], checked before the two
/// series are compared for length.
pub fn parse_frame_times(path: &Path) -> Result<FrameTimeLog, SweepError> {
    let file = std::fs::File::open(path).map_err(|source| SweepError::LogRead {
        path: path.to_path_buf(),
        source,
    })?;
    let (gpu_ms, cpu_ms) =
        read_series(std::io::BufReader::new(file)).map_err(|source| SweepError::LogRead {
            path: path.to_path_buf(),
            source,
        })?;
    if gpu_ms.is_empty() || cpu_ms.is_empty() {
        return Err(SweepError::NoFrameData {
            path: path.to_path_buf(),
        });
    }
    FrameTimeLog::new(gpu_ms, cpu_ms)
}

/// In-memory variant of [`parse_frame_times`]; empty input gives an empty log.
pub fn parse_frame_times_str(text: &str) -> Result<FrameTimeLog, SweepError> {
    let (gpu_ms, cpu_ms) =
        read_series(text.as_bytes()).map_err(|source| SweepError::Read { source })?;
    FrameTimeLog::new(gpu_ms, cpu_ms)
}

fn read_series<R: BufRead>(reader: R) -> std::io::Result<(Vec<f64>, Vec<f64>)> {
    let mut gpu_ms = Vec::new();
    let mut cpu_ms = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_frame_line(line) {
            Some((FrameSource::Gpu, v)) => gpu_ms.push(v),
            Some((FrameSource::Cpu, v)) => cpu_ms.push(v),
            None => debug!(line, "skipping unrecognised log line"),
        }
    }

    Ok((gpu_ms, cpu_ms))
}

/// Value at sorted rank `floor(0.95 * (n - 1))` over both series combined.
/// `None` when there is no data.
pub fn p95(log: &FrameTimeLog) -> Option<f64> {
    let mut values: Vec<f64> = log.gpu_ms().iter().chain(log.cpu_ms()).copied().collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let index = (0.95 * (values.len() - 1) as f64).floor() as usize;
    Some(values[index])
}

/// Upper bound of the frame time axis: `max(0.5, p95 * 1.2)`, with p95
/// taken as 1.0 when there is no data.
pub fn p95_upper_bound(log: &FrameTimeLog) -> f64 {
    let p95 = p95(log).unwrap_or(1.0);
    (p95 * 1.2).max(0.5)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
