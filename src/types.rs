use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::SweepError;

/// Half-open integer range `[start, end)` walked with a fixed positive step.
///
/// Iteration is lazy and restartable: every call to [`SweepRange::iter`]
/// starts again from `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepRange {
    start: i64,
    end: i64,
    step: usize,
}

impl SweepRange {
    pub fn new(start: i64, end: i64, step: usize) -> Result<Self, SweepError> {
        if step == 0 {
            return Err(SweepError::InvalidStep);
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + use<> {
        (self.start..self.end).step_by(self.step)
    }

    /// Number of parameters the range yields: `ceil((end - start) / step)`.
    pub fn len(&self) -> usize {
        if self.start >= self.end {
            return 0;
        }
        let span = i128::from(self.end) - i128::from(self.start);
        let step = self.step as i128;
        ((span + step - 1) / step) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Command line for one sweep iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInvocation {
    pub index: i64,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl RunInvocation {
    pub fn new(program: &Path, device_name: &str, index: i64) -> Self {
        Self {
            index,
            program: program.to_path_buf(),
            args: vec![
                "--physical-device".to_string(),
                device_name.to_string(),
                "--index".to_string(),
                index.to_string(),
            ],
        }
    }

    /// Builds the argv-style command. Working directory is inherited.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Human-readable command line, quoting arguments that need it.
    pub fn command_line(&self) -> String {
        let mut out = quote_if_needed(&self.program.to_string_lossy());
        for arg in &self.args {
            out.push(' ');
            out.push_str(&quote_if_needed(arg));
        }
        out
    }
}

/// One successful measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSample {
    pub parameter: i64,
    pub metric: u64,
}

/// Successful samples in sweep order, kept as two index-aligned sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    parameters: Vec<i64>,
    metrics: Vec<u64>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: SweepSample) {
        debug_assert!(
            self.parameters
                .last()
                .is_none_or(|&last| last < sample.parameter),
            "samples must arrive in increasing parameter order"
        );
        self.parameters.push(sample.parameter);
        self.metrics.push(sample.metric);
    }

    pub fn parameters(&self) -> &[i64] {
        &self.parameters
    }

    pub fn metrics(&self) -> &[u64] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = SweepSample> + '_ {
        self.parameters
            .iter()
            .zip(&self.metrics)
            .map(|(&parameter, &metric)| SweepSample { parameter, metric })
    }

    pub fn to_pairs(&self) -> Vec<(i64, u64)> {
        self.samples().map(|s| (s.parameter, s.metric)).collect()
    }
}

/// GPU and CPU frame times in milliseconds, index-aligned by frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTimeLog {
    gpu_ms: Vec<f64>,
    cpu_ms: Vec<f64>,
}

impl FrameTimeLog {
    /// Fails with [`SweepError::DataIntegrity`] when the series lengths differ.
    pub fn new(gpu_ms: Vec<f64>, cpu_ms: Vec<f64>) -> Result<Self, SweepError> {
        if gpu_ms.len() != cpu_ms.len() {
            return Err(SweepError::DataIntegrity {
                gpu: gpu_ms.len(),
                cpu: cpu_ms.len(),
            });
        }
        Ok(Self { gpu_ms, cpu_ms })
    }

    pub fn gpu_ms(&self) -> &[f64] {
        &self.gpu_ms
    }

    pub fn cpu_ms(&self) -> &[f64] {
        &self.cpu_ms
    }

    pub fn len(&self) -> usize {
        self.gpu_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gpu_ms.is_empty()
    }
}

fn quote_if_needed(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '=' | ':'));
    if plain {
        s.to_string()
    } else {
        shell_escape_single_quote(s)
    }
}

/// Wraps a string in single quotes, escaping internal single quotes as `'\''`.
pub fn shell_escape_single_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_step_rejected() {
        assert!(matches!(
            SweepRange::new(0, 10, 0),
            Err(SweepError::InvalidStep)
        ));
    }

    #[test]
    fn range_yields_ceil_count_strictly_increasing() {
        let cases = [(0, 10, 3), (3, 3000, 12), (-5, 5, 2), (1, 2, 7), (0, 12, 12)];
        for (start, end, step) in cases {
            let range = SweepRange::new(start, end, step).unwrap();
            let values: Vec<i64> = range.iter().collect();
            let expected = ((end - start) as usize).div_ceil(step);
            assert_eq!(values.len(), expected, "count for {start}..{end} by {step}");
            assert_eq!(range.len(), expected);
            assert_eq!(values[0], start);
            assert!(values.windows(2).all(|w| w[0] < w[1]));
            assert!(values.iter().all(|&v| v < end));
        }
    }

    #[test]
    fn range_with_start_past_end_is_empty() {
        let range = SweepRange::new(30, 3, 12).unwrap();
        assert_eq!(range.iter().count(), 0);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);

        let equal = SweepRange::new(7, 7, 1).unwrap();
        assert_eq!(equal.iter().count(), 0);
    }

    #[test]
    fn range_is_restartable() {
        let range = SweepRange::new(3, 30, 12).unwrap();
        let first: Vec<i64> = range.iter().collect();
        let second: Vec<i64> = range.iter().collect();
        assert_eq!(first, vec![3, 15, 27]);
        assert_eq!(first, second);
    }

    #[test]
    fn invocation_argument_order() {
        let inv = RunInvocation::new(Path::new("./bin/main"), "Intel(R) Graphics", 42);
        assert_eq!(
            inv.args,
            vec!["--physical-device", "Intel(R) Graphics", "--index", "42"]
        );
        assert_eq!(inv.index, 42);
    }

    #[test]
    fn command_line_quotes_device_with_spaces() {
        let inv = RunInvocation::new(Path::new("./bin/main"), "Intel(R) Graphics", 3);
        assert_eq!(
            inv.command_line(),
            "./bin/main --physical-device 'Intel(R) Graphics' --index 3"
        );
    }

    #[test]
    fn shell_escape_embedded_quote() {
        assert_eq!(shell_escape_single_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn dataset_stays_aligned() {
        let mut data = Dataset::new();
        data.push(SweepSample { parameter: 3, metric: 6 });
        data.push(SweepSample { parameter: 27, metric: 54 });
        assert_eq!(data.parameters().len(), data.metrics().len());
        assert_eq!(data.to_pairs(), vec![(3, 6), (27, 54)]);
    }

    #[test]
    fn frame_log_rejects_mismatched_lengths() {
        let err = FrameTimeLog::new(vec![12.5, 13.0], vec![9.0]).unwrap_err();
        assert!(matches!(err, SweepError::DataIntegrity { gpu: 2, cpu: 1 }));
        assert!(err.to_string().contains("mismatch"));
    }
}
