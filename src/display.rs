use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;

use crate::frametime::{mean, p95, p95_upper_bound};
use crate::sweep::{SkipReason, SweepReport};
use crate::types::FrameTimeLog;

/// Compact elapsed time: "850ms", "42s", "3m 05s", "1h 02m".
pub fn format_elapsed(duration: chrono::Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    let secs = millis / 1000;
    if secs < 1 {
        format!("{millis}ms")
    } else if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    }
}

fn style_header() -> Style {
    Style::new().bold()
}

fn style_dim_italic() -> Style {
    Style::new().dimmed().italic()
}

/// Table of collected samples plus a footer with skip counts and timing.
pub fn format_sweep_report(report: &SweepReport) -> String {
    let mut out = String::new();

    let header = format!("Vertex shader invocations on {}:", report.device_name);
    out.push_str(
        &header
            .if_supports_color(Stream::Stdout, |s| s.style(style_header()))
            .to_string(),
    );
    out.push_str("\n\n");

    let param_width = report
        .dataset
        .parameters()
        .iter()
        .map(|p| p.to_string().len())
        .max()
        .unwrap_or(0)
        .max("index".len());

    out.push_str(&format!(
        "  {:>width$}  {}\n",
        "index",
        "invocations",
        width = param_width
    ));
    for sample in report.dataset.samples() {
        let idx = format!("{:>width$}", sample.parameter, width = param_width);
        out.push_str(&format!(
            "  {}  {}\n",
            idx.if_supports_color(Stream::Stdout, |s| s.cyan()),
            sample
                .metric
                .if_supports_color(Stream::Stdout, |s| s.green())
        ));
    }

    if !report.skipped.is_empty() {
        out.push('\n');
        for skip in &report.skipped {
            let line = match &skip.reason {
                SkipReason::NoMatch => format!("  {}: no invocation count reported", skip.parameter),
                SkipReason::Failed(detail) => format!("  {}: {}", skip.parameter, detail),
            };
            out.push_str(
                &line
                    .if_supports_color(Stream::Stdout, |s| s.style(style_dim_italic()))
                    .to_string(),
            );
            out.push('\n');
        }
    }

    out.push('\n');
    let footer = format!(
        "{} of {} runs produced a sample in {}",
        report.dataset.len(),
        report.attempted,
        format_elapsed(report.finished_at - report.started_at)
    );
    out.push_str(
        &footer
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
            .to_string(),
    );
    out.push('\n');

    out
}

#[derive(Serialize)]
struct JsonSweep<'a> {
    device_name: &'a str,
    start: i64,
    end: i64,
    step: usize,
    attempted: usize,
    samples: Vec<(i64, u64)>,
    skipped: &'a [crate::sweep::SkippedRun],
    started_at: String,
    finished_at: String,
    elapsed_ms: i64,
}

pub fn format_sweep_json(report: &SweepReport) -> String {
    let json = JsonSweep {
        device_name: &report.device_name,
        start: report.range.start(),
        end: report.range.end(),
        step: report.range.step(),
        attempted: report.attempted,
        samples: report.dataset.to_pairs(),
        skipped: &report.skipped,
        started_at: report.started_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        finished_at: report.finished_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        elapsed_ms: (report.finished_at - report.started_at).num_milliseconds(),
    };
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
}

#[derive(Serialize)]
struct FrameSummary {
    frames: usize,
    gpu_mean_ms: Option<f64>,
    cpu_mean_ms: Option<f64>,
    p95_ms: Option<f64>,
    y_axis_top_ms: f64,
}

fn frame_summary(log: &FrameTimeLog) -> FrameSummary {
    FrameSummary {
        frames: log.len(),
        gpu_mean_ms: mean(log.gpu_ms()),
        cpu_mean_ms: mean(log.cpu_ms()),
        p95_ms: p95(log),
        y_axis_top_ms: p95_upper_bound(log),
    }
}

fn fmt_ms(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:.3} ms"))
}

pub fn format_frame_summary(log: &FrameTimeLog) -> String {
    let s = frame_summary(log);
    let mut out = String::new();
    out.push_str(
        &"Headless frame time:"
            .if_supports_color(Stream::Stdout, |t| t.style(style_header()))
            .to_string(),
    );
    out.push('\n');
    out.push_str(&format!("  frames      {}\n", s.frames));
    out.push_str(&format!(
        "  GPU mean    {}\n",
        fmt_ms(s.gpu_mean_ms).if_supports_color(Stream::Stdout, |t| t.cyan())
    ));
    out.push_str(&format!(
        "  CPU mean    {}\n",
        fmt_ms(s.cpu_mean_ms).if_supports_color(Stream::Stdout, |t| t.yellow())
    ));
    out.push_str(&format!("  p95         {}\n", fmt_ms(s.p95_ms)));
    out.push_str(&format!("  axis top    {:.3} ms\n", s.y_axis_top_ms));
    out
}

pub fn format_frame_json(log: &FrameTimeLog) -> String {
    serde_json::to_string_pretty(&frame_summary(log)).unwrap_or_else(|_| "{}".to_string())
}
