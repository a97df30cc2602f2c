use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use plotters::prelude::*;

use crate::errors::SweepError;
use crate::frametime::p95_upper_bound;
use crate::types::{Dataset, FrameTimeLog};

const SWEEP_CHART_SIZE: (u32, u32) = (720, 480);
const FRAME_CHART_SIZE: (u32, u32) = (840, 480);

// matplotlib's first two cycle colours, so both charts read like the old ones.
const GPU_COLOR: RGBColor = RGBColor(31, 119, 180);
const CPU_COLOR: RGBColor = RGBColor(255, 127, 14);

/// `benchmark_result_<device>.png`, with spaces and characters that are not
/// allowed in a file name replaced by underscores.
pub fn chart_filename(device_name: &str) -> PathBuf {
    let stem: String = device_name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    PathBuf::from(format!("benchmark_result_{stem}.png"))
}

/// Corner points of a right-continuous step line through `data`: each value
/// holds until the next parameter, where the line jumps vertically.
pub fn step_points(data: &Dataset) -> Vec<(f64, f64)> {
    let pairs = data.to_pairs();
    let mut points = Vec::with_capacity(pairs.len() * 2);
    for (i, &(x, y)) in pairs.iter().enumerate() {
        points.push((x as f64, y as f64));
        if let Some(&(next_x, _)) = pairs.get(i + 1) {
            points.push((next_x as f64, y as f64));
        }
    }
    points
}

/// Axis ranges for the sweep chart. Both start at zero (or lower, for
/// negative parameters) with a little headroom at the top.
pub fn sweep_axes(data: &Dataset) -> (Range<f64>, Range<f64>) {
    let x_min = data.parameters().iter().copied().min().unwrap_or(0).min(0) as f64;
    let x_max = data.parameters().iter().copied().max().unwrap_or(0) as f64;
    let y_max = data.metrics().iter().copied().max().unwrap_or(0) as f64;

    let x_top = if x_max > x_min {
        x_max + (x_max - x_min) * 0.05
    } else {
        x_min + 1.0
    };
    let y_top = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };
    (x_min..x_top, 0.0..y_top)
}

/// Step plot of invocations against indices drawn, written as a PNG.
pub fn render_sweep_chart(data: &Dataset, device_name: &str, path: &Path) -> Result<(), SweepError> {
    draw_sweep(data, device_name, path).map_err(render_error)
}

fn draw_sweep(data: &Dataset, device_name: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, SWEEP_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_range, y_range) = sweep_axes(data);
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Vertex Shader Invocations ({device_name})"),
            ("sans-serif", 18),
        )
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(64)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Indices drawn")
        .y_desc("Shader invocations")
        .bold_line_style(BLACK.mix(0.25))
        .light_line_style(BLACK.mix(0.08))
        .label_style(("sans-serif", 12))
        .draw()?;

    chart.draw_series(LineSeries::new(step_points(data), BLUE.stroke_width(2)))?;

    root.present()?;
    Ok(())
}

/// GPU and CPU frame times against 1-based frame index, written as a PNG.
/// The value axis tops out at [`p95_upper_bound`].
pub fn render_frame_chart(log: &FrameTimeLog, path: &Path) -> Result<(), SweepError> {
    draw_frames(log, path).map_err(render_error)
}

fn draw_frames(log: &FrameTimeLog, path: &Path) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, FRAME_CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let frames = log.len().max(1) as f64;
    let y_top = p95_upper_bound(log);
    let mut chart = ChartBuilder::on(&root)
        .caption("Headless Frame Time", ("sans-serif", 18))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d(0.5..frames + 0.5, 0.0..y_top)?;

    chart
        .configure_mesh()
        .x_desc("Frame index")
        .y_desc("Frame time (ms)")
        .bold_line_style(BLACK.mix(0.25))
        .light_line_style(BLACK.mix(0.08))
        .label_style(("sans-serif", 12))
        .draw()?;

    for (label, values, color) in [
        ("GPU", log.gpu_ms(), GPU_COLOR),
        ("CPU", log.cpu_ms(), CPU_COLOR),
    ] {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| ((i + 1) as f64, v));
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(1)).point_size(3))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.4))
        .label_font(("sans-serif", 12))
        .draw()?;

    root.present()?;
    Ok(())
}

fn render_error(err: Box<dyn Error>) -> SweepError {
    SweepError::Render {
        detail: err.to_string(),
    }
}

/// Open `path` in the desktop's default image viewer.
pub fn show_image(path: &Path) -> std::io::Result<()> {
    let mut cmd = opener_command();
    let status = cmd
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("image viewer exited with {status}")))
    }
}

#[cfg(target_os = "macos")]
fn opener_command() -> Command {
    Command::new("open")
}

#[cfg(windows)]
fn opener_command() -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", "start", ""]);
    cmd
}

#[cfg(all(unix, not(target_os = "macos")))]
fn opener_command() -> Command {
    Command::new("xdg-open")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SweepSample;

    fn dataset(pairs: &[(i64, u64)]) -> Dataset {
        let mut data = Dataset::new();
        for &(parameter, metric) in pairs {
            data.push(SweepSample { parameter, metric });
        }
        data
    }

    #[test]
    fn filename_replaces_spaces() {
        assert_eq!(
            chart_filename("Intel(R) Graphics"),
            PathBuf::from("benchmark_result_Intel(R)_Graphics.png")
        );
        assert_eq!(
            chart_filename("NVIDIA GeForce RTX 5080 Laptop GPU"),
            PathBuf::from("benchmark_result_NVIDIA_GeForce_RTX_5080_Laptop_GPU.png")
        );
    }

    #[test]
    fn filename_never_leaves_the_output_directory() {
        let path = chart_filename("Radeon RX 7900 XT/XTX");
        assert_eq!(path, PathBuf::from("benchmark_result_Radeon_RX_7900_XT_XTX.png"));
        assert_eq!(path.components().count(), 1);

        let path = chart_filename(r"..\GPU: A|B");
        assert_eq!(path, PathBuf::from("benchmark_result_.._GPU__A_B.png"));
        assert_eq!(path.components().count(), 1);
    }

    #[test]
    fn step_points_hold_until_next_parameter() {
        let data = dataset(&[(3, 6), (15, 30), (27, 54)]);
        assert_eq!(
            step_points(&data),
            vec![
                (3.0, 6.0),
                (15.0, 6.0),
                (15.0, 30.0),
                (27.0, 30.0),
                (27.0, 54.0)
            ]
        );
    }

    #[test]
    fn step_points_single_sample() {
        let data = dataset(&[(3, 6)]);
        assert_eq!(step_points(&data), vec![(3.0, 6.0)]);
    }

    #[test]
    fn axes_start_at_zero() {
        let data = dataset(&[(3, 96), (15, 96), (27, 192)]);
        let (x, y) = sweep_axes(&data);
        assert_eq!(x.start, 0.0);
        assert_eq!(y.start, 0.0);
        assert!(x.end > 27.0);
        assert!(y.end > 192.0);
    }

    #[test]
    fn axes_for_flat_zero_metric() {
        let data = dataset(&[(0, 0)]);
        let (x, y) = sweep_axes(&data);
        assert!(x.end > x.start);
        assert!(y.end > y.start);
    }

    #[test]
    fn renders_sweep_png() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("chart.png");
        render_sweep_chart(&dataset(&[(3, 6), (15, 30)]), "Test GPU", &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn renders_frame_png() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("headless_frame_time.png");
        let log = FrameTimeLog::new(vec![12.5, 13.0, 40.0], vec![9.0, 8.5, 9.5]).unwrap();
        render_frame_chart(&log, &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn unwritable_path_is_render_error() {
        let tmp = assert_fs::TempDir::new().unwrap();
        let path = tmp.path().join("missing-dir").join("chart.png");
        let err = render_sweep_chart(&dataset(&[(3, 6)]), "Test GPU", &path).unwrap_err();
        assert!(matches!(err, SweepError::Render { .. }));
    }
}
