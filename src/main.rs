use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use shadersweep::chart;
use shadersweep::config::{self, SweepConfig, SweepSection};
use shadersweep::display;
use shadersweep::logging;
use shadersweep::runner::{CommandStimulus, ProcessProbe};
use shadersweep::sweep;

#[derive(Parser)]
#[command(
    name = "shadersweep",
    version,
    about = "Sweep a GPU test program over --index values and chart its VS invocation count"
)]
struct Cli {
    /// TOML config file (defaults to <config dir>/shadersweep/config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Program under test
    #[arg(long)]
    program: Option<PathBuf>,

    /// Physical device name passed to the program and used in the chart title
    #[arg(long)]
    device: Option<String>,

    /// First --index value
    #[arg(long, allow_hyphen_values = true)]
    start: Option<i64>,

    /// Sweep stops before this --index value
    #[arg(long, allow_hyphen_values = true)]
    end: Option<i64>,

    #[arg(long)]
    step: Option<usize>,

    /// Wait after launch before reading output
    #[arg(long)]
    warm_up_ms: Option<u64>,

    /// Pause between runs
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Grace period after the termination request before a forced kill
    #[arg(long)]
    termination_wait_ms: Option<u64>,

    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Give up on a run that has printed no metric line after this long
    #[arg(long)]
    run_timeout_ms: Option<u64>,

    /// Command run once per launch after the warm-up, e.g. "xdotool key Tab"
    #[arg(long)]
    stimulus: Option<String>,

    /// Chart path (default: benchmark_result_<device>.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save the chart without opening it
    #[arg(long)]
    no_show: bool,

    /// Collect and print results only
    #[arg(long)]
    no_chart: bool,

    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> SweepSection {
        SweepSection {
            program_path: self.program.clone(),
            device_name: self.device.clone(),
            start: self.start,
            end: self.end,
            step: self.step,
            warm_up_ms: self.warm_up_ms,
            cooldown_ms: self.cooldown_ms,
            termination_wait_ms: self.termination_wait_ms,
            poll_interval_ms: self.poll_interval_ms,
            run_timeout_ms: self.run_timeout_ms,
            stimulus: self.stimulus.clone(),
            output: self.output.clone(),
            show: self.no_show.then_some(false),
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = logging::init_tracing(cli.verbose) {
        eprintln!("warning: logging disabled: {err}");
    }

    let file = config::load_layered(cli.config.as_deref())?;
    let config = SweepConfig::resolve(&[file.sweep, cli.overrides()])?;

    let mut probe = ProcessProbe::new(config.timing);
    if let Some(stimulus) = config
        .stimulus
        .as_deref()
        .and_then(CommandStimulus::from_command_line)
    {
        probe = probe.with_stimulus(Box::new(stimulus));
    }

    let report = sweep::run_sweep(&config, &mut probe);

    if cli.json {
        println!("{}", display::format_sweep_json(&report));
    } else if !report.dataset.is_empty() {
        print!("{}", display::format_sweep_report(&report));
    }

    let dataset = report.into_dataset()?;

    if cli.no_chart {
        return Ok(());
    }

    let path = config
        .output
        .clone()
        .unwrap_or_else(|| chart::chart_filename(&config.device_name));
    chart::render_sweep_chart(&dataset, &config.device_name, &path)?;
    println!("Graph saved to {}", path.display());

    if config.show
        && let Err(err) = chart::show_image(&path)
    {
        warn!("Could not open {}: {err}", path.display());
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
