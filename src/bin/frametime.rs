use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use shadersweep::chart;
use shadersweep::config::{self, FrameTimeConfig, FrameTimeSection};
use shadersweep::display;
use shadersweep::frametime;
use shadersweep::logging;

#[derive(Parser)]
#[command(
    name = "frametime",
    version,
    about = "Chart GPU and CPU headless frame times from a recorded log"
)]
struct Cli {
    /// Frame time log (default: ./drawer/headless_frame_time.txt)
    log: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Chart path (default: headless_frame_time.png)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long)]
    no_show: bool,

    #[arg(long)]
    no_chart: bool,

    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = logging::init_tracing(cli.verbose) {
        eprintln!("warning: logging disabled: {err}");
    }

    let file = config::load_layered(cli.config.as_deref())?;
    let overrides = FrameTimeSection {
        log_path: cli.log.clone(),
        output: cli.output.clone(),
        show: cli.no_show.then_some(false),
    };
    let config = FrameTimeConfig::resolve(&[file.frametime, overrides]);

    let log = frametime::parse_frame_times(&config.log_path)?;

    if cli.json {
        println!("{}", display::format_frame_json(&log));
    } else {
        print!("{}", display::format_frame_summary(&log));
    }

    if cli.no_chart {
        return Ok(());
    }

    chart::render_frame_chart(&log, &config.output)?;
    println!("Graph saved to {}", config.output.display());

    if config.show
        && let Err(err) = chart::show_image(&config.output)
    {
        warn!("Could not open {}: {err}", config.output.display());
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
