use std::path::PathBuf;

use clap::Parser;
use mocap_align::{run_from_config, RunConfig};

/// Align a markerless recording onto a marker-based reference and write
/// per-marker error tables.
#[derive(Parser, Debug)]
#[command(name = "mocap-align", version, about)]
struct Cli {
    /// JSON run configuration.
    config: PathBuf,

    /// Frame used to solve the alignment (overrides the config).
    #[arg(long)]
    representative_frame: Option<usize>,

    /// Estimate a uniform scale factor as well (similarity transform).
    #[arg(long)]
    estimate_scale: bool,

    /// Directory for the output tables (overrides the config).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit JSON-formatted tracing events instead of plain log lines.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    tracing_json: bool,
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = mocap_align::core::level_from_verbosity(cli.verbose);
    #[cfg(feature = "tracing")]
    {
        mocap_align::core::init_tracing(cli.tracing_json, level);
        // The subscriber may already have bridged `log` records.
        let _ = tracing_log::LogTracer::init();
    }
    #[cfg(not(feature = "tracing"))]
    mocap_align::core::init_with_level(level)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let mut cfg = RunConfig::load_json(&cli.config)?;
    if let Some(frame) = cli.representative_frame {
        cfg.representative_frame = frame;
    }
    if cli.estimate_scale {
        cfg.estimate_scale = true;
    }
    if let Some(dir) = cli.output_dir {
        cfg.output_dir = dir;
    }

    let report = run_from_config(&cfg)?;

    println!("marker,rmse");
    for row in &report.marker_rmse {
        match row.rmse {
            Some(v) => println!("{},{v:.4}", row.marker),
            None => println!("{},NaN", row.marker),
        }
    }
    if let Some(overall) = report.overall_rmse {
        println!("overall,{overall:.4}");
    }
    println!("wrote outputs to {}", cfg.output_dir.display());
    Ok(())
}
