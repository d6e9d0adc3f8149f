use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use omnidrive_core::config::Config;
use omnidrive_core::messages::BodyVelocity;

/// Drive a simulated omni base through the control and status frames
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target forward velocity (m/s)
    #[arg(long, default_value_t = 0.5, allow_negative_numbers = true)]
    vx: f64,

    /// Target sideways velocity (m/s)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    vy: f64,

    /// Target angular velocity (rad/s)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    vw: f64,

    /// Number of control ticks to run
    #[arg(short, long, default_value_t = 300)]
    ticks: u64,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let target = BodyVelocity::new(args.vx, args.vy, args.vw);
    match omnidrive_core::runtime::run(config, target, args.ticks).await {
        Ok(estimate) => info!(
            "Final estimate x={:.3} y={:.3} w={:.3} (target x={:.3} y={:.3} w={:.3})",
            estimate.x, estimate.y, estimate.w, target.x, target.y, target.w
        ),
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            std::process::exit(1);
        }
    }
}
