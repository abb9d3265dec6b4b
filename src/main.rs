use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use osmon::agent::Osmon;
use osmon::config::load_config_with_precedence;
use osmon::daemon::Runner;
use osmon::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "osmon", version, about = "OS monitoring daemon")]
struct Cli {
    /// Configuration file (TOML).
    #[arg(short, long, env = "OSMON_CONFIG")]
    config: Option<PathBuf>,
    /// Write logs as JSON lines to this file instead of the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,
    /// Tick interval of the run loop, in milliseconds.
    #[arg(long, default_value_t = 500)]
    tick_ms: u64,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;
    let cfg = load_config_with_precedence(cli.config.as_ref());
    let mut agent = Osmon::new(cfg);
    let mut runner = Runner::new(Duration::from_millis(cli.tick_ms.max(1)));
    runner.run(&mut agent).await
}
