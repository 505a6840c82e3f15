//! Guidance server: JSON requests on stdin, JSON responses on stdout.
//!
//! Methods: `ping`, `capabilities`, `load_guidance`, `expand_excerpt`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use guidance_core::loader::GuidanceLoader;
use guidance_core::protocol::handle_line;

#[derive(Parser)]
#[command(
    name = "guidance-server",
    about = "Serve token-budgeted guidance over stdio",
    version
)]
struct Cli {
    /// Guidance directory holding manifest.yaml and excerpts.jsonl
    #[arg(long, env = "GUIDANCE_DIR", default_value = ".guidance")]
    guidance_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries protocol traffic only
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let loader = GuidanceLoader::open(&cli.guidance_dir)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(stdout, "{}", handle_line(&loader, &line))?;
        stdout.flush()?;
    }

    Ok(())
}
