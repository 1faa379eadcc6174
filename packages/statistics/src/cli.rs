//! Command-line interface for the statistics collector.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::stats::{collect_batch, save_summary};

/// Scenetree Statistics - Collect content statistics over scene batches.
#[derive(Parser)]
#[command(name = "scenetree-statistics")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a directory tree of scene descriptions and summarise contents.
    Collect {
        /// Root directory to scan recursively for scene JSON files
        root: PathBuf,

        /// Output directory for the summary (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Collect { root, output } => collect_command(&root, output.as_deref()),
    }
}

/// Execute the collect command.
fn collect_command(root: &Path, output: Option<&Path>) -> Result<()> {
    let output_dir = output.unwrap_or(Path::new("."));

    println!(
        "{} {}",
        style("Collecting statistics under").bold(),
        style(root.display()).cyan()
    );
    println!();

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("Scanning scene files...");

    let summary = match collect_batch(root) {
        Ok(summary) => summary,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.set_message("Saving summary...");
    let summary_path = match save_summary(&summary, output_dir) {
        Ok(path) => path,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    println!("  Scenes: {}", style(summary.scenes.len()).green());
    for (class, count) in &summary.totals {
        println!("  {}: {count}", class.as_str());
    }
    if !summary.failures.is_empty() {
        println!(
            "  Unreadable: {}",
            style(summary.failures.len()).yellow().bold()
        );
        for failure in &summary.failures {
            println!(
                "    {}: {}",
                style(failure.scene_file.display()).yellow(),
                failure.reason
            );
        }
    }

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        summary_path.display()
    );

    Ok(())
}
