use crate::scheduler::SchedulerKind;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "jobwatch")]
#[command(version)]
#[command(about = "Watch your jobs in a grid-engine or SLURM queue")]
pub struct Args {
  /// Seconds between polls [default: 5]
  #[arg(short = 'n', long = "interval", value_name = "SECONDS")]
  pub interval: Option<f64>,

  /// Maximum listing lines [default: terminal height, 40 with --once]
  #[arg(short = 'l', long = "lines", value_name = "LINES")]
  pub lines: Option<usize>,

  /// Scheduler family
  #[arg(short, long, value_enum)]
  pub scheduler: Option<SchedulerKind>,

  /// User whose jobs are counted [default: $USER]
  #[arg(short, long)]
  pub user: Option<String>,

  /// Config file [default: .jobwatch.toml or .jobwatch.json in the current directory]
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// Give up on a status command after this long, e.g. "30s"
  #[arg(long, value_name = "DURATION")]
  pub timeout: Option<String>,

  /// Print a single cycle to stdout and exit
  #[arg(long)]
  pub once: bool,

  /// Write logs to this file
  #[arg(long, value_name = "PATH")]
  pub log_file: Option<PathBuf>,
}
