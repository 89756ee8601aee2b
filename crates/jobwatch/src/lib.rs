pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod poller;
pub mod render;
pub mod runner;
pub mod scheduler;
pub mod shutdown;
pub mod status;
pub mod submit;
pub mod tally;

use crate::app::App;
use crate::cli::Args;
use crate::config::{FileConfig, Settings};
use crate::logging::{LogTarget, init_tracing};
use crate::model::SummaryModel;
use crate::poller::Poller;
use crate::render::{DEFAULT_LISTING_LINES, render_plain};
use crate::runner::ProcessRunner;
use crate::scheduler::build_scheduler;
use crate::shutdown::install_shutdown_handler;
use clap::Parser;

pub use crate::error::{AppError, Result};

/// Entry point of the `jobwatch` binary.
pub async fn run() -> anyhow::Result<()> {
  let args = Args::parse();

  let cwd = std::env::current_dir()?;
  let file = FileConfig::load(args.config.as_deref(), &cwd)?;
  let settings = Settings::resolve(&args, file)?;

  init_tracing(LogTarget::choose(
    settings.log_file.as_deref(),
    !settings.once,
  ))?;

  let scheduler = build_scheduler(settings.scheduler, &settings.programs)?;
  let runner = ProcessRunner::with_timeout(settings.timeout);
  let poller = Poller::new(scheduler, runner, settings.user.as_str(), settings.interval);

  tracing::info!(
    scheduler = poller.scheduler().name(),
    user = poller.user(),
    interval = ?poller.interval(),
    "starting"
  );

  if settings.once {
    let report = poller.poll_once().await;
    let model = SummaryModel::from_report(&report, poller.scheduler(), poller.user());
    let limit = settings.lines.unwrap_or(DEFAULT_LISTING_LINES);
    print!("{}", render_plain(&model, limit));
    return Ok(());
  }

  let shutdown = install_shutdown_handler()?;
  App::new(poller, settings.lines, shutdown).run().await?;

  Ok(())
}
