use crate::error::Result;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget<'a> {
  /// Appends to a file; the only option while the TUI owns the terminal.
  File(&'a Path),
  Stderr,
  Off,
}

impl<'a> LogTarget<'a> {
  pub fn choose(log_file: Option<&'a Path>, interactive: bool) -> Self {
    match (log_file, interactive) {
      (Some(path), _) => LogTarget::File(path),
      (None, false) => LogTarget::Stderr,
      (None, true) => LogTarget::Off,
    }
  }
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default level.
pub fn init_tracing(target: LogTarget<'_>) -> Result<()> {
  let filter = |default: &str| {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
  };

  let installed = match target {
    LogTarget::File(path) => {
      let file = OpenOptions::new().create(true).append(true).open(path)?;
      tracing_subscriber::fmt()
        .with_env_filter(filter("info"))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
    }
    LogTarget::Stderr => tracing_subscriber::fmt()
      .with_env_filter(filter("warn"))
      .with_writer(std::io::stderr)
      .try_init(),
    LogTarget::Off => return Ok(()),
  };

  if let Err(e) = installed {
    // Only happens when a subscriber is already set, e.g. in tests.
    tracing::debug!(error = %e, "tracing already initialized");
  }

  Ok(())
}
