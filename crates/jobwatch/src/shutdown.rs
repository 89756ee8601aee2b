use crate::error::Result;
use tokio_util::sync::CancellationToken;

/// Install a shutdown handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is received.
/// The poller checks it between cycles.
#[cfg(unix)]
pub fn install_shutdown_handler() -> Result<CancellationToken> {
  use tokio::signal::unix::{SignalKind, signal};

  let token = CancellationToken::new();
  let token_clone = token.clone();

  let mut sigterm = signal(SignalKind::terminate())?;
  let mut sigint = signal(SignalKind::interrupt())?;

  tokio::spawn(async move {
    tokio::select! {
      _ = sigterm.recv() => {
        tracing::info!("Received SIGTERM, shutting down");
      }
      _ = sigint.recv() => {
        tracing::info!("Received SIGINT, shutting down");
      }
      _ = token_clone.cancelled() => return,
    }

    token_clone.cancel();
  });

  Ok(token)
}

#[cfg(not(unix))]
pub fn install_shutdown_handler() -> Result<CancellationToken> {
  let token = CancellationToken::new();
  let token_clone = token.clone();

  tokio::spawn(async move {
    tokio::select! {
      result = tokio::signal::ctrl_c() => {
        if let Err(e) = result {
          tracing::warn!(error = %e, "failed to listen for Ctrl-C");
          return;
        }
        tracing::info!("Received Ctrl-C, shutting down");
      }
      _ = token_clone.cancelled() => return,
    }

    token_clone.cancel();
  });

  Ok(token)
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;

  #[tokio::test]
  async fn token_starts_live() {
    let token = install_shutdown_handler().unwrap();
    assert!(!token.is_cancelled());
    token.cancel();
  }
}
