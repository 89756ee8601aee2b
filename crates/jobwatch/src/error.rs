use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration file not found: {path:?}")]
  ConfigNotFound { path: PathBuf },

  #[error("Invalid configuration in {path:?}: {details}")]
  ConfigInvalid { path: PathBuf, details: String },

  #[error("Invalid polling interval {0}: expected a positive number of seconds")]
  InvalidInterval(f64),

  #[error("Invalid duration '{value}': {reason}")]
  InvalidDuration { value: String, reason: String },

  #[error("Cannot determine the current user. Set $USER or pass --user.")]
  UnknownUser,

  #[error("No scheduler found in PATH. Checked: {checked:?}")]
  SchedulerNotFound { checked: Vec<String> },

  #[error("Failed to execute command '{command}': {reason}")]
  CommandNotFound { command: String, reason: String },

  #[error("Command '{command}' exited with {status}: {stderr}")]
  CommandFailed {
    command: String,
    status: String,
    stderr: String,
  },

  #[error("Timeout: {0}")]
  Timeout(#[from] tokio::time::error::Elapsed),

  #[error("IO error: {0}")]
  IoError(#[from] std::io::Error),

  #[error("TOML parse error: {0}")]
  TomlError(#[from] toml::de::Error),

  #[error("JSON parse error: {0}")]
  JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
