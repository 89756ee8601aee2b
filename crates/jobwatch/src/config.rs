use crate::cli::Args;
use crate::error::{AppError, Result};
use crate::scheduler::{ProgramOverrides, SchedulerKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INTERVAL_SECS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
  TomlFile(PathBuf),
  JsonFile(PathBuf),
}

impl ConfigSource {
  fn from_path(path: PathBuf) -> Self {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("json") => ConfigSource::JsonFile(path),
      _ => ConfigSource::TomlFile(path),
    }
  }
}

// Checked in order in the working directory.
const FILE_CANDIDATES: [(&str, fn(PathBuf) -> ConfigSource); 4] = [
  (".jobwatch.toml", ConfigSource::TomlFile),
  ("jobwatch.toml", ConfigSource::TomlFile),
  (".jobwatch.json", ConfigSource::JsonFile),
  ("jobwatch.json", ConfigSource::JsonFile),
];

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProgramConfig {
  /// Status program, by name or path.
  pub command: Option<String>,
}

/// Contents of a config file. Every field is optional; the CLI wins.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
  pub interval: Option<f64>,
  pub lines: Option<usize>,
  pub scheduler: Option<SchedulerKind>,
  pub user: Option<String>,
  pub timeout: Option<String>,
  pub grid_engine: ProgramConfig,
  pub slurm: ProgramConfig,
}

impl FileConfig {
  pub fn find_file(dir: &Path) -> Option<ConfigSource> {
    FILE_CANDIDATES
      .iter()
      .map(|(filename, source_fn)| (dir.join(filename), source_fn))
      .find(|(path, _)| path.is_file())
      .map(|(path, source_fn)| source_fn(path))
  }

  /// Loads `explicit` when given, otherwise the first candidate in `dir`.
  /// No candidate at all yields the defaults.
  pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<FileConfig> {
    let source = match explicit {
      Some(path) if !path.is_file() => {
        return Err(AppError::ConfigNotFound {
          path: path.to_path_buf(),
        });
      }
      Some(path) => ConfigSource::from_path(path.to_path_buf()),
      None => match Self::find_file(dir) {
        Some(source) => source,
        None => return Ok(FileConfig::default()),
      },
    };

    Self::load_source(&source)
  }

  pub fn load_source(source: &ConfigSource) -> Result<FileConfig> {
    match source {
      ConfigSource::TomlFile(path) => {
        let content = fs::read_to_string(path).map_err(|e| AppError::ConfigInvalid {
          path: path.clone(),
          details: format!("Failed to read toml file: {}", e),
        })?;

        let config = toml::from_str(&content).map_err(|e| AppError::ConfigInvalid {
          path: path.clone(),
          details: format!("Invalid TOML: {}", e),
        })?;

        tracing::debug!(?path, "loaded config");
        Ok(config)
      }
      ConfigSource::JsonFile(path) => {
        let content = fs::read_to_string(path).map_err(|e| AppError::ConfigInvalid {
          path: path.clone(),
          details: format!("Failed to read json file: {}", e),
        })?;

        let config = serde_json::from_str(&content).map_err(|e| AppError::ConfigInvalid {
          path: path.clone(),
          details: format!("Invalid JSON: {}", e),
        })?;

        tracing::debug!(?path, "loaded config");
        Ok(config)
      }
    }
  }
}

/// Effective configuration of a `jobwatch` run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub interval: Duration,
  /// Listing cap; `None` fits the listing to the terminal.
  pub lines: Option<usize>,
  pub scheduler: SchedulerKind,
  pub programs: ProgramOverrides,
  pub user: String,
  pub timeout: Option<Duration>,
  pub once: bool,
  pub log_file: Option<PathBuf>,
}

impl Settings {
  pub fn resolve(args: &Args, file: FileConfig) -> Result<Settings> {
    Self::resolve_with(args, file, |key| std::env::var(key).ok())
  }

  /// Like [`Settings::resolve`] with an explicit environment lookup.
  pub fn resolve_with(
    args: &Args,
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
  ) -> Result<Settings> {
    let interval = parse_interval(
      args
        .interval
        .or(file.interval)
        .unwrap_or(DEFAULT_INTERVAL_SECS),
    )?;

    let timeout = args
      .timeout
      .as_deref()
      .or(file.timeout.as_deref())
      .map(parse_timeout)
      .transpose()?;

    let user = args
      .user
      .clone()
      .or(file.user)
      .or_else(|| env("USER"))
      .or_else(|| env("LOGNAME"))
      .filter(|user| !user.trim().is_empty())
      .ok_or(AppError::UnknownUser)?;

    Ok(Settings {
      interval,
      lines: args.lines.or(file.lines),
      scheduler: args.scheduler.or(file.scheduler).unwrap_or_default(),
      programs: ProgramOverrides {
        grid_engine: file.grid_engine.command,
        slurm: file.slurm.command,
      },
      user,
      timeout,
      once: args.once,
      log_file: args.log_file.clone(),
    })
  }
}

pub fn parse_interval(seconds: f64) -> Result<Duration> {
  if seconds.is_nan() || seconds <= 0.0 {
    return Err(AppError::InvalidInterval(seconds));
  }

  Duration::try_from_secs_f64(seconds).map_err(|_| AppError::InvalidInterval(seconds))
}

pub fn parse_timeout(value: &str) -> Result<Duration> {
  parse_duration::parse(value).map_err(|e| AppError::InvalidDuration {
    value: value.to_string(),
    reason: e.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn no_env(_: &str) -> Option<String> {
    None
  }

  fn env_user(key: &str) -> Option<String> {
    (key == "USER").then(|| "alice".to_string())
  }

  #[test]
  fn defaults_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = FileConfig::load(None, dir.path()).unwrap();
    let settings = Settings::resolve_with(&Args::default(), file, env_user).unwrap();

    assert_eq!(settings.interval, Duration::from_secs(5));
    assert_eq!(settings.lines, None);
    assert_eq!(settings.scheduler, SchedulerKind::Auto);
    assert_eq!(settings.user, "alice");
    assert_eq!(settings.timeout, None);
  }

  #[test]
  fn toml_file_is_discovered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
      dir.path().join(".jobwatch.toml"),
      r#"
interval = 2.5
lines = 20
scheduler = "grid-engine"
timeout = "30s"

[grid-engine]
command = "/opt/sge/bin/qstat"
"#,
    )
    .unwrap();

    let file = FileConfig::load(None, dir.path()).unwrap();
    let settings = Settings::resolve_with(&Args::default(), file, env_user).unwrap();

    assert_eq!(settings.interval, Duration::from_millis(2500));
    assert_eq!(settings.lines, Some(20));
    assert_eq!(settings.scheduler, SchedulerKind::GridEngine);
    assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    assert_eq!(
      settings.programs.grid_engine.as_deref(),
      Some("/opt/sge/bin/qstat")
    );
  }

  #[test]
  fn json_file_is_discovered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
      dir.path().join("jobwatch.json"),
      r#"{ "scheduler": "slurm", "user": "bob", "slurm": { "command": "squeue" } }"#,
    )
    .unwrap();

    let file = FileConfig::load(None, dir.path()).unwrap();
    let settings = Settings::resolve_with(&Args::default(), file, no_env).unwrap();

    assert_eq!(settings.scheduler, SchedulerKind::Slurm);
    assert_eq!(settings.user, "bob");
    assert_eq!(settings.programs.slurm.as_deref(), Some("squeue"));
  }

  #[test]
  fn cli_overrides_file() {
    let file = FileConfig {
      interval: Some(10.0),
      lines: Some(5),
      user: Some("bob".to_string()),
      ..Default::default()
    };
    let args = Args {
      interval: Some(1.0),
      lines: Some(7),
      user: Some("carol".to_string()),
      ..Default::default()
    };

    let settings = Settings::resolve_with(&args, file, env_user).unwrap();

    assert_eq!(settings.interval, Duration::from_secs(1));
    assert_eq!(settings.lines, Some(7));
    assert_eq!(settings.user, "carol");
  }

  #[test]
  fn unknown_keys_are_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "intervall = 3\n").unwrap();

    let err = FileConfig::load(Some(&path), dir.path()).unwrap_err();
    assert!(matches!(err, AppError::ConfigInvalid { .. }));
  }

  #[test]
  fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");

    let err = FileConfig::load(Some(&path), dir.path()).unwrap_err();
    assert!(matches!(err, AppError::ConfigNotFound { .. }));
  }

  #[test]
  fn interval_must_be_positive() {
    assert!(matches!(parse_interval(0.0), Err(AppError::InvalidInterval(_))));
    assert!(matches!(parse_interval(-1.0), Err(AppError::InvalidInterval(_))));
    assert!(matches!(parse_interval(f64::NAN), Err(AppError::InvalidInterval(_))));
    assert!(parse_interval(0.25).is_ok());
  }

  #[test]
  fn bad_timeout_is_rejected() {
    assert!(matches!(
      parse_timeout("soon"),
      Err(AppError::InvalidDuration { .. })
    ));
  }

  #[test]
  fn missing_user_is_an_error() {
    let err = Settings::resolve_with(&Args::default(), FileConfig::default(), no_env).unwrap_err();
    assert!(matches!(err, AppError::UnknownUser));
  }

  #[test]
  fn logname_is_a_fallback() {
    let env = |key: &str| (key == "LOGNAME").then(|| "dave".to_string());
    let settings = Settings::resolve_with(&Args::default(), FileConfig::default(), env).unwrap();

    assert_eq!(settings.user, "dave");
  }
}
