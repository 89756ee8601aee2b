//! Scheduler adapters.
//!
//! Each cluster workload manager prints its queue in its own tabular layout
//! with its own status vocabulary. A [`Scheduler`] describes that layout: which
//! program to run, where the status token sits in a row, which codes it knows
//! and how array jobs are spelled. The poller only ever talks to this trait.

mod grid_engine;
mod slurm;

pub use grid_engine::GridEngine;
pub use slurm::Slurm;

use crate::error::{AppError, Result};
use crate::status::StatusClass;
use serde::Deserialize;

/// One recognised status token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode {
  pub code: &'static str,
  pub label: &'static str,
  pub class: StatusClass,
}

impl StatusCode {
  pub const fn new(code: &'static str, label: &'static str, class: StatusClass) -> Self {
    Self { code, label, class }
  }
}

/// Where the array-range column was found in the header of one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayColumn {
  /// Position among the whitespace-delimited header tokens.
  pub token_index: usize,
  /// Byte offset of the header name within the header line.
  pub char_offset: usize,
}

impl ArrayColumn {
  /// Finds `name` as a whole token in the first line that carries it.
  pub fn locate(raw: &str, name: &str) -> Option<Self> {
    raw.lines().find_map(|line| {
      let token_index = line.split_whitespace().position(|token| token == name)?;
      let char_offset = line.find(name)?;

      Some(Self {
        token_index,
        char_offset,
      })
    })
  }
}

pub trait Scheduler: std::fmt::Debug + Send + Sync {
  /// Human readable scheduler family name.
  fn name(&self) -> &'static str;

  /// Status listing program.
  fn program(&self) -> &str;

  /// Arguments scoping the status listing to `user`.
  fn status_args(&self, user: &str) -> Vec<String>;

  /// Arguments for the listing shown below the summary, when it differs from
  /// the status invocation. `None` reuses the status output.
  fn listing_args(&self, _user: &str) -> Option<Vec<String>> {
    None
  }

  /// Token index of the status code in a row.
  fn status_column(&self) -> usize;

  /// Recognised status codes, in display order.
  fn status_codes(&self) -> &'static [StatusCode];

  /// Locates the array-range column from the listing header.
  ///
  /// `None` disables array counting for the cycle.
  fn locate_array_column(&self, raw: &str) -> Option<ArrayColumn>;

  /// Number of array sub-tasks a pending row stands for, if it is an array row.
  fn array_tasks(&self, column: &ArrayColumn, line: &str, tokens: &[&str]) -> Option<u64>;

  fn status_code(&self, token: &str) -> Option<&'static StatusCode> {
    self.status_codes().iter().find(|status| status.code == token)
  }
}

/// Counts the tasks in `low-high:step` (or `low-high`, step 1).
///
/// Returns `None` for anything that is not a well-formed ascending range.
pub fn parse_task_range(range: &str) -> Option<u64> {
  let (bounds, step) = match range.split_once(':') {
    Some((bounds, step)) => (bounds, step.parse::<u64>().ok()?),
    None => (range, 1),
  };
  let (low, high) = bounds.split_once('-')?;
  let low = low.parse::<u64>().ok()?;
  let high = high.parse::<u64>().ok()?;

  if step == 0 {
    return None;
  }

  high.checked_sub(low)?.checked_div(step)?.checked_add(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
  /// Use whichever of squeue or qstat is on PATH
  #[default]
  Auto,
  /// Sun/Univa/Son of Grid Engine (qstat)
  GridEngine,
  /// SLURM (squeue)
  Slurm,
}

/// Program path overrides from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramOverrides {
  pub grid_engine: Option<String>,
  pub slurm: Option<String>,
}

pub fn build_scheduler(
  kind: SchedulerKind,
  overrides: &ProgramOverrides,
) -> Result<Box<dyn Scheduler>> {
  let kind = match kind {
    SchedulerKind::Auto => detect_scheduler(overrides)?,
    other => other,
  };

  let scheduler: Box<dyn Scheduler> = match kind {
    SchedulerKind::Slurm => match &overrides.slurm {
      Some(program) => Box::new(Slurm::with_program(program)),
      None => Box::new(Slurm::new()),
    },
    _ => match &overrides.grid_engine {
      Some(program) => Box::new(GridEngine::with_program(program)),
      None => Box::new(GridEngine::new()),
    },
  };

  tracing::debug!(
    scheduler = scheduler.name(),
    program = scheduler.program(),
    "scheduler selected"
  );

  Ok(scheduler)
}

fn detect_scheduler(overrides: &ProgramOverrides) -> Result<SchedulerKind> {
  let candidates = [
    (
      overrides.slurm.as_deref().unwrap_or(Slurm::PROGRAM),
      SchedulerKind::Slurm,
    ),
    (
      overrides
        .grid_engine
        .as_deref()
        .unwrap_or(GridEngine::PROGRAM),
      SchedulerKind::GridEngine,
    ),
  ];

  for (program, kind) in candidates {
    if which::which(program).is_ok() {
      return Ok(kind);
    }
  }

  Err(AppError::SchedulerNotFound {
    checked: candidates
      .iter()
      .map(|(program, _)| program.to_string())
      .collect(),
  })
}
