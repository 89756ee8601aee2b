use super::{ArrayColumn, Scheduler, StatusCode, parse_task_range};
use crate::status::StatusClass;

const STATUS_CODES: &[StatusCode] = &[
  StatusCode::new("r", "running", StatusClass::Running),
  StatusCode::new("Rr", "restarted", StatusClass::Running),
  StatusCode::new("t", "transferring", StatusClass::Transferring),
  StatusCode::new("qw", "queued", StatusClass::Pending),
  StatusCode::new("Rq", "requeued", StatusClass::Pending),
  StatusCode::new("hqw", "on hold", StatusClass::Held),
  StatusCode::new("s", "suspended", StatusClass::Suspended),
  StatusCode::new("S", "queue suspended", StatusClass::Suspended),
  StatusCode::new("dr", "deleting", StatusClass::Completing),
  StatusCode::new("Eqw", "error", StatusClass::Error),
];

/// Grid Engine `qstat` listing.
///
/// ```text
/// job-ID  prior   name       user         state submit/start at     queue                          slots ja-task-ID
/// -----------------------------------------------------------------------------------------------------------------
///  431765 0.55500 sim        alice        r     01/12/2024 10:01:02 all.q@node01                       1 3
///  431765 0.00000 sim        alice        qw    01/12/2024 10:00:58                                    1 4-10:1
/// ```
///
/// Pending rows leave the queue column blank, so the task column is found by
/// character offset under its header rather than by token index.
#[derive(Debug, Clone)]
pub struct GridEngine {
  program: String,
}

impl GridEngine {
  pub const PROGRAM: &'static str = "qstat";
  const ARRAY_HEADER: &'static str = "ja-task-ID";

  pub fn new() -> Self {
    Self::with_program(Self::PROGRAM)
  }

  pub fn with_program(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }
}

impl Default for GridEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler for GridEngine {
  fn name(&self) -> &'static str {
    "Grid Engine"
  }

  fn program(&self) -> &str {
    &self.program
  }

  fn status_args(&self, user: &str) -> Vec<String> {
    vec!["-u".to_string(), user.to_string()]
  }

  fn status_column(&self) -> usize {
    4
  }

  fn status_codes(&self) -> &'static [StatusCode] {
    STATUS_CODES
  }

  fn locate_array_column(&self, raw: &str) -> Option<ArrayColumn> {
    ArrayColumn::locate(raw, Self::ARRAY_HEADER)
  }

  fn array_tasks(&self, column: &ArrayColumn, line: &str, _tokens: &[&str]) -> Option<u64> {
    let cell = line.get(column.char_offset..)?.split_whitespace().next()?;
    parse_task_range(cell)
  }
}
