use super::{ArrayColumn, Scheduler, StatusCode, parse_task_range};
use crate::status::StatusClass;

const STATUS_CODES: &[StatusCode] = &[
  StatusCode::new("R", "running", StatusClass::Running),
  StatusCode::new("CF", "configuring", StatusClass::Transferring),
  StatusCode::new("PD", "pending", StatusClass::Pending),
  StatusCode::new("RQ", "requeued", StatusClass::Pending),
  StatusCode::new("RH", "requeue held", StatusClass::Held),
  StatusCode::new("S", "suspended", StatusClass::Suspended),
  StatusCode::new("ST", "stopped", StatusClass::Suspended),
  StatusCode::new("CG", "completing", StatusClass::Completing),
  StatusCode::new("F", "failed", StatusClass::Error),
  StatusCode::new("NF", "node fail", StatusClass::Error),
  StatusCode::new("OOM", "out of memory", StatusClass::Error),
  StatusCode::new("TO", "timeout", StatusClass::Error),
  StatusCode::new("BF", "boot fail", StatusClass::Error),
];

/// SLURM `squeue` listing.
///
/// ```text
///              JOBID PARTITION     NAME     USER ST       TIME  NODES NODELIST(REASON)
///     812_[4-10%2]  mem_0064      sim    alice PD       0:00      1 (JobArrayTaskLimit)
///              812_3  mem_0064      sim    alice  R       1:02      1 n001
/// ```
///
/// `JOBID` is the first column, so it is read by token index.
#[derive(Debug, Clone)]
pub struct Slurm {
  program: String,
}

impl Slurm {
  pub const PROGRAM: &'static str = "squeue";
  const ARRAY_HEADER: &'static str = "JOBID";

  pub fn new() -> Self {
    Self::with_program(Self::PROGRAM)
  }

  pub fn with_program(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
    }
  }
}

impl Default for Slurm {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler for Slurm {
  fn name(&self) -> &'static str {
    "SLURM"
  }

  fn program(&self) -> &str {
    &self.program
  }

  fn status_args(&self, user: &str) -> Vec<String> {
    vec!["-u".to_string(), user.to_string()]
  }

  fn listing_args(&self, user: &str) -> Option<Vec<String>> {
    Some(vec!["-u".to_string(), user.to_string(), "--long".to_string()])
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

  fn array_tasks(&self, column: &ArrayColumn, _line: &str, tokens: &[&str]) -> Option<u64> {
    tokens.get(column.token_index).and_then(|id| count_array_tasks(id))
  }
}

/// Counts the tasks of a pending array job id such as `812_[1-10:2%4]`.
///
/// The bracket holds a comma separated list of single indices and ranges; a
/// trailing `%limit` only throttles concurrency and does not change the count.
fn count_array_tasks(job_id: &str) -> Option<u64> {
  let (_, spec) = job_id.split_once("_[")?;
  let spec = spec.strip_suffix(']')?;
  let spec = spec.split_once('%').map_or(spec, |(tasks, _)| tasks);

  spec.split(',').try_fold(0u64, |total, item| {
    let tasks = if item.contains('-') {
      parse_task_range(item)?
    } else {
      item.parse::<u64>().ok().map(|_| 1)?
    };
    total.checked_add(tasks)
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counts_stepped_range_with_limit() {
    assert_eq!(count_array_tasks("123_[1-10:2%4]"), Some(5));
  }

  #[test]
  fn counts_mixed_list() {
    assert_eq!(count_array_tasks("77_[1,3,5-7]"), Some(5));
  }

  #[test]
  fn plain_and_running_task_ids_are_not_arrays() {
    assert_eq!(count_array_tasks("123"), None);
    assert_eq!(count_array_tasks("123_4"), None);
    assert_eq!(count_array_tasks("123_[x-y]"), None);
  }

  #[test]
  fn reads_job_id_column_by_token_index() {
    let scheduler = Slurm::new();
    let raw = "  JOBID PARTITION NAME USER ST TIME NODES NODELIST(REASON)\n";
    let column = scheduler.locate_array_column(raw).unwrap();
    let line = "  812_[4-10%2] mem_0064 sim alice PD 0:00 1 (JobArrayTaskLimit)";
    let tokens: Vec<&str> = line.split_whitespace().collect();

    assert_eq!(column.token_index, 0);
    assert_eq!(scheduler.array_tasks(&column, line, &tokens), Some(7));
  }

  #[test]
  fn listing_uses_long_format() {
    let args = Slurm::new().listing_args("alice").unwrap();
    assert_eq!(args, vec!["-u", "alice", "--long"]);
  }
}
