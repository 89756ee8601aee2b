use crate::scheduler::Scheduler;
use crate::status::StatusClass;
use std::collections::BTreeMap;

/// Per-status job counts for one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
  counts: BTreeMap<&'static str, usize>,
  class_counts: BTreeMap<StatusClass, usize>,
  /// Sub-tasks of pending array jobs, counted instead of their rows.
  pub array_tasks: u64,
}

impl Counters {
  pub fn count(&self, code: &str) -> usize {
    self.counts.get(code).copied().unwrap_or(0)
  }

  pub fn class_total(&self, class: StatusClass) -> usize {
    self.class_counts.get(&class).copied().unwrap_or(0)
  }

  pub fn running(&self) -> usize {
    self.class_total(StatusClass::Running)
  }

  pub fn pending(&self) -> usize {
    self.class_total(StatusClass::Pending)
  }

  /// Pending rows plus pending array sub-tasks.
  pub fn queued_total(&self) -> u64 {
    self.pending() as u64 + self.array_tasks
  }

  /// Every recognised job, array sub-tasks included.
  pub fn total(&self) -> u64 {
    self.counts.values().map(|count| *count as u64).sum::<u64>() + self.array_tasks
  }

  fn record(&mut self, code: &'static str, class: StatusClass) {
    *self.counts.entry(code).or_insert(0) += 1;
    *self.class_counts.entry(class).or_insert(0) += 1;
  }
}

/// Rows of `raw` that mention `user`, split into tokens.
pub fn user_rows<'a>(raw: &'a str, user: &str) -> Vec<(&'a str, Vec<&'a str>)> {
  raw
    .lines()
    .filter(|line| !user.is_empty() && line.contains(user))
    .map(|line| (line, line.split_whitespace().collect()))
    .collect()
}

/// Counts the jobs of `user` in one status listing.
pub fn tally(scheduler: &dyn Scheduler, raw: &str, user: &str) -> Counters {
  let mut counters = Counters::default();
  let array_column = scheduler.locate_array_column(raw);
  let status_column = scheduler.status_column();

  if array_column.is_none() {
    tracing::debug!(
      scheduler = scheduler.name(),
      "array header not found, array tasks not counted"
    );
  }

  for (line, tokens) in user_rows(raw, user) {
    let Some(token) = tokens.get(status_column) else {
      continue;
    };
    let Some(status) = scheduler.status_code(token) else {
      continue;
    };

    if status.class == StatusClass::Pending {
      let tasks = array_column
        .as_ref()
        .and_then(|column| scheduler.array_tasks(column, line, &tokens));

      if let Some(tasks) = tasks {
        counters.array_tasks += tasks;
        continue;
      }
    }

    counters.record(status.code, status.class);
  }

  counters
}
