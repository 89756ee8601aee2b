use crate::error::Result;
use crate::runner::{CommandRunner, Invocation};
use crate::scheduler::Scheduler;
use crate::tally::{Counters, tally};
use chrono::{DateTime, Local};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What one successful cycle observed.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub counters: Counters,
  /// Raw listing shown below the summary, verbatim.
  pub listing: String,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
  pub taken_at: DateTime<Local>,
  /// Failures are kept as their message; the next cycle starts from scratch.
  pub outcome: std::result::Result<Snapshot, String>,
}

pub struct Poller<R> {
  scheduler: Box<dyn Scheduler>,
  runner: R,
  user: String,
  interval: Duration,
}

impl<R: CommandRunner> Poller<R> {
  pub fn new(
    scheduler: Box<dyn Scheduler>,
    runner: R,
    user: impl Into<String>,
    interval: Duration,
  ) -> Self {
    Self {
      scheduler,
      runner,
      user: user.into(),
      interval,
    }
  }

  pub fn scheduler(&self) -> &dyn Scheduler {
    self.scheduler.as_ref()
  }

  pub fn user(&self) -> &str {
    &self.user
  }

  pub fn interval(&self) -> Duration {
    self.interval
  }

  /// Runs one cycle. Never fails: errors end up in [`CycleReport::outcome`].
  pub async fn poll_once(&self) -> CycleReport {
    let taken_at = Local::now();
    let outcome = self.snapshot().await.map_err(|e| {
      tracing::warn!(scheduler = self.scheduler.name(), error = %e, "poll cycle failed");
      e.to_string()
    });

    CycleReport { taken_at, outcome }
  }

  /// Polls until `shutdown` is cancelled, handing every report to `on_cycle`.
  ///
  /// Cancellation is observed between cycles; a command already running is
  /// awaited to completion.
  pub async fn run<F>(&self, shutdown: &CancellationToken, mut on_cycle: F) -> Result<()>
  where
    F: FnMut(&CycleReport) -> Result<()>,
  {
    while !shutdown.is_cancelled() {
      let report = self.poll_once().await;
      on_cycle(&report)?;

      tokio::select! {
        _ = shutdown.cancelled() => break,
        _ = tokio::time::sleep(self.interval) => {}
      }
    }

    tracing::info!("poller stopped");
    Ok(())
  }

  async fn snapshot(&self) -> Result<Snapshot> {
    let program = self.scheduler.program();
    let status = Invocation::new(program, self.scheduler.status_args(&self.user));
    let raw = self.runner.run(&status).await?;
    let counters = tally(self.scheduler.as_ref(), &raw, &self.user);

    let listing = match self.scheduler.listing_args(&self.user) {
      Some(args) => {
        let invocation = Invocation::new(program, args);
        match self.runner.run(&invocation).await {
          Ok(listing) => listing,
          Err(e) => {
            tracing::warn!(%invocation, error = %e, "listing failed");
            format!("{invocation}: {e}")
          }
        }
      }
      None => raw,
    };

    Ok(Snapshot { counters, listing })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::AppError;
  use crate::runner::mock::MockRunner;
  use crate::scheduler::{GridEngine, Slurm};

  const QSTAT: &str = "\
job-ID  prior   name       user         state submit/start at     queue                          slots ja-task-ID
-----------------------------------------------------------------------------------------------------------------
 431765 0.55500 sim        alice        r     01/12/2024 10:01:02 all.q@node01                       1 3
 431765 0.00000 sim        alice        qw    01/12/2024 10:00:58                                    1 4-10:1
";

  fn not_found() -> AppError {
    AppError::CommandNotFound {
      command: "qstat".to_string(),
      reason: "cannot find binary path".to_string(),
    }
  }

  #[tokio::test]
  async fn poll_once_counts_status_output() {
    let runner = MockRunner::with_responses(vec![Ok(QSTAT.to_string())]);
    let poller = Poller::new(
      Box::new(GridEngine::new()),
      runner,
      "alice",
      Duration::from_secs(5),
    );

    let report = poller.poll_once().await;
    let snapshot = report.outcome.unwrap();

    assert_eq!(snapshot.counters.running(), 1);
    assert_eq!(snapshot.counters.array_tasks, 7);
    assert_eq!(snapshot.listing, QSTAT);
    assert_eq!(
      poller.runner.invocations(),
      vec![Invocation::new(
        "qstat",
        vec!["-u".to_string(), "alice".to_string()]
      )]
    );
  }

  #[tokio::test]
  async fn slurm_listing_is_fetched_separately() {
    let runner = MockRunner::with_responses(vec![
      Ok("JOBID PARTITION NAME USER ST\n 1 p sim alice R\n".to_string()),
      Ok("long listing".to_string()),
    ]);
    let poller = Poller::new(Box::new(Slurm::new()), runner, "alice", Duration::from_secs(5));

    let snapshot = poller.poll_once().await.outcome.unwrap();

    assert_eq!(snapshot.counters.running(), 1);
    assert_eq!(snapshot.listing, "long listing");
    assert_eq!(poller.runner.invocations().len(), 2);
  }

  #[tokio::test]
  async fn failed_listing_keeps_counters() {
    let runner = MockRunner::with_responses(vec![
      Ok("JOBID PARTITION NAME USER ST\n 1 p sim alice PD\n".to_string()),
      Err(not_found()),
    ]);
    let poller = Poller::new(Box::new(Slurm::new()), runner, "alice", Duration::from_secs(5));

    let snapshot = poller.poll_once().await.outcome.unwrap();

    assert_eq!(snapshot.counters.pending(), 1);
    assert!(snapshot.listing.contains("squeue -u alice --long"));
  }

  #[tokio::test]
  async fn command_failure_is_reported_not_raised() {
    let runner = MockRunner::with_responses(vec![Err(not_found())]);
    let poller = Poller::new(
      Box::new(GridEngine::new()),
      runner,
      "alice",
      Duration::from_secs(5),
    );

    let report = poller.poll_once().await;
    assert!(report.outcome.unwrap_err().contains("qstat"));
  }

  #[tokio::test(start_paused = true)]
  async fn loop_survives_failed_cycle() {
    let interval = Duration::from_secs(5);
    let runner = MockRunner::with_responses(vec![Err(not_found()), Ok(QSTAT.to_string())]);
    let poller = Poller::new(Box::new(GridEngine::new()), runner, "alice", interval);
    let shutdown = CancellationToken::new();
    let start = tokio::time::Instant::now();
    let mut reports = Vec::new();

    poller
      .run(&shutdown, |report| {
        reports.push((tokio::time::Instant::now(), report.clone()));
        if reports.len() == 2 {
          shutdown.cancel();
        }
        Ok(())
      })
      .await
      .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports[0].1.outcome.is_err());
    assert_eq!(reports[1].1.outcome.as_ref().unwrap().counters.running(), 1);
    assert!(reports[1].0 - start >= interval);
  }

  #[tokio::test]
  async fn cancelled_token_stops_before_first_cycle() {
    let runner = MockRunner::with_responses(vec![]);
    let poller = Poller::new(
      Box::new(GridEngine::new()),
      runner,
      "alice",
      Duration::from_secs(5),
    );
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let mut cycles = 0;
    poller
      .run(&shutdown, |_| {
        cycles += 1;
        Ok(())
      })
      .await
      .unwrap();

    assert_eq!(cycles, 0);
    assert!(poller.runner.invocations().is_empty());
  }
}
