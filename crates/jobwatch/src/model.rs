use crate::poller::CycleReport;
use crate::render::format_timestamp;
use crate::scheduler::Scheduler;
use crate::status::{StatusClass, StatusDisplay};
use ratatui::style::Color;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
  pub code: &'static str,
  pub label: &'static str,
  pub symbol: &'static str,
  pub color: Color,
  pub count: usize,
}

/// Everything one frame shows, detached from the poller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryModel {
  pub timestamp: String,
  pub scheduler: &'static str,
  pub user: String,
  pub statuses: Vec<StatusLine>,
  pub running: usize,
  pub pending: usize,
  pub array_tasks: u64,
  pub queued_total: u64,
  pub total: u64,
  pub error: Option<String>,
  pub listing: String,
}

impl SummaryModel {
  pub fn from_report(report: &CycleReport, scheduler: &dyn Scheduler, user: &str) -> Self {
    let mut model = SummaryModel {
      timestamp: format_timestamp(&report.taken_at),
      scheduler: scheduler.name(),
      user: user.to_string(),
      ..Default::default()
    };

    let snapshot = match &report.outcome {
      Ok(snapshot) => snapshot,
      Err(message) => {
        model.error = Some(message.clone());
        return model;
      }
    };
    let counters = &snapshot.counters;

    // Running and pending lines are always shown, the rest only when present.
    model.statuses = scheduler
      .status_codes()
      .iter()
      .filter_map(|status| {
        let count = counters.count(status.code);
        let always = matches!(status.class, StatusClass::Running | StatusClass::Pending);
        if count == 0 && !always {
          return None;
        }
        let (symbol, color) = status.class.colored();
        Some(StatusLine {
          code: status.code,
          label: status.label,
          symbol,
          color,
          count,
        })
      })
      .collect();

    model.running = counters.running();
    model.pending = counters.pending();
    model.array_tasks = counters.array_tasks;
    model.queued_total = counters.queued_total();
    model.total = counters.total();
    model.listing = snapshot.listing.clone();

    model
  }
}
