use crate::model::SummaryModel;
use chrono::{DateTime, TimeZone};
use ratatui::{
  Frame,
  prelude::*,
  widgets::{Block, Borders, Paragraph},
};
use std::fmt::Write as _;

/// Rows the listing gets when no terminal tells us better.
pub const DEFAULT_LISTING_LINES: usize = 40;

/// `date`-style timestamp, independent of the locale.
pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
  Tz::Offset: std::fmt::Display,
{
  time.format("%a %b %e %H:%M:%S %Z %Y").to_string()
}

/// The first `limit` lines of the listing.
pub fn truncate_listing(listing: &str, limit: usize) -> Vec<&str> {
  listing.lines().take(limit).collect()
}

fn render_title(model: &SummaryModel) -> Paragraph<'_> {
  let title = format!(
    "{} | {} jobs for {}",
    model.timestamp, model.scheduler, model.user
  );

  Paragraph::new(title).style(Style::default().fg(Color::White))
}

fn totals_line(model: &SummaryModel) -> String {
  let mut totals = format!(
    "running: {}   queued: {}",
    model.running, model.queued_total
  );
  if model.array_tasks > 0 {
    let _ = write!(
      totals,
      " ({} pending + {} array tasks)",
      model.pending, model.array_tasks
    );
  }
  let _ = write!(totals, "   total: {}", model.total);
  totals
}

fn render_summary(model: &SummaryModel) -> Paragraph<'_> {
  let block = Block::default().borders(Borders::empty()).title("Summary");

  if let Some(error) = &model.error {
    return Paragraph::new(error.as_str())
      .block(block)
      .style(Style::default().fg(Color::Red));
  }

  let mut lines: Vec<Line> = model
    .statuses
    .iter()
    .map(|status| {
      Line::from(vec![
        Span::styled(
          format!("{} {:<16}", status.symbol, status.label),
          Style::default().fg(status.color),
        ),
        Span::raw(format!("{:>4} ({})", status.count, status.code)),
      ])
    })
    .collect();

  lines.push(Line::styled(
    totals_line(model),
    Style::default().fg(Color::Cyan),
  ));

  Paragraph::new(lines).block(block)
}

fn summary_height(model: &SummaryModel) -> u16 {
  let body = match model.error {
    Some(_) => 1,
    None => model.statuses.len() + 1,
  };
  // One extra row for the block title.
  (body + 1) as u16
}

fn render_listing(lines: Vec<&str>) -> Paragraph<'_> {
  let lines: Vec<Line> = lines.into_iter().map(Line::raw).collect();

  Paragraph::new(lines).block(Block::default().borders(Borders::empty()).title("Listing"))
}

/// Draws one frame. `limit` caps the listing; without it the listing fills
/// the rows left below the summary.
pub fn render_frame(frame: &mut Frame, model: &SummaryModel, limit: Option<usize>) {
  let areas = Layout::default()
    .direction(Direction::Vertical)
    .margin(1)
    .constraints([
      Constraint::Length(2),
      Constraint::Length(summary_height(model)),
      Constraint::Min(0),
    ])
    .split(frame.area());

  frame.render_widget(render_title(model), areas[0]);
  frame.render_widget(render_summary(model), areas[1]);

  if model.error.is_none() {
    let listing_block = Block::default().borders(Borders::empty()).title("Listing");
    let available = listing_block.inner(areas[2]).height as usize;
    let limit = limit.unwrap_or(available);

    frame.render_widget(
      render_listing(truncate_listing(&model.listing, limit)),
      areas[2],
    );
  }
}

/// Plain-text rendering of one cycle for non-interactive output.
pub fn render_plain(model: &SummaryModel, limit: usize) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{}", model.timestamp);
  let _ = writeln!(out, "{} jobs for {}", model.scheduler, model.user);
  let _ = writeln!(out);

  if let Some(error) = &model.error {
    let _ = writeln!(out, "error: {}", error);
    return out;
  }

  for status in &model.statuses {
    let _ = writeln!(
      out,
      "  {:<16}{:>4} ({})",
      status.label, status.count, status.code
    );
  }
  let _ = writeln!(out, "  {}", totals_line(model));
  let _ = writeln!(out);

  for line in truncate_listing(&model.listing, limit) {
    let _ = writeln!(out, "{}", line);
  }

  out
}
