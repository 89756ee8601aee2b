use crate::error::Result;
use crate::model::SummaryModel;
use crate::poller::Poller;
use crate::render::render_frame;
use crate::runner::CommandRunner;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub struct App<R> {
  poller: Poller<R>,
  /// Listing cap; `None` fills the terminal.
  lines: Option<usize>,
  shutdown: CancellationToken,
}

impl<R: CommandRunner> App<R> {
  /// Construct a new instance of [`App`].
  pub fn new(poller: Poller<R>, lines: Option<usize>, shutdown: CancellationToken) -> Self {
    Self {
      poller,
      lines,
      shutdown,
    }
  }

  /// Run the application's main loop until a quit key or signal.
  pub async fn run(self) -> Result<()> {
    let mut terminal = ratatui::init();

    let poll = async {
      let result = self
        .poller
        .run(&self.shutdown, |report| {
          let model =
            SummaryModel::from_report(report, self.poller.scheduler(), self.poller.user());
          terminal.draw(|frame| render_frame(frame, &model, self.lines))?;
          Ok(())
        })
        .await;
      // Stops the key reader when the poller bailed out on its own.
      self.shutdown.cancel();
      result
    };
    let (result, ()) = tokio::join!(poll, self.handle_crossterm_events());

    ratatui::restore();
    result
  }

  /// Reads crossterm events until shutdown. The terminal is in raw mode, so
  /// Ctrl-C arrives here as a key instead of a signal.
  async fn handle_crossterm_events(&self) {
    let mut events = EventStream::new();

    loop {
      tokio::select! {
        biased;
        _ = self.shutdown.cancelled() => break,
        event = events.next() => match event {
          Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => self.on_key_event(key),
          Some(Ok(_)) => {}
          Some(Err(e)) => {
            tracing::warn!(error = %e, "terminal event stream failed");
            self.quit();
          }
          None => self.quit(),
        },
      }
    }
  }

  /// Handles the key events and updates the state of [`App`].
  fn on_key_event(&self, key: KeyEvent) {
    if is_quit_key(&key) {
      self.quit();
    }
  }

  /// Cancel the shutdown token to quit the application.
  fn quit(&self) {
    tracing::info!("quit requested");
    self.shutdown.cancel();
  }
}

pub fn is_quit_key(key: &KeyEvent) -> bool {
  matches!(
    (key.modifiers, key.code),
    (_, KeyCode::Esc | KeyCode::Char('q'))
      | (KeyModifiers::CONTROL, KeyCode::Char('c') | KeyCode::Char('C'))
  )
}
