use ratatui::prelude::*;

/// Coarse job state shared by every scheduler's status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusClass {
  Running,
  Pending,
  Held,
  Transferring,
  Suspended,
  Completing,
  Error,
}

impl std::fmt::Display for StatusClass {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      StatusClass::Running => write!(f, "Running"),
      StatusClass::Pending => write!(f, "Pending"),
      StatusClass::Held => write!(f, "Held"),
      StatusClass::Transferring => write!(f, "Transferring"),
      StatusClass::Suspended => write!(f, "Suspended"),
      StatusClass::Completing => write!(f, "Completing"),
      StatusClass::Error => write!(f, "Error"),
    }
  }
}

pub trait StatusDisplay {
  fn colored(&self) -> (&'static str, Color);
}

impl StatusDisplay for StatusClass {
  fn colored(&self) -> (&'static str, Color) {
    match self {
      StatusClass::Running => ("⟳", Color::Green),
      StatusClass::Pending => ("⏳", Color::Yellow),
      StatusClass::Held => ("⏸", Color::Gray),
      StatusClass::Transferring => ("⇄", Color::Cyan),
      StatusClass::Suspended => ("⏸", Color::Magenta),
      StatusClass::Completing => ("✓", Color::Blue),
      StatusClass::Error => ("✗", Color::Red),
    }
  }
}
