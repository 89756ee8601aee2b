//! Command runner abstraction for the external scheduler tools.
//!
//! `CommandRunner` is the seam the poller executes through. `ProcessRunner`
//! is the production implementation backed by `tokio::process`.

use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
}

impl Invocation {
  pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      args,
    }
  }
}

impl std::fmt::Display for Invocation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.program)?;
    for arg in &self.args {
      write!(f, " {}", arg)?;
    }
    Ok(())
  }
}

#[allow(async_fn_in_trait)]
pub trait CommandRunner {
  /// Runs the invocation to completion and returns its standard output.
  async fn run(&self, invocation: &Invocation) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
  timeout: Option<Duration>,
}

impl ProcessRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bounds every command by `timeout`; the child is killed when it expires.
  pub fn with_timeout(timeout: Option<Duration>) -> Self {
    Self { timeout }
  }

  /// Runs the invocation feeding `input` on its standard input.
  pub async fn run_with_input(&self, invocation: &Invocation, input: &str) -> Result<String> {
    let mut child = Self::command(invocation)?
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
      stdin.write_all(input.as_bytes()).await?;
      // Closing stdin lets the child see EOF.
      drop(stdin);
    }

    let output = self.wait(child.wait_with_output()).await?;
    Self::check(invocation, output)
  }

  fn resolve(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|e| AppError::CommandNotFound {
      command: program.to_string(),
      reason: e.to_string(),
    })
  }

  fn command(invocation: &Invocation) -> Result<Command> {
    let mut command = Command::new(Self::resolve(&invocation.program)?);
    command.args(&invocation.args).kill_on_drop(true);
    Ok(command)
  }

  async fn wait(
    &self,
    output: impl Future<Output = std::io::Result<Output>>,
  ) -> Result<Output> {
    match self.timeout {
      Some(limit) => Ok(tokio::time::timeout(limit, output).await??),
      None => Ok(output.await?),
    }
  }

  fn check(invocation: &Invocation, output: Output) -> Result<String> {
    if output.status.success() {
      return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    Err(AppError::CommandFailed {
      command: invocation.to_string(),
      status: output.status.to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
  }
}

impl CommandRunner for ProcessRunner {
  async fn run(&self, invocation: &Invocation) -> Result<String> {
    let mut command = Self::command(invocation)?;
    command.stdin(Stdio::null());

    tracing::trace!(%invocation, "running");
    let output = self.wait(command.output()).await?;
    Self::check(invocation, output)
  }
}
