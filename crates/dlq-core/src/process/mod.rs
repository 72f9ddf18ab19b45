//! External tool execution: resolve, spawn, stream output, stop on cancel.

mod args;
mod lines;
mod resolve;
mod terminate;

use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::DlqConfig;
use crate::error::ExecError;

pub use args::compose_args;
pub use lines::{OutputLine, Stream};
pub use resolve::resolve_program;

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// The cancel token fired (cancel, pause or shutdown).
    Cancelled,
}

/// Raw result of a format listing.
#[derive(Debug, Clone, Serialize)]
pub struct FormatListing {
    /// Stdout followed by stderr.
    pub output: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Spawns the tool with the configured defaults and environment.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    cfg: DlqConfig,
    default_args: Vec<String>,
}

impl ToolRunner {
    /// Directories are made absolute here: the tool runs with the download dir
    /// as its cwd, so relative paths in its env and args would resolve wrongly.
    pub fn new(cfg: &DlqConfig) -> Self {
        let mut cfg = cfg.clone();
        cfg.download_dir = absolute_or_same(cfg.download_dir);
        cfg.config_dir = absolute_or_same(cfg.config_dir);
        Self {
            default_args: cfg.effective_default_args(),
            cfg,
        }
    }

    pub fn download_dir(&self) -> &std::path::Path {
        &self.cfg.download_dir
    }

    /// Argument list for one job run.
    pub fn compose(&self, job_args: &[String], target: &str) -> Vec<String> {
        compose_args(&self.default_args, job_args, target)
    }

    /// Resolves the tool (and interpreter) and prepares a command with the tool environment.
    fn command(&self, args: &[String]) -> Result<(Command, String), ExecError> {
        let tool = resolve_program(&self.cfg.tool_path)?;
        let (mut cmd, program) = match &self.cfg.interpreter {
            Some(interpreter) => {
                let interpreter = resolve_program(interpreter)?;
                let program = format!("{} {}", interpreter.display(), tool.display());
                let mut cmd = Command::new(interpreter);
                cmd.arg(&tool);
                (cmd, program)
            }
            None => {
                let program = tool.display().to_string();
                (Command::new(tool), program)
            }
        };
        if let Err(e) = self.cfg.ensure_dirs() {
            tracing::warn!("{:#}", e);
        }
        let cache: PathBuf = self.cfg.cache_dir();
        cmd.args(args)
            .current_dir(&self.cfg.download_dir)
            .env("XDG_CACHE_HOME", &cache)
            .env("XDG_CONFIG_HOME", &self.cfg.config_dir)
            .env("HOME", &self.cfg.config_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        Ok((cmd, program))
    }

    /// Runs the tool for one job until it exits or `cancel` fires.
    ///
    /// `on_spawn` gets the OS pid once the process exists; `on_line` is called
    /// for every output line, in arrival order. A non-zero exit is an error;
    /// cancellation is not.
    pub async fn run<S, L>(
        &self,
        target: &str,
        job_args: &[String],
        cancel: &CancellationToken,
        on_spawn: S,
        mut on_line: L,
    ) -> Result<ExitOutcome, ExecError>
    where
        S: FnOnce(Option<u32>),
        L: FnMut(OutputLine),
    {
        if cancel.is_cancelled() {
            return Ok(ExitOutcome::Cancelled);
        }
        let args = self.compose(job_args, target);
        let (mut cmd, program) = self.command(&args)?;
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        tracing::info!(program = %program, ?args, "starting tool");

        let mut child = cmd
            .spawn()
            .map_err(|source| ExecError::Spawn { program, source })?;
        on_spawn(child.id());

        let stdout = child.stdout.take().ok_or(ExecError::Pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ExecError::Pipe("stderr"))?;
        let mut lines = lines::merge(stdout, stderr);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    drop(lines);
                    terminate::stop(&mut child, self.cfg.kill_grace()).await;
                    return Ok(ExitOutcome::Cancelled);
                }
                line = lines.recv() => match line {
                    Some(line) => {
                        tracing::trace!(stream = %line.stream, line = %line.text, "tool output");
                        on_line(line);
                    }
                    None => break,
                },
            }
        }

        // Pipes are closed but the process may still be finishing.
        let status = tokio::select! {
            status = child.wait() => status.map_err(ExecError::Wait)?,
            _ = cancel.cancelled() => {
                terminate::stop(&mut child, self.cfg.kill_grace()).await;
                return Ok(ExitOutcome::Cancelled);
            }
        };
        if cancel.is_cancelled() {
            return Ok(ExitOutcome::Cancelled);
        }
        if status.success() {
            Ok(ExitOutcome::Success)
        } else {
            Err(ExecError::Exit(status))
        }
    }

    /// Runs the tool in list-only mode (`-F --no-download`) for `target`,
    /// bounded by the configured timeout. Dropping the future kills the tool.
    pub async fn list_formats(&self, target: &str, extra_args: &[String]) -> FormatListing {
        let mut args: Vec<String> = ["--no-colors", "-F", "--no-download"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(extra_args.iter().cloned());
        args.push(target.to_string());

        let (mut cmd, program) = match self.command(&args) {
            Ok(c) => c,
            Err(e) => return FormatListing::failed(String::new(), e.to_string()),
        };
        let timeout = self.cfg.format_query_timeout();
        tracing::debug!(program = %program, ?args, "listing formats");
        match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(out)) => {
                let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
                output.push_str(&String::from_utf8_lossy(&out.stderr));
                if out.status.success() {
                    FormatListing {
                        output,
                        success: true,
                        error: None,
                    }
                } else {
                    FormatListing::failed(output, ExecError::Exit(out.status).to_string())
                }
            }
            Ok(Err(source)) => {
                FormatListing::failed(String::new(), ExecError::Spawn { program, source }.to_string())
            }
            Err(_) => FormatListing::failed(
                String::new(),
                format!("format listing timed out after {}", humanize(timeout)),
            ),
        }
    }
}

impl FormatListing {
    fn failed(output: String, error: String) -> Self {
        Self {
            output,
            success: false,
            error: Some(error),
        }
    }
}

fn absolute_or_same(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

fn humanize(d: Duration) -> String {
    format!("{}s", d.as_secs())
}
