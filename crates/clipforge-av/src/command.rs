//! Built commands for the external binaries.
//!
//! A [`Command`] is the output of the command builder: the resolved program
//! path followed by an ordered argument list, with the declared output path
//! (if any) recorded alongside. It is immutable once built, derived
//! deterministically from a tool id and a parameter set, and never persisted.
//! Execution lives in [`crate::exec`]; this type is pure data.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// An ordered argv for an external tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    program: PathBuf,
    args: Vec<String>,
    /// Destination path, when the tool writes one. Always the final argv
    /// element for such tools.
    output: Option<PathBuf>,
}

impl Command {
    /// Start a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Append the output path as the final argument and record it.
    pub fn output_arg(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        let path = path.into();
        self.args.push(path.to_string_lossy().into_owned());
        self.output = Some(path);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Short program name used in diagnostics (e.g. "ffmpeg").
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    pub fn arg_slice(&self) -> &[String] {
        &self.args
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Full argv: program followed by every argument.
    pub fn argv(&self) -> Vec<String> {
        let mut v = Vec::with_capacity(self.args.len() + 1);
        v.push(self.program.to_string_lossy().into_owned());
        v.extend(self.args.iter().cloned());
        v
    }

    /// Shell-style preview string for log panes and `run` output. Arguments
    /// containing whitespace are single-quoted.
    pub fn display(&self) -> String {
        self.argv()
            .into_iter()
            .map(|a| {
                if a.contains(char::is_whitespace) || a.is_empty() {
                    format!("'{a}'")
                } else {
                    a
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Copy of this command with `-progress pipe:2 -nostats` prepended, so
    /// the runner can read the machine-readable progress stream instead of
    /// parsing interactive log output. Global flags, so position relative to
    /// the rest of the argv does not matter.
    pub fn with_progress_stream(&self) -> Command {
        let mut cmd = self.clone();
        let mut args = vec![
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ];
        args.append(&mut cmd.args);
        cmd.args = args;
        cmd
    }
}
