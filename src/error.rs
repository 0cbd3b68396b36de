//! User-facing failures of the shell.
//!
//! Every variant is reported where it is detected and never stops the
//! interactive loop. Terminating the shell is not an error; see
//! [`Environment::request_exit`](crate::env::Environment::request_exit).

use crate::command::{CANNOT_EXECUTE_CODE, ExitCode, NOT_FOUND_CODE};
use std::io::{self, Write};

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// A builtin was invoked with missing arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Neither a builtin nor an executable on PATH matches the name.
    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// `type` could not find the name anywhere.
    #[error("{0}: not found")]
    NotFound(String),

    /// `cd` target is missing, not a directory or not accessible.
    #[error("cd: {0}: No such file or directory")]
    NoSuchDirectory(String),

    /// The program was resolved but could not be started.
    #[error("sh: {command}: Operation failed: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ShellError {
    /// Status the failed command reports.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ShellError::Usage(_) | ShellError::NotFound(_) | ShellError::NoSuchDirectory(_) => 1,
            ShellError::CommandNotFound(_) => NOT_FOUND_CODE,
            ShellError::Launch { .. } => CANNOT_EXECUTE_CODE,
        }
    }

    /// Whether the message belongs on stdout rather than stderr.
    ///
    /// Usage hints and lookup misses are ordinary command output; filesystem
    /// and launch failures are diagnostics.
    pub fn is_output(&self) -> bool {
        matches!(
            self,
            ShellError::Usage(_) | ShellError::CommandNotFound(_) | ShellError::NotFound(_)
        )
    }

    /// Print the message on the stream it belongs to and return the exit code.
    pub fn report(&self, stdout: &mut dyn Write, stderr: &mut dyn Write) -> io::Result<ExitCode> {
        let out: &mut dyn Write = if self.is_output() { stdout } else { stderr };
        writeln!(out, "{}", self)?;
        out.flush()?;
        Ok(self.exit_code())
    }
}
