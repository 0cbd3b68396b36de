use crate::env::Environment;
use crate::io_adapters::InheritedStdin;
use anyhow::Result;
use std::io::{Read, Write};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Exit code reported when a command name resolves to nothing.
pub const NOT_FOUND_CODE: ExitCode = 127;

/// Exit code reported when a resolved program cannot be launched.
pub const CANNOT_EXECUTE_CODE: ExitCode = 126;

/// Abstraction over a readable input stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Read` and `Into<Stdio>`.
pub trait Stdin: Read {
    /// Convert this input into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Write` and
/// `Into<Stdio>` (e.g. `std::io::Stdout` or `std::io::Stderr`).
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// The three standard streams handed to a command for one invocation.
pub struct Streams {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
    pub stderr: Box<dyn Stdout>,
}

impl Streams {
    /// Streams bound to the shell's own stdin, stdout and stderr.
    pub fn inherited() -> Self {
        Self {
            stdin: Box::new(InheritedStdin::new()),
            stdout: Box::new(std::io::stdout()),
            stderr: Box::new(std::io::stderr()),
        }
    }
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// Implemented by builtins through a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command to completion and returns its exit code.
    ///
    /// User-facing failures are reported on the provided streams and turned into
    /// a non-zero code; `Err` is reserved for failures of the streams themselves.
    fn execute(self: Box<Self>, streams: Streams, env: &mut Environment) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
/// Implementations can use the environment to resolve executables (e.g. using PATH).
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
