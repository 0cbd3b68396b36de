use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

use crate::command::ExitCode;

/// Mutable view of the process state the shell works against.
///
/// The environment contains:
/// - `vars`: environment variables visible to lookups (`PATH`, `HOME`) and to
///   launched programs.
/// - `current_dir`: the working directory for `pwd`, `cd` and child processes.
///   The process-wide working directory is never changed.
/// - `should_exit` / `exit_status`: set by the `exit` builtin; the REPL stops
///   and the shell terminates with `exit_status`.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, the interactive loop stops after the current command.
    pub should_exit: bool,
    /// Status the shell terminates with once `should_exit` is set.
    pub exit_status: ExitCode,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// Variables that are not valid Unicode are skipped.
    pub fn new() -> Self {
        let vars = stdenv::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(vars, current_dir)
    }

    /// Build an environment from explicit parts, detached from the process.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            should_exit: false,
            exit_status: 0,
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override an environment variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Ask the interactive loop to stop and the shell to exit with `status`.
    pub fn request_exit(&mut self, status: ExitCode) {
        self.should_exit = true;
        self.exit_status = status;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
