use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use anyhow::Result;
use log::debug;
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Command that is not a builtin.
pub struct ExternalCommand {
    /// The name as typed; becomes `argv[0]` of the child.
    name: OsString,
    /// Where the executable was found.
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            name,
            program,
            args,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = find_command_path(
            OsStr::new(search_paths),
            &env.current_dir,
            Path::new(name),
        )?;
        debug!("resolved {} to {}", name, program.display());
        Some(Box::new(ExternalCommand::new(
            name.into(),
            program.into_owned(),
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, streams: Streams, env: &mut Environment) -> Result<ExitCode> {
        let Streams {
            stdin,
            mut stdout,
            mut stderr,
        } = streams;

        // Child stderr is always inherited; `stderr` is kept for launch failures.
        stdout.flush()?;
        let mut cmd = std::process::Command::new(&self.program);
        set_argv0(&mut cmd, &self.name);
        let launched = cmd
            .args(&self.args)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .stdin(stdin.stdio())
            .stdout(stdout.stdio())
            .spawn();
        let mut child = match launched {
            Ok(child) => child,
            Err(source) => {
                let err = ShellError::Launch {
                    command: self.name.to_string_lossy().into_owned(),
                    source,
                };
                debug!("{err}");
                return Ok(err.report(&mut std::io::sink(), &mut stderr)?);
            }
        };

        // The loop is suspended until the child is gone.
        let exit_status = child.wait()?;
        debug!("{} exited with {}", self.program.display(), exit_status);
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn set_argv0(cmd: &mut std::process::Command, name: &OsStr) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(name);
}

#[cfg(not(unix))]
fn set_argv0(_cmd: &mut std::process::Command, _name: &OsStr) {}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command name to an executable the way a typical shell would.
///
/// Behavior:
/// - Relative names (`ls`, `sub/tool`, `./tool`): each directory in
///   `search_paths` (PATH) is tried in order and the first `dir/name` that is
///   an executable file wins. The joined path is returned as-is.
/// - Absolute names (`/bin/ls`): the path itself is checked, PATH is not
///   consulted.
/// - Empty name: `None`.
///
/// Relative candidates are checked against `base_dir`, the shell's working
/// directory. Directories that are missing or unreadable are skipped.
pub fn find_command_path<'a>(
    search_paths: &OsStr,
    base_dir: &Path,
    path: &'a Path,
) -> Option<Cow<'a, Path>> {
    if path.as_os_str().is_empty() {
        None
    } else if path.is_absolute() {
        is_executable(base_dir, path).then_some(Cow::Borrowed(path))
    } else {
        find_in_path(search_paths, base_dir, path).map(Cow::Owned)
    }
}

fn find_in_path(search_paths: &OsStr, base_dir: &Path, cmd: &Path) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable(base_dir, candidate))
}

/// Does `path` name a non-directory the current user may execute?
fn is_executable(base_dir: &Path, path: &Path) -> bool {
    let full = base_dir.join(path);
    match std::fs::metadata(&full) {
        Ok(meta) if !meta.is_dir() => has_execute_access(&full),
        _ => false,
    }
}

#[cfg(unix)]
pub(crate) fn has_execute_access(path: &Path) -> bool {
    nix::unistd::access(path, nix::unistd::AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
pub(crate) fn has_execute_access(_path: &Path) -> bool {
    true
}
