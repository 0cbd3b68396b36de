use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::{find_command_path, has_execute_access};
use crate::interpreter::Factory;
use anyhow::Result;
use regex::Regex;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Names answered with "is a shell builtin" by `type`.
pub(crate) const BUILTIN_NAMES: &[&str] = &[Exit::NAME, Echo::NAME, Type::NAME, Pwd::NAME, Cd::NAME];

/// Built-in commands known to the shell at compile time.
///
/// Builtins take their arguments verbatim and are executed directly in-process
/// without spawning a child process.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "echo" or "cd". Matched exactly.
    const NAME: &'static str;

    /// Build the command from the words following its name.
    fn from_args(args: &[&str]) -> Self;

    /// Executes the command against the shell environment.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for error.
    /// A returned [`ShellError`] is printed by the caller on the stream it belongs to.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, streams: Streams, env: &mut Environment) -> Result<ExitCode> {
        let Streams {
            mut stdout,
            mut stderr,
            ..
        } = streams;
        let result = <T as BuiltinCommand>::execute(*self, &mut stdout, env);
        stdout.flush()?;
        match result {
            Ok(x) => Ok(x),
            Err(e) => match e.downcast_ref::<ShellError>() {
                Some(err) => Ok(err.report(&mut stdout, &mut stderr)?),
                None => {
                    writeln!(stderr, "{}: {:#}", T::NAME, e)?;
                    Ok(1)
                }
            },
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        (name == T::NAME).then(|| Box::new(T::from_args(args)) as Box<dyn ExecutableCommand>)
    }
}

/// Terminate the shell.
///
/// The status is the leading base-10 integer of the first argument; a missing
/// or non-numeric argument means 0.
pub struct Exit {
    pub code: Option<String>,
}

impl Exit {
    fn status(&self) -> ExitCode {
        static LEADING_INT: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^\s*([+-]?[0-9]+)").expect("valid exit code pattern"));

        self.code
            .as_deref()
            .and_then(|code| LEADING_INT.captures(code))
            .and_then(|caps| caps[1].parse::<i64>().ok())
            .map(|n| n as ExitCode)
            .unwrap_or(0)
    }
}

impl BuiltinCommand for Exit {
    const NAME: &'static str = "exit";

    fn from_args(args: &[&str]) -> Self {
        Self {
            code: args.first().map(|s| s.to_string()),
        }
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let status = self.status();
        env.request_exit(status);
        Ok(status)
    }
}

/// Write the arguments to standard output, separated by single spaces and
/// followed by a newline.
pub struct Echo {
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    const NAME: &'static str = "echo";

    fn from_args(args: &[&str]) -> Self {
        Self {
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

/// Tell how each name would be interpreted as a command.
pub struct Type {
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    const NAME: &'static str = "type";

    fn from_args(args: &[&str]) -> Self {
        Self {
            names: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let mut status = 0;
        for name in self.names {
            if BUILTIN_NAMES.contains(&name.as_str()) {
                writeln!(stdout, "{} is a shell builtin", name)?;
                continue;
            }
            match find_command_path(OsStr::new(search_paths), &env.current_dir, Path::new(&name)) {
                Some(path) => writeln!(stdout, "{} is {}", name, path.display())?,
                None => {
                    writeln!(stdout, "{}", ShellError::NotFound(name))?;
                    status = 1;
                }
            }
        }
        Ok(status)
    }
}

/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    const NAME: &'static str = "pwd";

    fn from_args(_args: &[&str]) -> Self {
        Self {}
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.display())?;
        Ok(0)
    }
}

/// Change the current working directory.
///
/// `~` stands for `$HOME`; relative targets are resolved against the current
/// directory. Without a target only a usage hint is printed.
pub struct Cd {
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    const NAME: &'static str = "cd";

    fn from_args(args: &[&str]) -> Self {
        Self {
            target: args.first().map(|s| s.to_string()),
        }
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let Some(dir) = self.target else {
            return Err(ShellError::Usage("cd <directory>").into());
        };

        let target = if dir == "~" {
            match env.get_var("HOME") {
                Some(home) => PathBuf::from(home),
                None => return Err(ShellError::NoSuchDirectory(dir).into()),
            }
        } else {
            PathBuf::from(&dir)
        };

        // `join` keeps absolute targets as they are.
        match fs::canonicalize(env.current_dir.join(target)) {
            Ok(path) if path.is_dir() && has_execute_access(&path) => {
                env.set_var("PWD", path.to_string_lossy());
                env.current_dir = path;
                Ok(0)
            }
            _ => Err(ShellError::NoSuchDirectory(dir).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::{MemReader, MemWriter};
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn test_env(current_dir: PathBuf) -> Environment {
        Environment::with_vars(HashMap::new(), current_dir)
    }

    fn make_unique_temp_dir() -> PathBuf {
        let mut p = stdenv::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("minish_test_cd_{}_{}", std::process::id(), nanos));
        fs::create_dir_all(&p).expect("failed to create temp dir");
        fs::canonicalize(&p).expect("canonicalize failed")
    }

    /// Runs a builtin the way the interpreter does and returns (code, stdout, stderr).
    fn run_boxed(cmd: Box<dyn ExecutableCommand>, env: &mut Environment) -> (ExitCode, String, String) {
        let (out, out_buf) = MemWriter::with_handle();
        let (err, err_buf) = MemWriter::with_handle();
        let streams = Streams {
            stdin: Box::new(MemReader::new(Vec::new())),
            stdout: Box::new(out),
            stderr: Box::new(err),
        };
        let code = cmd.execute(streams, env).unwrap();
        let out = String::from_utf8(out_buf.borrow().clone()).unwrap();
        let err = String::from_utf8(err_buf.borrow().clone()).unwrap();
        (code, out, err)
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let cur = stdenv::current_dir().unwrap();
        let mut env = test_env(cur.clone());

        let mut out = Vec::new();
        let res = Pwd {}.execute(&mut out, &mut env);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", cur.display()));
    }

    #[test]
    fn test_echo_joins_with_single_space() {
        let mut env = test_env(PathBuf::from("/"));

        let mut out = Vec::new();
        let echo = Echo::from_args(&["hello", "world"]);
        assert_eq!(echo.execute(&mut out, &mut env).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), "hello world\n");
    }

    #[test]
    fn test_echo_without_args_prints_empty_line() {
        let mut env = test_env(PathBuf::from("/"));
        let mut out = Vec::new();
        Echo::from_args(&[]).execute(&mut out, &mut env).unwrap();
        assert_eq!(out, b"\n");
    }

    #[test]
    fn test_echo_does_not_parse_options() {
        let mut env = test_env(PathBuf::from("/"));
        let mut out = Vec::new();
        Echo::from_args(&["-n", "--help"]).execute(&mut out, &mut env).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "-n --help\n");
    }

    #[test]
    fn test_exit_status_parsing() {
        let status = |args: &[&str]| Exit::from_args(args).status();
        assert_eq!(status(&["42"]), 42);
        assert_eq!(status(&["abc"]), 0);
        assert_eq!(status(&[]), 0);
        assert_eq!(status(&["7abc"]), 7);
        assert_eq!(status(&["-3"]), -3);
        assert_eq!(status(&["+5"]), 5);
        assert_eq!(status(&["3", "4"]), 3);
        assert_eq!(status(&["99999999999999999999999"]), 0);
    }

    #[test]
    fn test_exit_requests_shell_exit() {
        let mut env = test_env(PathBuf::from("/"));
        let code = Exit::from_args(&["42"]).execute(&mut Vec::new(), &mut env).unwrap();
        assert_eq!(code, 42);
        assert!(env.should_exit);
        assert_eq!(env.exit_status, 42);
    }

    #[test]
    fn test_type_reports_builtins() {
        let mut env = test_env(PathBuf::from("/"));
        // An external `echo` on PATH must not shadow the builtin.
        env.set_var("PATH", "/bin:/usr/bin");
        let mut out = Vec::new();
        let code = Type::from_args(&["cd", "echo", "type"])
            .execute(&mut out, &mut env)
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "cd is a shell builtin\necho is a shell builtin\ntype is a shell builtin\n"
        );
    }

    #[test]
    fn test_type_reports_missing_command() {
        let mut env = test_env(PathBuf::from("/"));
        env.set_var("PATH", "/bin");
        let mut out = Vec::new();
        let code = Type::from_args(&["nonexistentxyz"]).execute(&mut out, &mut env).unwrap();
        assert_eq!(code, 1);
        assert_eq!(String::from_utf8(out).unwrap(), "nonexistentxyz: not found\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_type_reports_resolved_path() {
        let mut env = test_env(PathBuf::from("/"));
        env.set_var("PATH", "/does/not/exist:/bin");
        let mut out = Vec::new();
        Type::from_args(&["sh"]).execute(&mut out, &mut env).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "sh is /bin/sh\n");
    }

    #[test]
    fn test_builtin_names_are_case_sensitive() {
        let env = test_env(PathBuf::from("/"));
        assert!(Factory::<Echo>::default().try_create(&env, "echo", &[]).is_some());
        assert!(Factory::<Echo>::default().try_create(&env, "ECHO", &[]).is_none());
        assert!(Factory::<Cd>::default().try_create(&env, "c", &[]).is_none());
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let temp = make_unique_temp_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = test_env(orig.clone());

        let cmd = Cd {
            target: Some(temp.to_string_lossy().to_string()),
        };
        assert_eq!(cmd.execute(&mut Vec::new(), &mut env).unwrap(), 0);
        assert_eq!(env.current_dir, temp);
        assert_eq!(env.get_var("PWD"), Some(temp.to_string_lossy().as_ref()));
        // The process itself never moves.
        assert_eq!(stdenv::current_dir().unwrap(), orig);

        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_relative_to_current_dir() {
        let temp = make_unique_temp_dir();
        fs::create_dir_all(temp.join("child")).unwrap();
        let mut env = test_env(temp.clone());

        Cd::from_args(&["child"]).execute(&mut Vec::new(), &mut env).unwrap();
        assert_eq!(env.current_dir, temp.join("child"));

        Cd::from_args(&[".."]).execute(&mut Vec::new(), &mut env).unwrap();
        assert_eq!(env.current_dir, temp);

        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_tilde_goes_home() {
        let temp = make_unique_temp_dir();
        let mut env = test_env(PathBuf::from("/"));
        env.set_var("HOME", temp.to_string_lossy().to_string());

        Cd::from_args(&["~"]).execute(&mut Vec::new(), &mut env).unwrap();
        assert_eq!(env.current_dir, temp);

        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_without_target_prints_usage() {
        let orig = PathBuf::from("/");
        let mut env = test_env(orig.clone());

        let cmd = Factory::<Cd>::default().try_create(&env, "cd", &[]).unwrap();
        let (code, out, err) = run_boxed(cmd, &mut env);

        assert_eq!(code, 1);
        assert_eq!(out, "usage: cd <directory>\n");
        assert!(err.is_empty());
        assert_eq!(env.current_dir, orig);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let orig = PathBuf::from("/");
        let mut env = test_env(orig.clone());

        let cmd = Factory::<Cd>::default()
            .try_create(&env, "cd", &["/nonexistent/path"])
            .unwrap();
        let (code, out, err) = run_boxed(cmd, &mut env);

        assert_eq!(code, 1);
        assert!(out.is_empty());
        assert_eq!(err, "cd: /nonexistent/path: No such file or directory\n");
        assert_eq!(env.current_dir, orig);
    }

    #[test]
    fn test_cd_to_file_errors() {
        let temp = make_unique_temp_dir();
        fs::write(temp.join("file"), "x").unwrap();
        let mut env = test_env(temp.clone());

        let res = Cd::from_args(&["file"]).execute(&mut Vec::new(), &mut env);
        let err = res.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShellError>(),
            Some(ShellError::NoSuchDirectory(d)) if d == "file"
        ));
        assert_eq!(env.current_dir, temp);

        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_tilde_without_home_errors() {
        let mut env = test_env(PathBuf::from("/"));
        let cmd = Factory::<Cd>::default().try_create(&env, "cd", &["~"]).unwrap();
        let (code, _, err) = run_boxed(cmd, &mut env);
        assert_eq!(code, 1);
        assert_eq!(err, "cd: ~: No such file or directory\n");
    }
}
