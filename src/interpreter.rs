use crate::command::{CommandFactory, ExitCode, Streams};
use crate::env::Environment;
use crate::error::ShellError;
use crate::lexer;
use log::{debug, trace, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: the builtins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Where the interactive loop gets its lines from.
pub trait LineSource {
    /// Show `prompt` and wait for the next line.
    ///
    /// `Ok(None)` means the input is exhausted.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;
}

impl LineSource for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            // Ctrl-C drops the line being typed.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// A minimal interactive shell that can execute built-in and external commands.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`]
/// objects that are queried in order to create commands by name. See
/// [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use minish::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run("echo", &["hello", "world"]).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self::with_env(Environment::new(), commands)
    }

    /// Create an interpreter working against an explicit environment.
    pub fn with_env(env: Environment, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { env, commands }
    }

    /// The shell state commands run against.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run a single command invocation by name with arguments on the shell's
    /// own standard streams.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        self.run_with_streams(name, args, Streams::inherited())
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// The first factory that recognizes `name` wins. When none does,
    /// `<name>: command not found` is printed and 127 is returned.
    pub fn run_with_streams(
        &mut self,
        name: &str,
        args: &[&str],
        mut streams: Streams,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                debug!("dispatching {name} with {} argument(s)", args.len());
                return cmd.execute(streams, &mut self.env);
            }
        }
        debug!("no command matches {name}");
        let err = ShellError::CommandNotFound(name.to_string());
        Ok(err.report(&mut streams.stdout, &mut streams.stderr)?)
    }

    /// Interpret one raw command line.
    ///
    /// Returns `None` when the line holds no words and nothing was run.
    pub fn execute_line(&mut self, line: &str) -> anyhow::Result<Option<ExitCode>> {
        self.execute_line_with_streams(line, Streams::inherited())
    }

    /// Interpret one raw command line against the given streams.
    pub fn execute_line_with_streams(
        &mut self,
        line: &str,
        streams: Streams,
    ) -> anyhow::Result<Option<ExitCode>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let tokens = lexer::split_into_tokens(line);
        trace!("tokens = {:?}", tokens);
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(None);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.run_with_streams(name, &args, streams).map(Some)
    }

    /// Read-Eval-Print Loop.
    ///
    /// Runs until the `exit` builtin is used or the input is exhausted and
    /// returns the status the shell should terminate with. Only failures of the
    /// line source itself end the loop with an error.
    pub fn repl(&mut self, source: &mut dyn LineSource, prompt: &str) -> anyhow::Result<ExitCode> {
        self.repl_with_streams(source, prompt, Streams::inherited)
    }

    /// Same as [`Interpreter::repl`], with `streams` called once per command line.
    pub fn repl_with_streams(
        &mut self,
        source: &mut dyn LineSource,
        prompt: &str,
        mut streams: impl FnMut() -> Streams,
    ) -> anyhow::Result<ExitCode> {
        while !self.env.should_exit {
            let line = match source.read_line(prompt) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("end of input");
                    return Ok(0);
                }
                Err(err) => {
                    warn!("reading input failed: {err:#}");
                    return Err(err);
                }
            };

            match self.execute_line_with_streams(&line, streams()) {
                Ok(Some(code)) => debug!("status {code}"),
                Ok(None) => {}
                // The standard streams themselves failed; keep going like any other error.
                Err(err) => warn!("{line:?}: {err:#}"),
            }
        }
        Ok(self.env.exit_status)
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `exit`, `echo`, `type`, `pwd`, `cd`
    /// - external command launcher, consulted last
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Type>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}
