use argh::FromArgs;
use minish::Interpreter;
use rustyline::DefaultEditor;

#[derive(FromArgs)]
/// A minimal interactive command shell.
struct Args {
    /// text shown before each command line.
    #[argh(option, default = "String::from(\"$ \")")]
    prompt: String,

    /// log dispatch decisions to stderr (same as RUST_LOG=debug).
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    let mut editor = DefaultEditor::new()?;
    let code = Interpreter::default().repl(&mut editor, &args.prompt)?;
    log::debug!("exiting with status {code}");
    std::process::exit(code)
}
