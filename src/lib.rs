//! A minimal interactive command shell.
//!
//! The crate reads command lines, splits them into words honoring single-quoted
//! spans, runs a small set of builtins (`exit`, `echo`, `type`, `pwd`, `cd`)
//! in-process and launches everything else as an external program found through
//! `PATH`.
//!
//! The main entry point is [`Interpreter`], which owns the shell [`env::Environment`]
//! and the table of command factories. The public modules [`command`] and [`env`]
//! expose the traits and types needed to plug in your own commands, and
//! [`lexer`] exposes the tokenizer on its own.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
mod external;
mod interpreter;
mod io_adapters;
pub mod lexer;

pub use interpreter::{Interpreter, LineSource};
pub use io_adapters::{MemReader, MemWriter};
