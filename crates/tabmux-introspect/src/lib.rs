//! Tabmux Introspect - Command Flag Discovery
//!
//! This crate discovers the flags a command-line tool accepts:
//! - Runner: executes help invocations (`--help`, `-h`, ...) under a timeout
//! - Parser: an ordered chain of help-format strategies over one flag model
//! - Cache: bounded, age-limited results per program
//! - Engine: caching, in-flight de-duplication and debouncing around the above

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod flag;
pub mod parser;
pub mod runner;

pub use cache::HelpCache;
pub use config::IntrospectConfig;
pub use engine::{HelpEngine, HELP_INVOCATIONS};
pub use error::{Error, Result};
pub use flag::{CommandFlag, ParsedHelp};
pub use parser::{parse, HelpFormat};
pub use runner::{HelpRunner, ProcessHelpRunner};
