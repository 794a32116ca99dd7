//! # docqa-cli
//!
//! The `docqa` console: load a folder of documents, index it, and answer
//! questions about it with a local Ollama model.

pub mod cli;
pub mod console;

pub use cli::{Cli, build_pipeline};
pub use console::{
    Command, ConsoleOptions, ConsoleState, EditorLineSource, LineSource, ReaderLineSource,
    SessionOutcome, run_console, run_session, startup,
};
