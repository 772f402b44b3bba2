// lib.rs

pub mod builtins;
pub mod completion;
pub mod config;
pub mod error;
pub mod expand;
pub mod history;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod repl;
pub mod signals;
pub mod tokenizer;
pub mod util;

pub use config::ShellConfig;
pub use error::{Result, ShellError};
