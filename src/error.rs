// error.rs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ShellError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{}: {source}", path.display())]
    RedirectOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program}: too many arguments (limit is {limit})")]
    TooManyArguments { program: String, limit: usize },

    #[error("failed to interrupt process {pid}: {source}")]
    SignalDelivery {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Sys(#[from] nix::Error),
}
