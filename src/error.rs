use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by the render engine and its collaborators.
///
/// None of these stop the daemon except [`Error::WatchSource`]; a failed
/// render cycle is logged and retried on the next change.
#[derive(Debug, Error)]
pub enum Error {
    #[error("watch source failed: {0}")]
    WatchSource(String),

    #[error("render template: {0}")]
    Render(String),

    #[error("write output file {}: {source}", path.display())]
    SinkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("execute command {program}: {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command {program} exited with {}", exit_code(.code))]
    CommandExit { program: String, code: Option<i32> },
}

pub type Result<T> = std::result::Result<T, Error>;

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
