//! Side effects of a render cycle: writing the artifact and running the
//! reload command.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Destination for rendered bytes.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Where the artifact lands.  Passed to the command as its argument.
    fn location(&self) -> &Path;

    /// Create or truncate the destination, write `contents` and flush them
    /// to stable storage before returning.
    async fn write(&self, contents: &[u8]) -> Result<()>;
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with a single argument and wait for it to exit.
    async fn run(&self, program: &str, arg: &Path) -> Result<()>;
}

pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn write_synced(&self, contents: &[u8]) -> std::io::Result<()> {
        let mut file = File::create(&self.path).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_all().await
    }
}

#[async_trait]
impl Sink for FileSink {
    fn location(&self) -> &Path {
        &self.path
    }

    async fn write(&self, contents: &[u8]) -> Result<()> {
        self.write_synced(contents)
            .await
            .map_err(|source| Error::SinkWrite {
                path: self.path.clone(),
                source,
            })?;
        debug!("Wrote {} bytes to {}", contents.len(), self.path.display());
        Ok(())
    }
}

/// Runs commands as child processes sharing our stdout and stderr.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, arg: &Path) -> Result<()> {
        let status = Command::new(program)
            .arg(arg)
            .status()
            .await
            .map_err(|source| Error::Command {
                program: program.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandExit {
                program: program.to_string(),
                code: status.code(),
            })
        }
    }
}
