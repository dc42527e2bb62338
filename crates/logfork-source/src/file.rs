use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt};
use tokio_util::codec::FramedRead;

use crate::{LineStream, SourceError, line_codec};

/// Reads a local access log line by line
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file and stream its lines
    pub async fn lines(&self) -> Result<LineStream, SourceError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|source| SourceError::Open {
                path: self.path.clone(),
                source,
            })?;

        tracing::info!(path = %self.path.display(), "Reading log file");

        Ok(FramedRead::new(file, line_codec())
            .map_err(SourceError::from)
            .boxed())
    }
}
