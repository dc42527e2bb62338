//! HTTP log source

use std::io;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::{LineStream, SourceError, line_codec};

/// Streams a remote access log line by line
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// Create a source for `url`
    ///
    /// `timeout` bounds the whole transfer, body included.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, SourceError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("logfork/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(SourceError::Client)?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send the request and stream the response body as lines
    ///
    /// Non-success statuses fail here, before any line is produced. Errors
    /// while reading the body (reset connection, body shorter than its
    /// `Content-Length`) end the stream with `SourceError::Read`.
    pub async fn lines(&self) -> Result<LineStream, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| SourceError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: self.url.clone(),
                status,
            });
        }

        tracing::info!(
            url = %self.url,
            content_length = ?response.content_length(),
            "Streaming log"
        );

        let body = response.bytes_stream().map_err(io::Error::other);
        let reader = StreamReader::new(body);

        Ok(FramedRead::new(reader, line_codec())
            .map_err(SourceError::from)
            .boxed())
    }
}
