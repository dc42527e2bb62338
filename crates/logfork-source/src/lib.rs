//! Line sources for logfork
//!
//! This crate fetches access logs over HTTP or from disk and splits them into
//! a stream of lines.

mod file;
mod http;

use std::io;
use std::path::PathBuf;

use bytes::BytesMut;
use futures::stream::BoxStream;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder};

pub use file::FileSource;
pub use http::HttpSource;

/// Longest accepted line in bytes; anything longer aborts the stream
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Ordered lines of a log, ending early with an error on transport failure
pub type LineStream = BoxStream<'static, Result<String, SourceError>>;

/// Errors raised while opening or reading a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line exceeds {} bytes", MAX_LINE_LENGTH)]
    LineTooLong,

    #[error("read failed: {0}")]
    Read(#[source] io::Error),
}

impl From<AnyDelimiterCodecError> for SourceError {
    fn from(err: AnyDelimiterCodecError) -> Self {
        match err {
            AnyDelimiterCodecError::MaxChunkLengthExceeded => Self::LineTooLong,
            AnyDelimiterCodecError::Io(e) => Self::Read(e),
        }
    }
}

/// Newline splitter shared by all sources
///
/// Strips a trailing `\r`. Invalid UTF-8 becomes U+FFFD instead of an error.
pub(crate) struct LineDecoder {
    inner: AnyDelimiterCodec,
}

impl LineDecoder {
    fn new() -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                MAX_LINE_LENGTH,
            ),
        }
    }

    fn decode_chunk(chunk: &[u8]) -> String {
        let chunk = chunk.strip_suffix(b"\r").unwrap_or(chunk);
        String::from_utf8_lossy(chunk).into_owned()
    }
}

impl Decoder for LineDecoder {
    type Item = String;
    type Error = AnyDelimiterCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        Ok(self.inner.decode(buf)?.map(|chunk| Self::decode_chunk(&chunk)))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        Ok(self.inner.decode_eof(buf)?.map(|chunk| Self::decode_chunk(&chunk)))
    }
}

fn line_codec() -> LineDecoder {
    LineDecoder::new()
}
