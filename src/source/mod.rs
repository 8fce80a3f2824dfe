//! Byte sources
//!
//! A [`ByteSource`] hands the pipeline raw MJPEG bytes one chunk per poll.
//! Two implementations exist: [`FileSource`] streams (and by default loops)
//! a local file, [`HttpSource`] keeps an HTTP response stream open and
//! reconnects with backoff. Neither blocks a poll longer than the configured
//! I/O timeout.

mod backoff;
mod file;
mod http;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SourceError;
use crate::mjpeg::VideoInfo;

pub use backoff::{Backoff, BackoffPolicy};
pub use file::FileSource;
pub use http::{validate_url, Connector, HttpSource, UreqConnector};

/// Where the video comes from. Exactly one variant per configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    LocalPath(PathBuf),
    RemoteUrl(String),
}

impl std::fmt::Display for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoSource::LocalPath(path) => write!(f, "{}", path.display()),
            VideoSource::RemoteUrl(url) => f.write_str(url),
        }
    }
}

/// Fixed-capacity read buffer filled by one poll
#[derive(Debug)]
pub struct RawChunk {
    buf: Box<[u8]>,
    len: usize,
}

impl RawChunk {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes written by the last poll
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Whole buffer, for sources that read in place
    pub fn space_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub fn set_filled(&mut self, len: usize) {
        self.len = len.min(self.buf.len());
    }

    /// Copy as much of `bytes` as fits; returns the number copied
    pub fn fill_from(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.buf.len());
        self.buf[..n].copy_from_slice(&bytes[..n]);
        self.len = n;
        n
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Outcome of a successful poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePoll {
    /// `n` bytes were written to the chunk
    Data(usize),
    /// The stream ended. Looping sources rewind and will yield data again.
    EndOfStream,
}

/// Polling interface over a stream of MJPEG bytes
pub trait ByteSource: Send {
    /// Read the next chunk. Returns within the source's I/O timeout.
    fn poll(&mut self, chunk: &mut RawChunk) -> Result<SourcePoll, SourceError>;

    /// Release the underlying file or connection. Further polls fail.
    fn close(&mut self);

    /// Path or URL, for logs
    fn describe(&self) -> String;

    /// Stream metadata, when the source carries an MJPG header
    fn video_info(&self) -> Option<VideoInfo> {
        None
    }

    /// The stream ended for good and will not yield data again
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// I/O policy shared by all sources
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Bytes read per poll
    pub chunk_size: usize,
    /// Upper bound on how long one poll may wait
    pub io_timeout: Duration,
    /// Rewind local files at end of stream
    pub loop_file: bool,
    /// Reconnect delays for remote sources
    pub backoff: BackoffPolicy,
    /// Reconnect a remote stream that has been silent this long
    pub idle_reconnect: Duration,
    /// Longest one HTTP response is read before it is re-opened
    pub session_limit: Duration,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            io_timeout: Duration::from_millis(250),
            loop_file: true,
            backoff: BackoffPolicy::default(),
            idle_reconnect: Duration::from_secs(5),
            session_limit: Duration::from_secs(600),
        }
    }
}

/// Opens byte sources for the controller
pub trait SourceFactory: Send {
    fn open(
        &self,
        source: &VideoSource,
        options: &SourceOptions,
    ) -> Result<Box<dyn ByteSource>, SourceError>;
}

/// Opens local files directly and remote URLs through `ureq`
#[derive(Default)]
pub struct DefaultSourceFactory {
    connector: Option<Arc<dyn Connector>>,
}

impl DefaultSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom HTTP connector instead of `ureq`
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector: Some(connector),
        }
    }
}

impl SourceFactory for DefaultSourceFactory {
    fn open(
        &self,
        source: &VideoSource,
        options: &SourceOptions,
    ) -> Result<Box<dyn ByteSource>, SourceError> {
        match source {
            VideoSource::LocalPath(path) => {
                Ok(Box::new(FileSource::open(path, options.loop_file)?))
            }
            VideoSource::RemoteUrl(url) => {
                let connector = match &self.connector {
                    Some(connector) => Arc::clone(connector),
                    None => Arc::new(UreqConnector::new(options.idle_reconnect, options.session_limit)),
                };
                Ok(Box::new(HttpSource::open(url, options.clone(), connector)?))
            }
        }
    }
}
