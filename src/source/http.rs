//! HTTP MJPEG source
//!
//! The response body is read on a dedicated thread and handed over through a
//! bounded channel so that `poll` never waits longer than the I/O timeout.
//! A failed or silent connection is dropped and re-opened after a backoff
//! delay; a stream that ends cleanly is re-opened right away.
//!
//! A dropped connection's reader may still be blocked in `read`. At most
//! [`MAX_DRAINING`] such readers are kept; past that no new connection is
//! opened until one exits. The agent's body budget bounds how long any
//! reader can stay blocked.

use std::io::{self, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use super::{Backoff, ByteSource, RawChunk, SourceOptions, SourcePoll};
use crate::error::SourceError;

/// Chunks buffered between the reader thread and `poll`
const CHANNEL_DEPTH: usize = 2;

/// Dropped readers allowed to still be running
pub const MAX_DRAINING: usize = 1;

/// Opens a streaming response body for a URL
pub trait Connector: Send + Sync {
    fn connect(&self, url: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// [`Connector`] backed by a `ureq` agent
pub struct UreqConnector {
    agent: ureq::Agent,
}

impl UreqConnector {
    /// `timeout` bounds connection setup and the wait for the response head,
    /// `session` the total time one response body is read
    pub fn new(timeout: Duration, session: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .timeout_recv_body(Some(session))
            .http_status_as_error(false)
            .user_agent(concat!("mjpeg-player/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Connector for UreqConnector {
    fn connect(&self, url: &str) -> io::Result<Box<dyn Read + Send>> {
        let resp = self
            .agent
            .get(url)
            .call()
            .map_err(|e| io::Error::other(format!("request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(io::Error::other(format!("unexpected status {status}")));
        }
        let content_type = resp
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        debug!(url = %url, status = %status, content_type = %content_type, "stream connected");
        Ok(Box::new(SessionBody {
            inner: resp.into_body().into_reader(),
        }))
    }
}

/// Response body whose session budget running out reads as a clean end
struct SessionBody<R> {
    inner: R,
}

impl<R: Read> Read for SessionBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(e) if is_session_timeout(&e) => {
                debug!("stream session budget reached");
                Ok(0)
            }
            other => other,
        }
    }
}

fn is_session_timeout(err: &io::Error) -> bool {
    matches!(
        err.get_ref().and_then(|e| e.downcast_ref::<ureq::Error>()),
        Some(ureq::Error::Timeout(_))
    )
}

enum LinkMessage {
    Data(Vec<u8>),
    Failed(String),
    Ended,
}

/// One live connection: the reader thread's channel and its cancel flag
struct Link {
    rx: Receiver<LinkMessage>,
    cancel: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl Link {
    fn spawn(url: &str, connector: Arc<dyn Connector>, chunk_size: usize) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(CHANNEL_DEPTH);
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let url = url.to_string();
        let reader = thread::Builder::new()
            .name("mjpeg-http".into())
            .spawn(move || read_loop(&url, connector.as_ref(), chunk_size, &tx, &flag))?;
        Ok(Self {
            rx,
            cancel,
            reader: Some(reader),
        })
    }

    /// Cancel the link and hand back its reader thread if it is still running
    fn detach(mut self) -> Option<JoinHandle<()>> {
        self.reader.take().filter(|reader| !reader.is_finished())
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        // The receiver goes with the link, so a reader that wakes up exits on its next send
        self.cancel.store(true, Ordering::Relaxed);
    }
}

fn read_loop(
    url: &str,
    connector: &dyn Connector,
    chunk_size: usize,
    tx: &Sender<LinkMessage>,
    cancel: &AtomicBool,
) {
    let mut reader = match connector.connect(url) {
        Ok(reader) => reader,
        Err(e) => {
            let _ = tx.send(LinkMessage::Failed(e.to_string()));
            return;
        }
    };
    let mut buf = vec![0u8; chunk_size.max(1)];
    while !cancel.load(Ordering::Relaxed) {
        match reader.read(&mut buf) {
            Ok(0) => {
                let _ = tx.send(LinkMessage::Ended);
                return;
            }
            Ok(n) => {
                // Receiver gone means the source dropped this link
                if tx.send(LinkMessage::Data(buf[..n].to_vec())).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(LinkMessage::Failed(e.to_string()));
                return;
            }
        }
    }
}

/// Remote MJPEG stream with automatic reconnect
pub struct HttpSource {
    url: String,
    options: SourceOptions,
    connector: Arc<dyn Connector>,
    link: Option<Link>,
    /// Readers of dropped links that have not exited yet
    draining: Vec<JoinHandle<()>>,
    backoff: Backoff,
    retry_at: Option<Instant>,
    last_data: Instant,
    /// Bytes received that did not fit the caller's chunk
    pending: Vec<u8>,
    reconnects: u64,
    closed: bool,
}

impl HttpSource {
    /// Validate the URL and start connecting in the background
    pub fn open(
        url: &str,
        options: SourceOptions,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, SourceError> {
        validate_url(url)?;
        let backoff = Backoff::new(options.backoff);
        let mut source = Self {
            url: url.to_string(),
            options,
            connector,
            link: None,
            draining: Vec::new(),
            backoff,
            retry_at: None,
            last_data: Instant::now(),
            pending: Vec::new(),
            reconnects: 0,
            closed: false,
        };
        source.connect()?;
        info!("Opened HTTP stream: {}", source.url);
        Ok(source)
    }

    /// Connections re-opened after the first
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    fn drop_link(&mut self) {
        if let Some(reader) = self.link.take().and_then(Link::detach) {
            self.draining.push(reader);
        }
        self.draining.retain(|reader| !reader.is_finished());
    }

    fn connect(&mut self) -> Result<(), SourceError> {
        let link = Link::spawn(&self.url, Arc::clone(&self.connector), self.options.chunk_size)
            .map_err(|e| SourceError::Network {
                url: self.url.clone(),
                reason: format!("failed to spawn reader: {e}"),
            })?;
        self.link = Some(link);
        self.retry_at = None;
        self.last_data = Instant::now();
        Ok(())
    }

    fn schedule_reconnect(&mut self, reason: &str) {
        self.drop_link();
        let delay = self.backoff.next_delay();
        self.retry_at = Some(Instant::now() + delay);
        warn!(
            url = %self.url,
            attempt = self.backoff.attempts(),
            retry_in_ms = delay.as_millis() as u64,
            "stream lost: {}",
            reason
        );
    }

    fn deliver(&mut self, chunk: &mut RawChunk, bytes: &[u8]) -> SourcePoll {
        let n = chunk.fill_from(bytes);
        self.pending.extend_from_slice(&bytes[n..]);
        SourcePoll::Data(n)
    }
}

/// Accept only absolute `http`/`https` URLs with a host
pub fn validate_url(url: &str) -> Result<(), SourceError> {
    let uri: ureq::http::Uri = url.parse().map_err(|e| SourceError::Invalid {
        reason: format!("{url}: {e}"),
    })?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        other => {
            return Err(SourceError::Invalid {
                reason: format!("{url}: unsupported scheme {:?}", other.unwrap_or("")),
            })
        }
    }
    if uri.host().map_or(true, str::is_empty) {
        return Err(SourceError::Invalid {
            reason: format!("{url}: missing host"),
        });
    }
    Ok(())
}

impl ByteSource for HttpSource {
    fn poll(&mut self, chunk: &mut RawChunk) -> Result<SourcePoll, SourceError> {
        chunk.clear();
        if self.closed {
            return Err(SourceError::Closed);
        }

        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            return Ok(self.deliver(chunk, &pending));
        }

        if self.link.is_none() {
            if let Some(at) = self.retry_at {
                let now = Instant::now();
                if now < at {
                    return Err(SourceError::Backoff {
                        url: self.url.clone(),
                        retry_in: at - now,
                    });
                }
            }
            self.draining.retain(|reader| !reader.is_finished());
            if self.draining.len() > MAX_DRAINING {
                debug!(
                    url = %self.url,
                    draining = self.draining.len(),
                    "waiting for dropped readers to exit"
                );
                return Err(SourceError::Backoff {
                    url: self.url.clone(),
                    retry_in: self.options.io_timeout,
                });
            }
            self.reconnects += 1;
            debug!(url = %self.url, reconnects = self.reconnects, "reconnecting");
            self.connect()?;
        }

        let Some(link) = self.link.as_ref() else {
            return Err(SourceError::Closed);
        };

        match link.rx.recv_timeout(self.options.io_timeout) {
            Ok(LinkMessage::Data(bytes)) => {
                self.backoff.reset();
                self.last_data = Instant::now();
                Ok(self.deliver(chunk, &bytes))
            }
            Ok(LinkMessage::Ended) => {
                info!("HTTP stream ended, reconnecting: {}", self.url);
                self.drop_link();
                self.retry_at = None;
                Ok(SourcePoll::EndOfStream)
            }
            Ok(LinkMessage::Failed(reason)) => {
                self.schedule_reconnect(&reason);
                Err(SourceError::Network {
                    url: self.url.clone(),
                    reason,
                })
            }
            Err(RecvTimeoutError::Timeout) => {
                if self.last_data.elapsed() >= self.options.idle_reconnect {
                    let reason = format!("no data for {:?}", self.options.idle_reconnect);
                    self.schedule_reconnect(&reason);
                    return Err(SourceError::Network {
                        url: self.url.clone(),
                        reason,
                    });
                }
                Err(SourceError::Timeout {
                    origin: self.url.clone(),
                    duration: self.options.io_timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                let reason = "reader stopped".to_string();
                self.schedule_reconnect(&reason);
                Err(SourceError::Network {
                    url: self.url.clone(),
                    reason,
                })
            }
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.link = None;
            self.draining.clear();
            self.pending.clear();
            debug!("Closed {}", self.url);
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

impl Drop for HttpSource {
    fn drop(&mut self) {
        self.close();
    }
}
