//! Shared fixtures for unit tests

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::display::{DisplayGeometry, DisplaySink};
use crate::error::{DisplayError, SourceError};
use crate::mjpeg::VideoInfo;
use crate::source::{
    ByteSource, Connector, RawChunk, SourceFactory, SourceOptions, SourcePoll, VideoSource,
};
use crate::video::PixelBuffer;

/// Baseline JPEG of a solid color
pub fn encode_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode_rgb_image(&RgbImage::from_pixel(width, height, image::Rgb(color)))
}

pub fn encode_rgb_image(img: &RgbImage) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .encode_image(img)
        .expect("encode test jpeg");
    out
}

/// Structurally framed but undecodable JPEG: SOI, empty SOS header, payload, EOI
pub fn minimal_jpeg(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02];
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// Index of the palette entry nearest to `color`
pub fn closest_color(palette: &[[u8; 3]], color: (u8, u8, u8)) -> usize {
    let dist = |p: &[u8; 3]| {
        let d = |a: u8, b: u8| (i32::from(a) - i32::from(b)).pow(2);
        d(p[0], color.0) + d(p[1], color.1) + d(p[2], color.2)
    };
    palette
        .iter()
        .enumerate()
        .min_by_key(|(_, p)| dist(p))
        .map(|(i, _)| i)
        .expect("non-empty palette")
}

#[derive(Default)]
struct SinkRecord {
    presented: usize,
    centers: Vec<(u8, u8, u8)>,
}

/// Read side of a [`RecordingSink`]
#[derive(Clone, Default)]
pub struct SinkLog {
    inner: Arc<Mutex<SinkRecord>>,
}

impl SinkLog {
    pub fn presented(&self) -> usize {
        self.inner.lock().presented
    }

    /// Center pixel of every presented frame
    pub fn centers(&self) -> Vec<(u8, u8, u8)> {
        self.inner.lock().centers.clone()
    }
}

/// Display sink that records what it was given
pub struct RecordingSink {
    geometry: DisplayGeometry,
    log: SinkLog,
}

impl RecordingSink {
    pub fn new(geometry: DisplayGeometry) -> (Self, SinkLog) {
        let log = SinkLog::default();
        (
            Self {
                geometry,
                log: log.clone(),
            },
            log,
        )
    }
}

impl DisplaySink for RecordingSink {
    fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    fn present(&mut self, pixels: &PixelBuffer) -> Result<(), DisplayError> {
        let center = pixels.rgb_at(pixels.width() / 2, pixels.height() / 2);
        let mut record = self.log.inner.lock();
        record.presented += 1;
        record.centers.push(center);
        Ok(())
    }
}

/// File in the temp directory, removed on drop
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn with_contents(bytes: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("mjpeg-player-{}.bin", Uuid::new_v4()));
        std::fs::write(&path, bytes).expect("write temp file");
        Self { path }
    }

    /// MJPEG file of `frames`, with the MJPG header and per-frame headers when `info` is set
    pub fn with_mjpeg(frames: &[Vec<u8>], info: Option<VideoInfo>) -> Self {
        let mut bytes = Vec::new();
        if let Some(info) = info {
            bytes.extend_from_slice(&info.to_bytes());
        }
        for (i, frame) in frames.iter().enumerate() {
            if info.is_some() {
                bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
                bytes.extend_from_slice(&(i as u32 * 33).to_le_bytes());
            }
            bytes.extend_from_slice(frame);
        }
        Self::with_contents(&bytes)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Directory in the temp directory, removed with its contents on drop
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("mjpeg-player-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// One scripted poll result
#[derive(Debug, Clone)]
pub enum Step {
    Data(Vec<u8>),
    /// Looping end of stream
    End,
    /// Final end of stream; the source reports itself exhausted
    Finish,
    Timeout,
    Fail,
}

/// Observation side of a [`ScriptedSource`]
#[derive(Clone, Default)]
pub struct SourceProbe {
    polls: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl SourceProbe {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Byte source that replays a script, then times out forever
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    probe: SourceProbe,
    exhausted: bool,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> (Self, SourceProbe) {
        let probe = SourceProbe::default();
        (
            Self {
                steps: steps.into(),
                probe: probe.clone(),
                exhausted: false,
            },
            probe,
        )
    }
}

impl ByteSource for ScriptedSource {
    fn poll(&mut self, chunk: &mut RawChunk) -> Result<SourcePoll, SourceError> {
        chunk.clear();
        if self.probe.closed() {
            return Err(SourceError::Closed);
        }
        self.probe.polls.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(Step::Data(bytes)) => {
                let n = chunk.fill_from(&bytes);
                if n < bytes.len() {
                    self.steps.push_front(Step::Data(bytes[n..].to_vec()));
                }
                Ok(SourcePoll::Data(n))
            }
            Some(Step::End) => Ok(SourcePoll::EndOfStream),
            Some(Step::Finish) => {
                self.exhausted = true;
                Ok(SourcePoll::EndOfStream)
            }
            Some(Step::Fail) => Err(SourceError::Network {
                url: "scripted".into(),
                reason: "scripted failure".into(),
            }),
            Some(Step::Timeout) | None => Err(SourceError::Timeout {
                origin: "scripted".into(),
                duration: Duration::from_millis(1),
            }),
        }
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        "scripted".into()
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Source factory handing out scripted sources in order
pub struct ScriptedFactory {
    scripts: Mutex<VecDeque<ScriptedSource>>,
}

impl ScriptedFactory {
    pub fn new(scripts: Vec<Vec<Step>>) -> (Self, Vec<SourceProbe>) {
        let mut sources = VecDeque::new();
        let mut probes = Vec::new();
        for steps in scripts {
            let (source, probe) = ScriptedSource::new(steps);
            sources.push_back(source);
            probes.push(probe);
        }
        (
            Self {
                scripts: Mutex::new(sources),
            },
            probes,
        )
    }
}

impl SourceFactory for ScriptedFactory {
    fn open(
        &self,
        _source: &VideoSource,
        _options: &SourceOptions,
    ) -> Result<Box<dyn ByteSource>, SourceError> {
        match self.scripts.lock().pop_front() {
            Some(source) => Ok(Box::new(source)),
            None => Err(SourceError::Invalid {
                reason: "no scripted source left".into(),
            }),
        }
    }
}

/// HTTP connector that serves canned bodies or failures, one per connect
pub struct ScriptedConnector {
    responses: Mutex<VecDeque<Result<Vec<u8>, String>>>,
    calls: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(responses: Vec<Result<Vec<u8>, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self, _url: &str) -> io::Result<Box<dyn Read + Send>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().pop_front() {
            Some(Ok(body)) => Ok(Box::new(Cursor::new(body))),
            Some(Err(reason)) => Err(io::Error::other(reason)),
            None => Err(io::Error::other("no more connections")),
        }
    }
}

/// HTTP connector whose bodies block in `read` until released
#[derive(Default)]
pub struct StallingConnector {
    calls: AtomicUsize,
    live: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl StallingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Bodies not yet dropped by their reader
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Let every blocked read return end of stream
    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

impl Connector for StallingConnector {
    fn connect(&self, _url: &str) -> io::Result<Box<dyn Read + Send>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StallingBody {
            live: Arc::clone(&self.live),
            released: Arc::clone(&self.released),
        }))
    }
}

struct StallingBody {
    live: Arc<AtomicUsize>,
    released: Arc<AtomicBool>,
}

impl Read for StallingBody {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        while !self.released.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(2));
        }
        Ok(0)
    }
}

impl Drop for StallingBody {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
