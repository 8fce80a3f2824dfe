//! Playback controller
//!
//! The object the host configuration layer builds. It collects the display,
//! source and interval, owns the scheduler while a session runs and exposes
//! the current [`PlaybackState`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::events::{PlaybackObserver, StopToken};
use super::scheduler::{FrameScheduler, TickOutcome};
use super::{PlaybackState, PlaybackStats};
use crate::config::{self, PipelineTuning, PlaybackConfig, DEFAULT_UPDATE_INTERVAL};
use crate::display::DisplayHandle;
use crate::error::{ConfigError, DisplayError, PlayerError, Result};
use crate::mjpeg::VideoInfo;
use crate::source::{DefaultSourceFactory, SourceFactory, VideoSource};

/// Owner of one playback session per display
pub struct PlaybackController {
    display: Option<DisplayHandle>,
    source: Option<VideoSource>,
    interval: Option<Duration>,
    tuning: PipelineTuning,
    factory: Box<dyn SourceFactory>,
    stop: StopToken,
    /// State while no scheduler exists
    state: PlaybackState,
    scheduler: Option<FrameScheduler>,
    observer: Option<Box<dyn PlaybackObserver>>,
    /// Counters of the last finished session
    last_stats: PlaybackStats,
    video_info: Option<VideoInfo>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::with_factory(Box::new(DefaultSourceFactory::new()))
    }

    /// Controller that opens sources through `factory`
    pub fn with_factory(factory: Box<dyn SourceFactory>) -> Self {
        Self {
            display: None,
            source: None,
            interval: None,
            tuning: PipelineTuning::default(),
            factory,
            stop: StopToken::new(),
            state: PlaybackState::Idle,
            scheduler: None,
            observer: None,
            last_stats: PlaybackStats::default(),
            video_info: None,
        }
    }

    pub fn bind_display(&mut self, display: DisplayHandle) -> Result<(), ConfigError> {
        self.ensure_idle("bind display")?;
        if self.display.is_some() {
            return Err(ConfigError::AlreadySet("display"));
        }
        self.display = Some(display);
        Ok(())
    }

    pub fn set_video_path(&mut self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        self.ensure_idle("set video path")?;
        match self.source {
            Some(VideoSource::LocalPath(_)) => return Err(ConfigError::AlreadySet("video_path")),
            Some(VideoSource::RemoteUrl(_)) => return Err(ConfigError::ConflictingSource),
            None => {}
        }
        let source = VideoSource::LocalPath(path.into());
        config::validate_source(&source)?;
        self.source = Some(source);
        Ok(())
    }

    pub fn set_http_url(&mut self, url: impl Into<String>) -> Result<(), ConfigError> {
        self.ensure_idle("set HTTP URL")?;
        match self.source {
            Some(VideoSource::RemoteUrl(_)) => return Err(ConfigError::AlreadySet("http_url")),
            Some(VideoSource::LocalPath(_)) => return Err(ConfigError::ConflictingSource),
            None => {}
        }
        let source = VideoSource::RemoteUrl(url.into());
        config::validate_source(&source)?;
        self.source = Some(source);
        Ok(())
    }

    pub fn set_update_interval(&mut self, interval: Duration) -> Result<(), ConfigError> {
        self.ensure_idle("set update interval")?;
        if self.interval.is_some() {
            return Err(ConfigError::AlreadySet("update_interval"));
        }
        config::validate_interval(interval)?;
        self.interval = Some(interval);
        Ok(())
    }

    /// Apply a whole validated record; same once-only rules as the setters
    pub fn configure(&mut self, config: PlaybackConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.bind_display(config.display)?;
        match config.source {
            VideoSource::LocalPath(path) => self.set_video_path(path)?,
            VideoSource::RemoteUrl(url) => self.set_http_url(url)?,
        }
        self.set_update_interval(config.refresh_interval)
    }

    pub fn set_tuning(&mut self, tuning: PipelineTuning) -> Result<(), ConfigError> {
        self.ensure_idle("change tuning")?;
        tuning.validate()?;
        self.tuning = tuning;
        Ok(())
    }

    pub fn tuning(&self) -> &PipelineTuning {
        &self.tuning
    }

    /// Observer for state changes and per-frame events
    pub fn set_observer(&mut self, observer: impl PlaybackObserver + 'static) {
        let observer: Box<dyn PlaybackObserver> = Box::new(observer);
        match self.scheduler.as_mut() {
            Some(scheduler) => scheduler.set_observer(Some(observer)),
            None => self.observer = Some(observer),
        }
    }

    /// Token that stops playback from inside a tick or from another thread
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Claim the display, open the source and begin buffering
    pub fn start(&mut self) -> Result<()> {
        if self.scheduler.is_some() {
            return Err(ConfigError::Running("start").into());
        }
        match self.open_session() {
            Ok(mut scheduler) => {
                scheduler.set_observer(self.observer.take());
                self.video_info = scheduler.source().video_info();
                self.state = PlaybackState::Buffering;
                let (frame_slots, pixel_slots) = scheduler.pool_capacity();
                info!(
                    interval_ms = scheduler.interval().as_millis() as u64,
                    frame_slots,
                    pixel_slots,
                    "Playback started"
                );
                self.scheduler = Some(scheduler);
                Ok(())
            }
            Err(e) => {
                error!("Failed to start playback: {}", e);
                self.state = PlaybackState::Error(e.to_string());
                Err(e)
            }
        }
    }

    fn open_session(&mut self) -> Result<FrameScheduler> {
        let display = self.display.clone().ok_or(ConfigError::MissingDisplay)?;
        let source = self.source.clone().ok_or(ConfigError::MissingSource)?;
        self.tuning.validate()?;
        if display.geometry().is_empty() {
            return Err(DisplayError::EmptyGeometry(display.geometry()).into());
        }

        let claim = display.claim()?;
        if let Some(output) = &self.tuning.output {
            if output.geometry() != claim.geometry() {
                return Err(DisplayError::GeometryMismatch {
                    expected: claim.geometry(),
                    actual: output.geometry(),
                }
                .into());
            }
        }

        let byte_source = self.factory.open(&source, &self.tuning.source_options())?;
        // An explicit interval wins over the frame rate in the file header
        let interval = self
            .interval
            .or_else(|| byte_source.video_info().and_then(|info| info.frame_interval()))
            .unwrap_or(DEFAULT_UPDATE_INTERVAL);
        Ok(FrameScheduler::new(
            byte_source,
            claim,
            interval,
            &self.tuning,
            self.stop.clone(),
        ))
    }

    /// Stop playback and release the display and source
    pub fn stop(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            scheduler.halt();
            self.retire(scheduler);
        } else if !matches!(self.state, PlaybackState::Error(_)) {
            self.state = PlaybackState::Stopped;
        }
    }

    /// Replace the source; a running session keeps its timing and rebuffers.
    ///
    /// If the new source cannot be opened the current one keeps playing.
    pub fn set_source(&mut self, source: VideoSource) -> Result<()> {
        config::validate_source(&source)?;
        if let Some(scheduler) = self.scheduler.as_mut() {
            let byte_source = self.factory.open(&source, &self.tuning.source_options())?;
            self.video_info = byte_source.video_info();
            scheduler.swap_source(byte_source);
        }
        self.source = Some(source);
        Ok(())
    }

    pub fn current_state(&self) -> PlaybackState {
        match &self.scheduler {
            Some(scheduler) => scheduler.state().clone(),
            None => self.state.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn stats(&self) -> PlaybackStats {
        match &self.scheduler {
            Some(scheduler) => scheduler.stats(),
            None => self.last_stats.clone(),
        }
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        self.video_info
    }

    /// Tick period of the running session, or the configured one when idle
    pub fn update_interval(&self) -> Duration {
        match &self.scheduler {
            Some(scheduler) => scheduler.interval(),
            None => self.interval.unwrap_or(DEFAULT_UPDATE_INTERVAL),
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.tick_at(Instant::now())
    }

    /// Run one tick; a session that ends is torn down here
    pub fn tick_at(&mut self, fired_at: Instant) -> TickOutcome {
        let Some(scheduler) = self.scheduler.as_mut() else {
            return TickOutcome::Idle;
        };
        let outcome = scheduler.tick_at(fired_at);
        if scheduler.state().is_terminal() {
            if let Some(scheduler) = self.scheduler.take() {
                self.retire(scheduler);
            }
        }
        outcome
    }

    /// Drive ticks from a timer until the session ends or `max_ticks` fire
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<PlaybackStats> {
        let ticker = crossbeam_channel::tick(self.update_interval());
        let mut fired = 0u64;

        while self.is_running() {
            if max_ticks.is_some_and(|max| fired >= max) {
                self.stop();
                break;
            }
            let Ok(fired_at) = ticker.recv() else {
                break;
            };
            fired += 1;
            self.tick_at(fired_at);
        }

        match self.current_state() {
            PlaybackState::Error(reason) => {
                warn!("Playback ended with error after {} ticks", fired);
                Err(PlayerError::Failed(reason))
            }
            _ => Ok(self.stats()),
        }
    }

    /// Log the resolved configuration
    pub fn dump_config(&self) {
        info!("MJPEG player:");
        match &self.source {
            Some(VideoSource::LocalPath(path)) => info!("  Video Path: {}", path.display()),
            Some(VideoSource::RemoteUrl(url)) => info!("  HTTP URL: {}", url),
            None => info!("  Source: (none)"),
        }
        info!("  Update Interval: {}ms", self.update_interval().as_millis());
        match &self.display {
            Some(handle) => {
                let g = handle.geometry();
                info!("  Display: {} {}x{} {}", handle.name(), g.width, g.height, g.format.name());
            }
            None => info!("  Display: (unbound)"),
        }
        info!(
            "  Buffers: chunk {} B, frame {} B, pools {}/{}",
            self.tuning.chunk_size,
            self.tuning.max_frame_bytes,
            self.tuning.frame_pool,
            self.tuning.pixel_pool
        );
        info!("  Looping: {}", if self.tuning.loop_file { "yes" } else { "no" });
        if let Some(info) = &self.video_info {
            info!(
                "  Video: {}x{}, {} frames, {} FPS",
                info.width, info.height, info.frame_count, info.fps
            );
        }
    }

    fn retire(&mut self, mut scheduler: FrameScheduler) {
        self.last_stats = scheduler.stats();
        self.state = scheduler.state().clone();
        self.observer = scheduler.take_observer();
        let (frames, pixels) = scheduler.buffers_in_use();
        debug!(frames_in_use = frames, pixels_in_use = pixels, "Session retired");
        // A stop request belongs to the session it ended
        self.stop.reset();
        // Dropping the scheduler releases the display claim
    }

    fn ensure_idle(&self, action: &'static str) -> Result<(), ConfigError> {
        if self.scheduler.is_some() {
            return Err(ConfigError::Running(action));
        }
        Ok(())
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if self.scheduler.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayGeometry, PixelFormat};
    use crate::player::PlaybackEvent;
    use crate::test_utils::{
        closest_color, encode_jpeg, RecordingSink, ScriptedFactory, Step, TempFile,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn display(width: u32, height: u32) -> (DisplayHandle, crate::test_utils::SinkLog) {
        let (sink, log) = RecordingSink::new(DisplayGeometry::new(width, height, PixelFormat::Rgb565));
        (DisplayHandle::new("panel", sink), log)
    }

    fn palette() -> Vec<[u8; 3]> {
        (0..10u8)
            .map(|i| [i * 28, 255 - i * 28, if i % 2 == 0 { 40 } else { 220 }])
            .collect()
    }

    #[test]
    fn test_lifecycle_setters_once() {
        let (handle, _log) = display(8, 8);
        let mut controller = PlaybackController::new();
        controller.bind_display(handle.clone()).unwrap();
        assert_eq!(
            controller.bind_display(handle),
            Err(ConfigError::AlreadySet("display"))
        );

        controller.set_video_path("/media/a.mjpeg").unwrap();
        assert_eq!(
            controller.set_video_path("/media/b.mjpeg"),
            Err(ConfigError::AlreadySet("video_path"))
        );
        assert_eq!(
            controller.set_http_url("http://cam.local/stream"),
            Err(ConfigError::ConflictingSource)
        );

        assert_eq!(
            controller.set_update_interval(Duration::ZERO),
            Err(ConfigError::InvalidInterval(Duration::ZERO))
        );
        controller.set_update_interval(Duration::from_millis(33)).unwrap();
        assert_eq!(
            controller.set_update_interval(Duration::from_millis(40)),
            Err(ConfigError::AlreadySet("update_interval"))
        );
    }

    #[test]
    fn test_start_requires_display_and_source() {
        let mut controller = PlaybackController::new();
        let err = controller.start().unwrap_err();
        assert!(matches!(err, PlayerError::Config(ConfigError::MissingDisplay)));
        assert!(matches!(controller.current_state(), PlaybackState::Error(_)));
    }

    #[test]
    fn test_looping_file_ten_frames() {
        let colors = palette();
        let frames: Vec<Vec<u8>> = colors.iter().map(|c| encode_jpeg(240, 320, *c)).collect();
        let file = TempFile::with_mjpeg(&frames, None);
        let (handle, log) = display(240, 320);

        let mut controller = PlaybackController::new();
        controller.bind_display(handle).unwrap();
        controller.set_video_path(file.path()).unwrap();
        controller.set_update_interval(Duration::from_millis(33)).unwrap();
        controller.set_tuning(PipelineTuning::default()).unwrap();
        controller.start().unwrap();
        assert_eq!(controller.current_state(), PlaybackState::Buffering);

        let mut ticks = 0;
        while controller.current_state() != PlaybackState::Playing {
            controller.tick();
            ticks += 1;
            assert!(ticks <= 3, "not playing after 3 ticks");
        }
        assert_eq!(log.presented(), ticks);

        for _ in 0..34 {
            let before = log.presented();
            assert!(matches!(controller.tick(), TickOutcome::Presented { .. }));
            assert_eq!(log.presented(), before + 1);
            assert_eq!(controller.current_state(), PlaybackState::Playing);
        }

        let shown: Vec<usize> = log
            .centers()
            .iter()
            .map(|c| closest_color(&colors, *c))
            .collect();
        let expected: Vec<usize> = (0..shown.len()).map(|i| i % 10).collect();
        assert_eq!(shown, expected);
        assert_eq!(controller.stats().end_of_streams, 3);

        // Three wraps later every slot is back in its pool
        let scheduler = controller.scheduler.as_ref().unwrap();
        assert_eq!(scheduler.buffers_in_use(), (0, 0));
        assert_eq!(scheduler.pool_capacity(), (2, 2));

        controller.stop();
        assert_eq!(controller.current_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_container_file_reports_info() {
        let frames = vec![encode_jpeg(16, 16, [10, 200, 10]); 3];
        let info = VideoInfo {
            width: 16,
            height: 16,
            frame_count: 3,
            fps: 30,
        };
        let file = TempFile::with_mjpeg(&frames, Some(info));
        let (handle, log) = display(16, 16);

        let mut controller = PlaybackController::new();
        controller
            .configure(PlaybackConfig::new(
                VideoSource::LocalPath(file.path().to_path_buf()),
                Duration::from_millis(33),
                handle,
            )
            .unwrap())
            .unwrap();
        controller.start().unwrap();
        assert_eq!(controller.video_info(), Some(info));

        for _ in 0..3 {
            controller.tick();
        }
        assert_eq!(log.presented(), 3);
        controller.dump_config();
    }

    #[test]
    fn test_too_large_goes_to_error() {
        let (factory, _probes) =
            ScriptedFactory::new(vec![vec![Step::Data(encode_jpeg(800, 600, [1, 2, 3]))]]);
        let (handle, log) = display(16, 16);

        let mut controller = PlaybackController::with_factory(Box::new(factory));
        controller.bind_display(handle.clone()).unwrap();
        controller.set_http_url("http://cam.local/stream").unwrap();
        controller.start().unwrap();

        assert!(matches!(controller.tick(), TickOutcome::Fatal(_)));
        assert!(matches!(controller.current_state(), PlaybackState::Error(_)));
        assert_eq!(log.presented(), 0);
        assert!(!controller.is_running());
        // Display released for the next controller
        assert!(!handle.is_claimed());
    }

    #[test]
    fn test_second_controller_rejected() {
        let (factory, _probes) = ScriptedFactory::new(vec![vec![], vec![]]);
        let (handle, _log) = display(16, 16);

        let mut first = PlaybackController::with_factory(Box::new(factory));
        first.bind_display(handle.clone()).unwrap();
        first.set_video_path("/media/a.mjpeg").unwrap();
        first.start().unwrap();

        let (factory, _probes) = ScriptedFactory::new(vec![vec![]]);
        let mut second = PlaybackController::with_factory(Box::new(factory));
        second.bind_display(handle.clone()).unwrap();
        second.set_video_path("/media/b.mjpeg").unwrap();
        let err = second.start().unwrap_err();
        assert!(matches!(
            err,
            PlayerError::Display(DisplayError::AlreadyClaimed(_))
        ));
        assert!(err.is_fatal());

        first.stop();
        assert!(second.start().is_ok());
    }

    #[test]
    fn test_output_geometry_mismatch_at_start() {
        let (factory, _probes) = ScriptedFactory::new(vec![vec![]]);
        let (handle, _log) = display(240, 320);

        let mut controller = PlaybackController::with_factory(Box::new(factory));
        controller.bind_display(handle).unwrap();
        controller.set_video_path("/media/a.mjpeg").unwrap();
        let tuning: PipelineTuning =
            serde_json::from_str(r#"{ "output": { "width": 320, "height": 240 } }"#).unwrap();
        controller.set_tuning(tuning).unwrap();

        let err = controller.start().unwrap_err();
        assert!(matches!(
            err,
            PlayerError::Display(DisplayError::GeometryMismatch { .. })
        ));
        assert!(matches!(controller.current_state(), PlaybackState::Error(_)));
    }

    #[test]
    fn test_stop_requested_inside_tick() {
        let (factory, probes) = ScriptedFactory::new(vec![vec![
            Step::Data(encode_jpeg(16, 16, [200, 0, 0])),
            Step::Data(encode_jpeg(16, 16, [0, 200, 0])),
        ]]);
        let (handle, log) = display(16, 16);
        let presented = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&presented);

        let mut controller = PlaybackController::with_factory(Box::new(factory));
        controller.bind_display(handle).unwrap();
        controller.set_http_url("http://cam.local/stream").unwrap();
        controller.set_observer(move |event: &PlaybackEvent, stop: &StopToken| {
            if let PlaybackEvent::FramePresented { .. } = event {
                counter.fetch_add(1, Ordering::SeqCst);
                stop.request_stop();
            }
        });
        controller.start().unwrap();

        controller.tick();
        assert_eq!(controller.tick(), TickOutcome::Stopped);
        assert_eq!(controller.tick(), TickOutcome::Idle);
        assert_eq!(controller.current_state(), PlaybackState::Stopped);
        assert_eq!(presented.load(Ordering::SeqCst), 1);
        assert_eq!(log.presented(), 1);
        assert_eq!(probes[0].polls(), 1);
    }

    #[test]
    fn test_set_source_while_running() {
        let (factory, probes) = ScriptedFactory::new(vec![
            vec![Step::Data(encode_jpeg(16, 16, [200, 0, 0]))],
            vec![Step::Data(encode_jpeg(16, 16, [0, 0, 200]))],
        ]);
        let (handle, log) = display(16, 16);

        let mut controller = PlaybackController::with_factory(Box::new(factory));
        controller.bind_display(handle).unwrap();
        controller.set_video_path("/media/a.mjpeg").unwrap();
        controller.start().unwrap();
        controller.tick();
        assert_eq!(controller.current_state(), PlaybackState::Playing);

        controller
            .set_source(VideoSource::RemoteUrl("http://cam.local/b".into()))
            .unwrap();
        assert_eq!(controller.current_state(), PlaybackState::Buffering);
        assert!(probes[0].closed());

        controller.tick();
        assert_eq!(controller.current_state(), PlaybackState::Playing);
        let centers = log.centers();
        assert!(centers[1].2 > 150 && centers[1].0 < 60);
    }

    #[test]
    fn test_setters_rejected_while_running() {
        let (factory, _probes) = ScriptedFactory::new(vec![vec![]]);
        let (handle, _log) = display(16, 16);
        let mut controller = PlaybackController::with_factory(Box::new(factory));
        controller.bind_display(handle).unwrap();
        controller.set_video_path("/media/a.mjpeg").unwrap();
        controller.start().unwrap();

        assert_eq!(
            controller.set_update_interval(Duration::from_millis(10)),
            Err(ConfigError::Running("set update interval"))
        );
        assert!(matches!(
            controller.start(),
            Err(PlayerError::Config(ConfigError::Running("start")))
        ));
    }

    #[test]
    fn test_run_with_tick_limit() {
        let (factory, _probes) = ScriptedFactory::new(vec![vec![
            Step::Data(encode_jpeg(16, 16, [200, 0, 0])),
            Step::Data(encode_jpeg(16, 16, [0, 200, 0])),
        ]]);
        let (handle, log) = display(16, 16);
        let mut controller = PlaybackController::with_factory(Box::new(factory));
        controller.bind_display(handle).unwrap();
        controller.set_video_path("/media/a.mjpeg").unwrap();
        controller.set_update_interval(Duration::from_millis(5)).unwrap();
        controller.start().unwrap();

        let stats = controller.run(Some(10)).unwrap();
        assert_eq!(stats.frames_presented, 2);
        assert_eq!(log.presented(), 2);
        assert_eq!(controller.current_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_frame_split_across_last_read_before_wrap() {
        let colors = [[220, 30, 30], [30, 220, 30], [30, 30, 220]];
        let frames: Vec<Vec<u8>> = colors.iter().map(|c| encode_jpeg(16, 16, *c)).collect();
        let total: usize = frames.iter().map(Vec::len).sum();
        let file = TempFile::with_mjpeg(&frames, None);
        let (handle, log) = display(16, 16);

        let mut controller = PlaybackController::new();
        controller.bind_display(handle).unwrap();
        controller.set_video_path(file.path()).unwrap();
        // First read ends halfway through the last frame, the second hits end of file
        controller
            .set_tuning(PipelineTuning {
                chunk_size: total - frames[2].len() / 2,
                ..Default::default()
            })
            .unwrap();
        controller.start().unwrap();

        for _ in 0..9 {
            assert!(matches!(controller.tick(), TickOutcome::Presented { .. }));
        }
        let shown: Vec<usize> = log
            .centers()
            .iter()
            .map(|c| closest_color(&colors, *c))
            .collect();
        assert_eq!(shown, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
        assert_eq!(controller.stats().end_of_streams, 2);
        assert_eq!(controller.stats().sync_errors, 0);
        assert_eq!(
            controller.scheduler.as_ref().unwrap().buffers_in_use(),
            (0, 0)
        );
    }

    #[test]
    fn test_header_frame_rate_sets_interval() {
        let frames = vec![encode_jpeg(16, 16, [10, 200, 10]); 2];
        let info = VideoInfo {
            width: 16,
            height: 16,
            frame_count: 2,
            fps: 10,
        };
        let file = TempFile::with_mjpeg(&frames, Some(info));

        let (handle, _log) = display(16, 16);
        let mut controller = PlaybackController::new();
        controller.bind_display(handle).unwrap();
        controller.set_video_path(file.path()).unwrap();
        assert_eq!(controller.update_interval(), DEFAULT_UPDATE_INTERVAL);
        controller.start().unwrap();
        assert_eq!(controller.update_interval(), Duration::from_millis(100));
        controller.stop();

        let (handle, _log) = display(16, 16);
        let mut controller = PlaybackController::new();
        controller.bind_display(handle).unwrap();
        controller.set_video_path(file.path()).unwrap();
        controller.set_update_interval(Duration::from_millis(20)).unwrap();
        controller.start().unwrap();
        assert_eq!(controller.update_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_stop_requested_before_start_is_honored() {
        let (factory, probes) = ScriptedFactory::new(vec![
            vec![Step::Data(encode_jpeg(16, 16, [200, 0, 0]))],
            vec![Step::Data(encode_jpeg(16, 16, [0, 200, 0]))],
        ]);
        let (handle, log) = display(16, 16);
        let mut controller = PlaybackController::with_factory(Box::new(factory));
        controller.bind_display(handle).unwrap();
        controller.set_video_path("/media/a.mjpeg").unwrap();

        controller.stop_token().request_stop();
        controller.start().unwrap();
        assert_eq!(controller.tick(), TickOutcome::Stopped);
        assert_eq!(controller.current_state(), PlaybackState::Stopped);
        assert_eq!(probes[0].polls(), 0);
        assert_eq!(log.presented(), 0);

        // The request ended that session only
        controller.start().unwrap();
        assert!(matches!(controller.tick(), TickOutcome::Presented { .. }));
        assert_eq!(log.presented(), 1);
    }

    #[test]
    fn test_empty_display_rejected_at_start() {
        let (factory, _probes) = ScriptedFactory::new(vec![vec![]]);
        let (handle, _log) = display(0, 0);
        let mut controller = PlaybackController::with_factory(Box::new(factory));
        controller.bind_display(handle.clone()).unwrap();
        controller.set_video_path("/media/a.mjpeg").unwrap();

        let err = controller.start().unwrap_err();
        assert!(matches!(
            err,
            PlayerError::Display(DisplayError::EmptyGeometry(_))
        ));
        assert!(matches!(controller.current_state(), PlaybackState::Error(_)));
        assert!(!handle.is_claimed());
    }
}
