use std::path::{Path, PathBuf};

use crate::{
    config::{ContainerFormat, RecorderSettings},
    foundation::core::Rect,
    foundation::error::{ReelError, ReelResult},
    playback::PlaybackSignal,
};

pub mod simulated;

pub const ARTIFACT_STEM: &str = "app-promo";

/// Constraints for the display-capture request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_frame_rate: u32,
    pub audio: bool,
    /// Ask the platform to offer the current tab first.
    pub prefer_current_tab: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RecorderOptions {
    pub format: ContainerFormat,
    pub video_bits_per_second: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
    Paused,
}

/// Notifications from a live stream, delivered in the order they happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecorderEvent {
    /// An encoded chunk. Empty chunks are dropped.
    Data(Vec<u8>),
    /// The recorder finished flushing after a stop request.
    Stopped,
    /// The platform ended the capture on its own (e.g. the user hit "stop sharing").
    TrackEnded,
}

/// The host's screen-capture facility.
pub trait CaptureBackend {
    /// Request a capture stream. A refused permission prompt is [`ReelError::CaptureDenied`].
    fn acquire(&mut self, constraints: &StreamConstraints) -> ReelResult<Box<dyn MediaStream>>;

    fn supports_format(&self, format: ContainerFormat) -> bool;
}

/// A live capture stream with its recorder attached.
pub trait MediaStream {
    /// Whether the stream can be restricted to an element's on-screen bounds.
    fn supports_region_crop(&self) -> bool;

    fn crop_to(&mut self, region: Rect) -> ReelResult<()>;

    fn start_recorder(&mut self, options: &RecorderOptions) -> ReelResult<()>;

    fn recorder_state(&self) -> RecorderState;

    /// Ask the recorder to flush and stop. Completion arrives later as [`RecorderEvent::Stopped`].
    fn stop_recorder(&mut self);

    /// Drain pending notifications.
    fn poll_events(&mut self) -> Vec<RecorderEvent>;

    /// Release every track so the platform's "capturing" indicator goes away.
    fn stop_tracks(&mut self);
}

/// Pick the first supported container; the last preference is used unconditionally otherwise.
pub fn select_format(
    backend: &dyn CaptureBackend,
    preferences: &[ContainerFormat],
) -> ContainerFormat {
    preferences
        .iter()
        .copied()
        .find(|f| backend.supports_format(*f))
        .or_else(|| preferences.last().copied())
        .unwrap_or(ContainerFormat::WebM)
}

/// The finished recording, owned by the caller until cleared or replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ContainerFormat,
    pub bytes: Vec<u8>,
    pub chunk_count: usize,
    /// False when the platform ended the stream before the sequence finished.
    pub complete: bool,
}

impl ExportArtifact {
    pub fn file_name(&self) -> String {
        format!("{ARTIFACT_STEM}.{}", self.format.extension())
    }

    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the artifact into `dir` under its conventional file name.
    pub fn write_to(&self, dir: &Path) -> ReelResult<PathBuf> {
        use anyhow::Context as _;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("failed to write artifact '{}'", path.display()))?;
        Ok(path)
    }
}

/// What a pump of the live stream produced.
#[derive(Debug, Default)]
pub struct CaptureUpdate {
    pub artifact: Option<ExportArtifact>,
    pub stream_ended: bool,
}

enum SessionState {
    Idle,
    Live {
        stream: Box<dyn MediaStream>,
        format: ContainerFormat,
    },
}

/// Owns the capture stream and recorder for the length of one recording.
pub struct CaptureSession {
    settings: RecorderSettings,
    state: SessionState,
    chunks: Vec<Vec<u8>>,
    stream_ended: bool,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("recording", &self.is_recording())
            .field("format", &self.format())
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl CaptureSession {
    pub fn new(settings: RecorderSettings) -> Self {
        Self {
            settings,
            state: SessionState::Idle,
            chunks: Vec::new(),
            stream_ended: false,
        }
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// True from a successful `start` until the recorder reports it stopped.
    pub fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Live { .. })
    }

    pub fn format(&self) -> Option<ContainerFormat> {
        match &self.state {
            SessionState::Live { format, .. } => Some(*format),
            SessionState::Idle => None,
        }
    }

    /// Acquire a stream cropped to `canvas` and start recording it.
    ///
    /// The canvas size is locked on `playback` before the permission prompt appears, since the
    /// prompt can shrink the viewport. Any failure releases that lock and leaves the session idle.
    #[tracing::instrument(skip(self, backend, playback))]
    pub fn start(
        &mut self,
        backend: &mut dyn CaptureBackend,
        canvas: Rect,
        playback: &mut PlaybackSignal,
    ) -> ReelResult<ContainerFormat> {
        if self.is_recording() {
            return Err(ReelError::capture("a capture session is already running"));
        }
        self.chunks.clear();
        self.stream_ended = false;

        playback.lock_dimensions(canvas.size());
        match self.open(backend, canvas) {
            Ok((stream, format)) => {
                tracing::info!(format = format.mime(), "capture started");
                self.state = SessionState::Live { stream, format };
                Ok(format)
            }
            Err(e) => {
                tracing::warn!(error = %e, "capture failed to start");
                playback.unlock_dimensions();
                Err(e)
            }
        }
    }

    fn open(
        &self,
        backend: &mut dyn CaptureBackend,
        canvas: Rect,
    ) -> ReelResult<(Box<dyn MediaStream>, ContainerFormat)> {
        let constraints = StreamConstraints {
            ideal_width: self.settings.ideal_width,
            ideal_height: self.settings.ideal_height,
            ideal_frame_rate: self.settings.ideal_frame_rate,
            audio: self.settings.capture_audio,
            prefer_current_tab: true,
        };
        let mut stream = backend.acquire(&constraints)?;

        if stream.supports_region_crop() {
            if let Err(e) = stream.crop_to(canvas) {
                stream.stop_tracks();
                return Err(e);
            }
        } else {
            tracing::debug!("region crop unavailable, recording the full surface");
        }

        let format = select_format(backend, &self.settings.formats);
        let options = RecorderOptions {
            format,
            video_bits_per_second: self.settings.video_bits_per_second,
        };
        if let Err(e) = stream.start_recorder(&options) {
            stream.stop_tracks();
            return Err(e);
        }
        Ok((stream, format))
    }

    /// Request the recorder to stop. A no-op unless it is actively recording, so calling it twice
    /// (or before `start`) is safe. Returns true when a stop was requested.
    pub fn stop(&mut self) -> bool {
        let SessionState::Live { stream, .. } = &mut self.state else {
            return false;
        };
        if stream.recorder_state() == RecorderState::Inactive {
            return false;
        }
        tracing::info!("capture stop requested");
        stream.stop_recorder();
        true
    }

    /// Drain the stream. Chunks are buffered in delivery order; once the recorder reports it has
    /// stopped, the buffer is assembled into a single artifact and the tracks are released.
    pub fn pump(&mut self) -> CaptureUpdate {
        let mut update = CaptureUpdate::default();
        let SessionState::Live { stream, .. } = &mut self.state else {
            return update;
        };

        let mut stopped = false;
        for event in stream.poll_events() {
            match event {
                RecorderEvent::Data(bytes) => {
                    if !bytes.is_empty() && !stopped {
                        self.chunks.push(bytes);
                    }
                }
                RecorderEvent::Stopped => stopped = true,
                RecorderEvent::TrackEnded => {
                    if !self.stream_ended {
                        tracing::warn!("capture stream ended by the platform");
                        self.stream_ended = true;
                        update.stream_ended = true;
                    }
                }
            }
        }

        if stopped {
            if let SessionState::Live { stream, format } =
                std::mem::replace(&mut self.state, SessionState::Idle)
            {
                update.artifact = Some(self.finish(stream, format));
            }
        }
        update
    }

    fn finish(
        &mut self,
        mut stream: Box<dyn MediaStream>,
        format: ContainerFormat,
    ) -> ExportArtifact {
        stream.stop_tracks();

        let chunks = std::mem::take(&mut self.chunks);
        let chunk_count = chunks.len();
        let bytes = chunks.concat();
        tracing::info!(bytes = bytes.len(), chunk_count, "artifact assembled");
        ExportArtifact {
            format,
            bytes,
            chunk_count,
            complete: !self.stream_ended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::simulated::SimulatedBackend;

    fn canvas() -> Rect {
        Rect::new(100.0, 50.0, 500.0, 450.0)
    }

    #[test]
    fn format_falls_back_to_last_preference() {
        let backend = SimulatedBackend::new().with_formats(&[ContainerFormat::WebM]);
        let prefs = [ContainerFormat::Mp4, ContainerFormat::WebM];
        assert_eq!(select_format(&backend, &prefs), ContainerFormat::WebM);

        let none = SimulatedBackend::new().with_formats(&[]);
        assert_eq!(select_format(&none, &prefs), ContainerFormat::WebM);

        let both = SimulatedBackend::new();
        assert_eq!(select_format(&both, &prefs), ContainerFormat::Mp4);
    }

    #[test]
    fn start_locks_dimensions_crops_and_records() {
        let mut backend = SimulatedBackend::new();
        let mut session = CaptureSession::new(RecorderSettings::default());
        let mut playback = PlaybackSignal::new();

        let format = session.start(&mut backend, canvas(), &mut playback).unwrap();
        assert_eq!(format, ContainerFormat::Mp4);
        assert!(session.is_recording());
        assert_eq!(
            playback.locked_dimensions(),
            Some(kurbo::Size::new(400.0, 400.0))
        );

        let stats = backend.stats();
        assert_eq!(stats.crop, Some(canvas()));
        assert_eq!(
            stats.recorder_options.map(|o| o.video_bits_per_second),
            Some(50_000_000)
        );
        assert_eq!(stats.constraints.map(|c| c.ideal_frame_rate), Some(60));
    }

    #[test]
    fn denied_permission_releases_lock() {
        let mut backend = SimulatedBackend::new().denying();
        let mut session = CaptureSession::new(RecorderSettings::default());
        let mut playback = PlaybackSignal::new();

        let err = session
            .start(&mut backend, canvas(), &mut playback)
            .unwrap_err();
        assert!(matches!(err, ReelError::CaptureDenied(_)));
        assert!(!session.is_recording());
        assert_eq!(playback.locked_dimensions(), None);
    }

    #[test]
    fn recorder_failure_stops_tracks_and_releases_lock() {
        let mut backend = SimulatedBackend::new().failing_recorder();
        let mut session = CaptureSession::new(RecorderSettings::default());
        let mut playback = PlaybackSignal::new();

        assert!(session.start(&mut backend, canvas(), &mut playback).is_err());
        assert!(!session.is_recording());
        assert_eq!(playback.locked_dimensions(), None);
        assert_eq!(backend.stats().tracks_stopped, 1);
    }

    #[test]
    fn missing_crop_support_records_full_surface() {
        let mut backend = SimulatedBackend::new().without_crop();
        let mut session = CaptureSession::new(RecorderSettings::default());
        let mut playback = PlaybackSignal::new();

        session.start(&mut backend, canvas(), &mut playback).unwrap();
        assert_eq!(backend.stats().crop, None);
    }

    #[test]
    fn stop_is_idempotent_and_yields_one_artifact() {
        let mut backend = SimulatedBackend::new();
        let mut session = CaptureSession::new(RecorderSettings::default());
        let mut playback = PlaybackSignal::new();

        assert!(!session.stop());
        session.start(&mut backend, canvas(), &mut playback).unwrap();
        session.pump();
        session.pump();

        assert!(session.stop());
        assert!(!session.stop());
        let artifact = session.pump().artifact.unwrap();
        assert!(artifact.complete);
        assert_eq!(artifact.file_name(), "app-promo.mp4");
        assert_eq!(artifact.mime(), "video/mp4");
        assert!(!artifact.is_empty());

        assert!(!session.stop());
        assert!(session.pump().artifact.is_none());
        assert!(!session.is_recording());

        let stats = backend.stats();
        assert_eq!(stats.stop_requests, 1);
        assert_eq!(stats.tracks_stopped, 1);
    }

    #[test]
    fn chunks_assemble_in_delivery_order() {
        let mut backend = SimulatedBackend::new();
        let mut session = CaptureSession::new(RecorderSettings::default());
        let mut playback = PlaybackSignal::new();

        session.start(&mut backend, canvas(), &mut playback).unwrap();
        session.pump();
        session.pump();
        session.stop();
        let artifact = session.pump().artifact.unwrap();
        assert_eq!(artifact.bytes, b"chunk-0;chunk-1;chunk-2;".to_vec());
        assert_eq!(artifact.chunk_count, 3);
    }

    #[test]
    fn platform_ended_stream_marks_artifact_incomplete() {
        let mut backend = SimulatedBackend::new();
        let mut session = CaptureSession::new(RecorderSettings::default());
        let mut playback = PlaybackSignal::new();

        session.start(&mut backend, canvas(), &mut playback).unwrap();
        session.pump();
        backend.end_stream();
        let update = session.pump();
        assert!(update.stream_ended);

        // the recorder stops on its own once its only track ends
        let artifact = update.artifact.unwrap();
        assert!(!artifact.complete);
        assert_eq!(artifact.chunk_count, 2);
        assert!(!session.stop());
        assert_eq!(backend.stats().tracks_stopped, 1);
    }

    #[test]
    fn artifact_writes_conventional_name() {
        let artifact = ExportArtifact {
            format: ContainerFormat::WebM,
            bytes: b"abc".to_vec(),
            chunk_count: 1,
            complete: true,
        };
        let dir = PathBuf::from("target").join("artifact_write_test");
        let path = artifact.write_to(&dir).unwrap();
        assert!(path.ends_with("app-promo.webm"));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }
}
