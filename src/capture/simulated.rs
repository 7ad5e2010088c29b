use std::{cell::RefCell, rc::Rc};

use crate::{
    capture::{
        CaptureBackend, MediaStream, RecorderEvent, RecorderOptions, RecorderState,
        StreamConstraints,
    },
    config::ContainerFormat,
    foundation::core::Rect,
    foundation::error::{ReelError, ReelResult},
};

/// What the simulated platform observed, for assertions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulatedStats {
    pub acquisitions: usize,
    pub constraints: Option<StreamConstraints>,
    pub crop: Option<Rect>,
    pub recorder_options: Option<RecorderOptions>,
    pub stop_requests: usize,
    pub tracks_stopped: usize,
}

#[derive(Debug, Default)]
struct Shared {
    stats: SimulatedStats,
    end_requested: bool,
}

/// Deterministic in-memory capture platform.
///
/// Every poll of a recording stream yields one chunk (`chunk-N;`), so the artifact spells out the
/// delivery order.
#[derive(Debug)]
pub struct SimulatedBackend {
    deny: bool,
    fail_recorder: bool,
    delay_stop: bool,
    crop: bool,
    formats: Vec<ContainerFormat>,
    shared: Rc<RefCell<Shared>>,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            deny: false,
            fail_recorder: false,
            delay_stop: false,
            crop: true,
            formats: vec![ContainerFormat::Mp4, ContainerFormat::WebM],
            shared: Rc::new(RefCell::new(Shared::default())),
        }
    }

    /// Refuse the permission prompt.
    pub fn denying(mut self) -> Self {
        self.deny = true;
        self
    }

    /// Grant the stream but reject the recorder configuration.
    pub fn failing_recorder(mut self) -> Self {
        self.fail_recorder = true;
        self
    }

    /// Hold the recorder's stop confirmation back until the second poll after the request.
    pub fn delaying_stop(mut self) -> Self {
        self.delay_stop = true;
        self
    }

    pub fn without_crop(mut self) -> Self {
        self.crop = false;
        self
    }

    pub fn with_formats(mut self, formats: &[ContainerFormat]) -> Self {
        self.formats = formats.to_vec();
        self
    }

    pub fn stats(&self) -> SimulatedStats {
        self.shared.borrow().stats.clone()
    }

    /// Simulate the user ending the share from the platform UI.
    pub fn end_stream(&self) {
        self.shared.borrow_mut().end_requested = true;
    }
}

impl CaptureBackend for SimulatedBackend {
    fn acquire(&mut self, constraints: &StreamConstraints) -> ReelResult<Box<dyn MediaStream>> {
        if self.deny {
            return Err(ReelError::capture_denied("permission dismissed"));
        }
        {
            let mut shared = self.shared.borrow_mut();
            shared.stats.acquisitions += 1;
            shared.stats.constraints = Some(constraints.clone());
            shared.end_requested = false;
        }
        Ok(Box::new(SimulatedStream {
            crop: self.crop,
            fail_recorder: self.fail_recorder,
            delay_stop: self.delay_stop,
            stop_in_polls: None,
            state: RecorderState::Inactive,
            next_chunk: 0,
            pending: Vec::new(),
            ended: false,
            shared: Rc::clone(&self.shared),
        }))
    }

    fn supports_format(&self, format: ContainerFormat) -> bool {
        self.formats.contains(&format)
    }
}

struct SimulatedStream {
    crop: bool,
    fail_recorder: bool,
    delay_stop: bool,
    /// Polls left before a delayed `Stopped` is delivered.
    stop_in_polls: Option<u8>,
    state: RecorderState,
    next_chunk: u64,
    pending: Vec<RecorderEvent>,
    ended: bool,
    shared: Rc<RefCell<Shared>>,
}

impl SimulatedStream {
    fn chunk(&mut self) -> RecorderEvent {
        let data = format!("chunk-{};", self.next_chunk).into_bytes();
        self.next_chunk += 1;
        RecorderEvent::Data(data)
    }

    fn flush_and_stop(&mut self) {
        let last = self.chunk();
        self.pending.push(last);
        if self.delay_stop {
            self.stop_in_polls = Some(1);
        } else {
            self.pending.push(RecorderEvent::Stopped);
        }
        self.state = RecorderState::Inactive;
    }
}

impl MediaStream for SimulatedStream {
    fn supports_region_crop(&self) -> bool {
        self.crop
    }

    fn crop_to(&mut self, region: Rect) -> ReelResult<()> {
        if region.width() <= 0.0 || region.height() <= 0.0 {
            return Err(ReelError::capture("crop region must have a positive area"));
        }
        self.shared.borrow_mut().stats.crop = Some(region);
        Ok(())
    }

    fn start_recorder(&mut self, options: &RecorderOptions) -> ReelResult<()> {
        if self.fail_recorder {
            return Err(ReelError::recorder(format!(
                "unsupported recorder configuration for {}",
                options.format.mime()
            )));
        }
        self.shared.borrow_mut().stats.recorder_options = Some(*options);
        self.state = RecorderState::Recording;
        Ok(())
    }

    fn recorder_state(&self) -> RecorderState {
        self.state
    }

    fn stop_recorder(&mut self) {
        self.shared.borrow_mut().stats.stop_requests += 1;
        if self.state != RecorderState::Inactive {
            self.flush_and_stop();
        }
    }

    fn poll_events(&mut self) -> Vec<RecorderEvent> {
        match self.stop_in_polls {
            Some(0) => {
                self.pending.push(RecorderEvent::Stopped);
                self.stop_in_polls = None;
            }
            Some(n) => self.stop_in_polls = Some(n - 1),
            None => {}
        }
        let end_requested = self.shared.borrow().end_requested;
        if end_requested && !self.ended && self.state != RecorderState::Inactive {
            self.ended = true;
            let last = self.chunk();
            self.pending.push(last);
            self.pending.push(RecorderEvent::TrackEnded);
            self.pending.push(RecorderEvent::Stopped);
            self.state = RecorderState::Inactive;
        } else if self.state == RecorderState::Recording {
            let chunk = self.chunk();
            self.pending.push(chunk);
        }
        std::mem::take(&mut self.pending)
    }

    fn stop_tracks(&mut self) {
        self.shared.borrow_mut().stats.tracks_stopped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints() -> StreamConstraints {
        StreamConstraints {
            ideal_width: 1920,
            ideal_height: 1080,
            ideal_frame_rate: 30,
            audio: false,
            prefer_current_tab: true,
        }
    }

    #[test]
    fn denied_backend_never_acquires() {
        let mut backend = SimulatedBackend::new().denying();
        assert!(backend.acquire(&constraints()).is_err());
        assert_eq!(backend.stats().acquisitions, 0);
    }

    #[test]
    fn stream_emits_one_chunk_per_poll_while_recording() {
        let mut backend = SimulatedBackend::new();
        let mut stream = backend.acquire(&constraints()).unwrap();
        assert!(stream.poll_events().is_empty());

        stream
            .start_recorder(&RecorderOptions {
                format: ContainerFormat::WebM,
                video_bits_per_second: 1,
            })
            .unwrap();
        assert_eq!(
            stream.poll_events(),
            vec![RecorderEvent::Data(b"chunk-0;".to_vec())]
        );

        stream.stop_recorder();
        assert_eq!(stream.recorder_state(), RecorderState::Inactive);
        assert_eq!(
            stream.poll_events(),
            vec![
                RecorderEvent::Data(b"chunk-1;".to_vec()),
                RecorderEvent::Stopped
            ]
        );
        assert!(stream.poll_events().is_empty());
    }

    #[test]
    fn delayed_stop_confirms_on_the_second_poll() {
        let mut backend = SimulatedBackend::new().delaying_stop();
        let mut stream = backend.acquire(&constraints()).unwrap();
        stream
            .start_recorder(&RecorderOptions {
                format: ContainerFormat::Mp4,
                video_bits_per_second: 1,
            })
            .unwrap();

        stream.stop_recorder();
        assert_eq!(stream.recorder_state(), RecorderState::Inactive);
        assert_eq!(
            stream.poll_events(),
            vec![RecorderEvent::Data(b"chunk-0;".to_vec())]
        );
        assert_eq!(stream.poll_events(), vec![RecorderEvent::Stopped]);
        assert!(stream.poll_events().is_empty());
    }

    #[test]
    fn crop_rejects_degenerate_region() {
        let mut backend = SimulatedBackend::new();
        let mut stream = backend.acquire(&constraints()).unwrap();
        assert!(stream.crop_to(Rect::new(0.0, 0.0, 0.0, 10.0)).is_err());
    }
}
