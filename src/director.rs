use crate::{
    capture::{CaptureBackend, CaptureSession, ExportArtifact},
    config::{ContainerFormat, ProjectFile, SequenceTimings},
    foundation::core::{Millis, Rect, SceneId},
    foundation::error::{ReelError, ReelResult},
    model::{AspectRatio, AudioTrack, IntroCard, OutroCard},
    playback::{FadeEffect, PlaybackSignal},
    scroll::{LayoutProbe, ScrollAnimator, UniformProbe, estimate_video_duration},
    sequence::{Effect, Phase, SeqTimer, SequenceContext, SequenceEvent, Sequencer},
    store::{SceneStore, ScenePointer},
    timers::TimerQueue,
};

const CANVAS_WIDTH: f64 = 400.0;
/// Recorder timeslice: how often a live capture is drained.
pub const CAPTURE_POLL: Millis = Millis(1000);

/// On-screen canvas for an aspect ratio, before any explicit bounds are reported.
pub fn default_canvas(aspect: AspectRatio) -> Rect {
    let height = match aspect {
        AspectRatio::Square => CANVAS_WIDTH,
        AspectRatio::Portrait => (CANVAS_WIDTH * 16.0 / 9.0).round(),
    };
    Rect::new(0.0, 0.0, CANVAS_WIDTH, height)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Wake {
    Sequence(SeqTimer),
    /// A scroll run of this generation reaches the bottom.
    ScrollDone(u64),
    /// Post-scroll settle before completion is reported.
    Settle(u64),
    CapturePoll,
}

impl Wake {
    fn is_scroll(&self) -> bool {
        matches!(self, Self::ScrollDone(_) | Self::Settle(_))
    }
}

/// Whatever the scroll extent depends on. A change means a content reflow.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LayoutKey {
    scene: SceneId,
    screenshots: Vec<String>,
    aspect: AspectRatio,
}

/// Observable changes, in the order they happened.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TimelineEntry {
    pub at: Millis,
    #[serde(flatten)]
    pub event: TimelineKind,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineKind {
    ActiveScene { pointer: ScenePointer },
    Playing { playing: bool },
    Reset { signal: u64 },
    Fade { effect: FadeEffect },
    AnimationFinished { scene: SceneId },
    CaptureStarted { format: ContainerFormat },
    CaptureStopRequested,
    StreamEnded,
    ArtifactReady {
        file_name: String,
        bytes: usize,
        chunks: usize,
        complete: bool,
    },
}

/// Runs the editor on a single clock: owns the scene store, playback flags, scroll animator,
/// sequencer and capture session, and executes every effect the sequencer asks for.
///
/// Time only moves through [`Director::advance_to`] / [`Director::advance_by`], so a run is fully
/// deterministic for a given project, probe and backend.
pub struct Director {
    store: SceneStore,
    intro: IntroCard,
    outro: OutroCard,
    audio: AudioTrack,
    aspect_ratio: AspectRatio,
    playback: PlaybackSignal,
    animator: ScrollAnimator,
    sequencer: Sequencer,
    session: CaptureSession,
    queue: TimerQueue<Wake>,
    now: Millis,
    probe: Box<dyn LayoutProbe>,
    layout: Option<LayoutKey>,
    canvas: Option<Rect>,
    artifact: Option<ExportArtifact>,
    timeline: Vec<TimelineEntry>,
}

impl std::fmt::Debug for Director {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Director")
            .field("now", &self.now)
            .field("active", self.store.active())
            .field("phase", self.sequencer.phase())
            .field("session", &self.session)
            .field("pending_timers", &self.queue.len())
            .finish()
    }
}

impl Director {
    pub fn new(project: ProjectFile, probe: Box<dyn LayoutProbe>) -> ReelResult<Self> {
        project.validate()?;
        let ProjectFile {
            scenes,
            intro,
            outro,
            audio,
            aspect_ratio,
            timings,
            recorder,
        } = project;
        let store = SceneStore::from_scenes(scenes)?;
        let speed = store.active_scene().scroll_speed;

        let mut director = Self {
            store,
            intro,
            outro,
            audio,
            aspect_ratio,
            playback: PlaybackSignal::new(),
            animator: ScrollAnimator::new(speed),
            sequencer: Sequencer::new(timings),
            session: CaptureSession::new(recorder),
            queue: TimerQueue::new(),
            now: Millis::ZERO,
            probe,
            layout: None,
            canvas: None,
            artifact: None,
            timeline: Vec::new(),
        };
        director.sync_scene();
        Ok(director)
    }

    /// A director measuring with [`UniformProbe`] defaults.
    pub fn from_project(project: ProjectFile) -> ReelResult<Self> {
        Self::new(project, Box::new(UniformProbe::default()))
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn playback(&self) -> &PlaybackSignal {
        &self.playback
    }

    pub fn timings(&self) -> &SequenceTimings {
        self.sequencer.timings()
    }

    pub fn phase(&self) -> &Phase {
        self.sequencer.phase()
    }

    pub fn intro(&self) -> &IntroCard {
        &self.intro
    }

    pub fn outro(&self) -> &OutroCard {
        &self.outro
    }

    pub fn audio(&self) -> &AudioTrack {
        &self.audio
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// True while the sequence runs or the recorder has not yet delivered its artifact.
    pub fn is_recording(&self) -> bool {
        self.sequencer.is_recording() || self.session.is_recording()
    }

    pub fn artifact(&self) -> Option<&ExportArtifact> {
        self.artifact.as_ref()
    }

    pub fn take_artifact(&mut self) -> Option<ExportArtifact> {
        self.artifact.take()
    }

    pub fn clear_artifact(&mut self) {
        self.artifact = None;
    }

    pub fn scroll_offset(&self) -> f64 {
        self.animator.offset_at(self.now)
    }

    pub fn max_scroll(&self) -> f64 {
        self.animator.max_scroll()
    }

    pub fn overlay_opacity(&self) -> f64 {
        self.playback.overlay_opacity(self.now, self.sequencer.timings().fade())
    }

    pub fn canvas_bounds(&self) -> Rect {
        self.canvas.unwrap_or_else(|| default_canvas(self.aspect_ratio))
    }

    /// Where the canvas currently sits on screen; the capture is cropped to it.
    pub fn set_canvas_bounds(&mut self, bounds: Rect) {
        self.canvas = Some(bounds);
    }

    /// Mutate the scene store, then bring playback in line with the result.
    ///
    /// Pointer changes made here are reported to a running sequence so a pending dwell can be
    /// cancelled.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut SceneStore) -> R) -> R {
        let before = self.store.active().clone();
        let out = f(&mut self.store);
        let after = self.store.active().clone();
        if before != after {
            self.record(TimelineKind::ActiveScene {
                pointer: after.clone(),
            });
            self.dispatch(SequenceEvent::PointerChanged(after));
        }
        self.sync_scene();
        out
    }

    pub fn set_active_scene(&mut self, pointer: ScenePointer) {
        self.edit(|store| store.set_active_scene(pointer));
    }

    pub fn set_aspect_ratio(&mut self, aspect: AspectRatio) {
        if self.aspect_ratio != aspect {
            self.aspect_ratio = aspect;
            self.sync_scene();
        }
    }

    pub fn set_intro(&mut self, intro: IntroCard) {
        self.intro = intro;
        self.refresh_estimate();
    }

    pub fn set_outro(&mut self, outro: OutroCard) {
        self.outro = outro;
        self.refresh_estimate();
    }

    pub fn set_audio(&mut self, audio: AudioTrack) -> ReelResult<()> {
        audio.validate()?;
        self.audio = audio;
        Ok(())
    }

    /// Preview play/pause. A running recording owns playback, so this is refused then.
    pub fn set_playing(&mut self, playing: bool) -> bool {
        if self.sequencer.is_recording() {
            tracing::warn!(playing, "playback is driven by the recording");
            return false;
        }
        self.apply_playing(playing);
        true
    }

    /// Preview reset: snap the active scene back to the top.
    pub fn reset(&mut self) {
        self.apply_reset();
    }

    /// Advisory full-sequence length for each scene, in seconds.
    pub fn scene_estimates(&self) -> Vec<(SceneId, f64)> {
        self.store
            .scenes()
            .iter()
            .map(|scene| {
                let metrics = self.probe.measure(scene, self.aspect_ratio);
                let secs = estimate_video_duration(
                    metrics.max_scroll(),
                    scene.scroll_speed,
                    self.intro.enabled,
                    self.outro.enabled,
                    self.sequencer.timings(),
                );
                (scene.id.clone(), secs)
            })
            .collect()
    }

    /// Open a capture of the canvas and hand playback to the sequencer.
    ///
    /// A refused or failed capture leaves everything as it was, apart from a cleared artifact.
    #[tracing::instrument(skip(self, backend))]
    pub fn start_recording(
        &mut self,
        backend: &mut dyn CaptureBackend,
    ) -> ReelResult<ContainerFormat> {
        if self.is_recording() {
            return Err(ReelError::sequence("a recording is already in progress"));
        }
        self.artifact = None;

        let canvas = self.canvas_bounds();
        let format = self.session.start(backend, canvas, &mut self.playback)?;
        self.record(TimelineKind::CaptureStarted { format });
        self.queue.schedule(self.now + CAPTURE_POLL, Wake::CapturePoll);
        self.dispatch(SequenceEvent::Started);
        self.pump_capture();
        Ok(format)
    }

    /// Drop every pending timer and stop any capture in flight.
    ///
    /// The recorder keeps being drained until it reports the stop, so its tracks are released and
    /// the partial artifact still arrives.
    pub fn teardown(&mut self) {
        self.dispatch(SequenceEvent::Teardown);
        self.pump_capture();
        self.queue.cancel_where(|w| !matches!(w, Wake::CapturePoll));
        if self.session.is_recording() && !self.queue.is_scheduled(&Wake::CapturePoll) {
            self.queue.schedule(self.now + CAPTURE_POLL, Wake::CapturePoll);
        }
    }

    pub fn advance_by(&mut self, delta: Millis) {
        self.advance_to(self.now + delta);
    }

    /// Fire every timer due up to `target`, in deadline order, then settle the clock at `target`.
    pub fn advance_to(&mut self, target: Millis) {
        while let Some(at) = self.queue.next_deadline() {
            if at > target {
                break;
            }
            self.now = self.now.max(at);
            let Some((_, wake)) = self.queue.pop_due(self.now) else {
                break;
            };
            self.on_wake(wake);
            self.pump_capture();
        }
        self.now = self.now.max(target);
    }

    /// Drive the clock until the recording has finished and its artifact is assembled.
    pub fn run_until_idle(&mut self, limit: Millis) -> ReelResult<Millis> {
        while self.is_recording() {
            let Some(next) = self.queue.next_deadline() else {
                return Err(ReelError::sequence(format!(
                    "recording stalled at {} with nothing scheduled",
                    self.now
                )));
            };
            if next > limit {
                return Err(ReelError::sequence(format!(
                    "recording still running at {limit}"
                )));
            }
            self.advance_to(next);
        }
        Ok(self.now)
    }

    fn on_wake(&mut self, wake: Wake) {
        match wake {
            Wake::Sequence(timer) => {
                tracing::debug!(?timer, at = %self.now, "timer fired");
                self.dispatch(SequenceEvent::Timer(timer));
            }
            Wake::ScrollDone(generation) => {
                if !self.animator.complete(generation, self.now) {
                    return;
                }
                tracing::debug!(at = %self.now, "scroll reached the bottom");
                if self.playback.is_exporting() {
                    let settle = self.sequencer.timings().settle();
                    self.queue.schedule(self.now + settle, Wake::Settle(generation));
                }
            }
            Wake::Settle(generation) => {
                if generation != self.animator.generation() {
                    tracing::debug!(generation, "stale settle ignored");
                    return;
                }
                let scene = self.store.active_scene().id.clone();
                self.playback.set_animation_finished(true);
                self.record(TimelineKind::AnimationFinished { scene });
                self.dispatch(SequenceEvent::AnimationFinished);
            }
            Wake::CapturePoll => {
                if self.session.is_recording() {
                    self.queue.schedule(self.now + CAPTURE_POLL, Wake::CapturePoll);
                }
            }
        }
    }

    fn dispatch(&mut self, event: SequenceEvent) {
        let ids = self.store.ids();
        let ctx = SequenceContext {
            scenes: &ids,
            intro_enabled: self.intro.enabled,
            outro_enabled: self.outro.enabled,
        };
        let effects = self.sequencer.reduce(event, &ctx);
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::SetPlaying(playing) => self.apply_playing(playing),
            Effect::SetActive(pointer) => {
                self.store.set_active_scene(pointer.clone());
                self.record(TimelineKind::ActiveScene { pointer });
                self.sync_scene();
            }
            Effect::TriggerReset => self.apply_reset(),
            Effect::SetFade(effect) => {
                if self.playback.fade_effect() != effect {
                    self.playback.set_fade_effect(effect, self.now);
                    self.record(TimelineKind::Fade { effect });
                }
            }
            Effect::ClearFinished => self.playback.set_animation_finished(false),
            Effect::Schedule { timer, after } => {
                tracing::debug!(?timer, %after, "timer scheduled");
                self.queue.schedule(self.now + after, Wake::Sequence(timer));
            }
            Effect::Cancel(timer) => {
                if self.queue.cancel(&Wake::Sequence(timer)) {
                    tracing::debug!(?timer, "timer cancelled");
                }
            }
            Effect::StopCapture => {
                if self.session.stop() {
                    self.record(TimelineKind::CaptureStopRequested);
                }
            }
            Effect::SetExporting(exporting) => self.playback.set_exporting(exporting),
            Effect::UnlockDimensions => self.playback.unlock_dimensions(),
        }
    }

    fn apply_playing(&mut self, playing: bool) {
        if !self.playback.set_playing(playing) {
            return;
        }
        self.record(TimelineKind::Playing { playing });
        if playing {
            self.start_scroll();
        } else {
            self.animator.pause(self.now);
            self.cancel_scroll_wakes();
        }
    }

    fn apply_reset(&mut self) {
        let signal = self.playback.trigger_reset();
        self.animator.reset();
        self.cancel_scroll_wakes();
        self.record(TimelineKind::Reset { signal });
        if self.playback.is_playing() {
            self.start_scroll();
        }
    }

    /// Begin the run to the bottom of the active scene. Cards never scroll.
    fn start_scroll(&mut self) {
        if self.store.active().is_virtual() {
            return;
        }
        match self.animator.play(self.now) {
            Some(deadline) => {
                self.queue.schedule(deadline.at, Wake::ScrollDone(deadline.generation));
            }
            None if self.playback.is_exporting() => {
                // Nothing to scroll: report completion once the frame has settled.
                let settle = self.sequencer.timings().settle();
                let generation = self.animator.generation();
                self.queue.schedule(self.now + settle, Wake::Settle(generation));
            }
            None => {}
        }
    }

    fn cancel_scroll_wakes(&mut self) {
        self.queue.cancel_where(Wake::is_scroll);
    }

    /// Re-measure the active scene when its layout inputs changed, and follow speed edits.
    fn sync_scene(&mut self) {
        let (key, speed, metrics) = {
            let scene = self.store.active_scene();
            let key = LayoutKey {
                scene: scene.id.clone(),
                screenshots: scene.screenshots.clone(),
                aspect: self.aspect_ratio,
            };
            let metrics = self.probe.measure(scene, self.aspect_ratio);
            (key, scene.scroll_speed, metrics)
        };

        if self.layout.as_ref() != Some(&key) {
            tracing::debug!(
                scene = %key.scene,
                max_scroll = metrics.max_scroll(),
                "content reflow"
            );
            self.animator.reflow(metrics);
            self.animator.set_scroll_speed(speed, self.now);
            self.cancel_scroll_wakes();
            self.layout = Some(key);
            if self.playback.is_playing() {
                self.start_scroll();
            }
        } else if speed != self.animator.scroll_speed() {
            if let Some(deadline) = self.animator.set_scroll_speed(speed, self.now) {
                self.cancel_scroll_wakes();
                self.queue.schedule(deadline.at, Wake::ScrollDone(deadline.generation));
            }
        }
        self.refresh_estimate();
    }

    fn refresh_estimate(&mut self) {
        let secs = self.animator.estimate_video_duration(
            self.intro.enabled,
            self.outro.enabled,
            self.sequencer.timings(),
        );
        if self.playback.set_video_duration(secs) {
            tracing::debug!(secs, "video duration estimate");
        }
    }

    fn pump_capture(&mut self) {
        let update = self.session.pump();
        if update.stream_ended {
            self.record(TimelineKind::StreamEnded);
        }
        if let Some(artifact) = update.artifact {
            self.record(TimelineKind::ArtifactReady {
                file_name: artifact.file_name(),
                bytes: artifact.len(),
                chunks: artifact.chunk_count,
                complete: artifact.complete,
            });
            self.artifact = Some(artifact);
        }
        if update.stream_ended {
            self.dispatch(SequenceEvent::CaptureLost);
        }
    }

    fn record(&mut self, event: TimelineKind) {
        tracing::trace!(at = %self.now, ?event, "timeline");
        self.timeline.push(TimelineEntry { at: self.now, event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::simulated::SimulatedBackend;
    use crate::model::Scene;

    fn probe() -> Box<dyn LayoutProbe> {
        Box::new(UniformProbe {
            shot_height: 392.0,
            viewport_height: 584.0,
        })
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn project_with_shots(shots: usize) -> ProjectFile {
        let mut scene = Scene::initial();
        scene.screenshots = (0..shots).map(|i| format!("blob:shot-{i}")).collect();
        ProjectFile {
            scenes: vec![scene],
            ..ProjectFile::default()
        }
    }

    #[test]
    fn preview_scroll_runs_to_bottom_without_settle() {
        // 2 x 392 - 584 = 200px at 100px/s
        let mut d = Director::new(project_with_shots(2), probe()).unwrap();
        assert_eq!(d.max_scroll(), 200.0);

        assert!(d.set_playing(true));
        d.advance_to(Millis(1000));
        assert_eq!(d.scroll_offset(), -100.0);
        d.advance_to(Millis(5000));
        assert_eq!(d.scroll_offset(), -200.0);
        assert!(!d.playback().animation_finished());
        assert!(d.timeline().iter().all(|e| !matches!(
            e.event,
            TimelineKind::AnimationFinished { .. }
        )));
    }

    #[test]
    fn pause_holds_offset_and_resume_continues() {
        let mut d = Director::new(project_with_shots(2), probe()).unwrap();
        d.set_playing(true);
        d.advance_to(Millis(500));
        d.set_playing(false);
        d.advance_to(Millis(3000));
        assert_eq!(d.scroll_offset(), -50.0);

        d.set_playing(true);
        d.advance_to(Millis(4000));
        assert!(close(d.scroll_offset(), -150.0));
    }

    #[test]
    fn screenshot_edit_reflows_and_snaps_to_top() {
        let mut d = Director::new(project_with_shots(2), probe()).unwrap();
        d.set_playing(true);
        d.advance_to(Millis(1000));

        d.edit(|s| s.add_screenshots(["blob:extra"]));
        assert_eq!(d.max_scroll(), 592.0);
        // still playing, so the run restarts from the top
        d.advance_to(Millis(2000));
        assert!(close(d.scroll_offset(), -100.0));
    }

    #[test]
    fn aspect_change_is_a_reflow() {
        let mut d = Director::new(project_with_shots(2), probe()).unwrap();
        d.set_playing(true);
        d.advance_to(Millis(1000));
        let resets = d
            .timeline()
            .iter()
            .filter(|e| matches!(e.event, TimelineKind::Reset { .. }))
            .count();

        d.set_aspect_ratio(AspectRatio::Portrait);
        assert_eq!(d.canvas_bounds().height(), 711.0);
        assert_eq!(d.scroll_offset(), 0.0);
        // reflow is not a reset signal
        assert_eq!(
            d.timeline()
                .iter()
                .filter(|e| matches!(e.event, TimelineKind::Reset { .. }))
                .count(),
            resets
        );
    }

    #[test]
    fn speed_edit_replans_running_scroll() {
        let mut d = Director::new(project_with_shots(2), probe()).unwrap();
        d.set_playing(true);
        d.advance_to(Millis(1000));
        d.edit(|s| s.set_scroll_speed(40));
        d.advance_to(Millis(1500));
        assert_eq!(d.scroll_offset(), -200.0);
    }

    #[test]
    fn estimate_tracks_cards_and_content() {
        let mut d = Director::new(project_with_shots(2), probe()).unwrap();
        assert_eq!(d.playback().video_duration(), 3.0);

        d.set_intro(IntroCard {
            enabled: true,
            ..IntroCard::default()
        });
        assert_eq!(d.playback().video_duration(), 6.0);

        let estimates = d.scene_estimates();
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].1, 6.0);
    }

    #[test]
    fn preview_controls_refused_while_recording() {
        let mut d = Director::new(project_with_shots(0), probe()).unwrap();
        let mut backend = SimulatedBackend::new();
        d.start_recording(&mut backend).unwrap();
        assert!(!d.set_playing(true));
        assert!(d.start_recording(&mut backend).is_err());
        assert_eq!(backend.stats().acquisitions, 1);
    }

    #[test]
    fn teardown_mid_recording_stops_capture_and_timers() {
        let mut d = Director::new(project_with_shots(4), probe()).unwrap();
        let mut backend = SimulatedBackend::new();
        d.start_recording(&mut backend).unwrap();
        d.advance_to(Millis(1500));

        d.teardown();
        assert!(!d.is_recording());
        assert!(d.artifact().is_some());
        assert_eq!(d.playback().locked_dimensions(), None);

        let len = d.timeline().len();
        d.advance_to(Millis(60_000));
        assert_eq!(d.timeline().len(), len);
    }
}
