//! Recording sequence state machine.
//!
//! Drives INTRO → scene 1..N → OUTRO while a capture is live. The machine is a reducer: it receives
//! [`SequenceEvent`]s and answers with [`Effect`]s for a runner to execute, so it never touches
//! clocks, timers or the capture stream itself. Every delay is a named field of
//! [`SequenceTimings`], and every delayed step is an explicit timer the runner hands back as
//! [`SequenceEvent::Timer`].
//!
//! Ordering guarantees:
//! - At most one transition step is pending at a time; the next one is scheduled only when the
//!   previous one fires, so pause → switch → reset → resume can never interleave.
//! - A completion is acted on exactly once: it is cleared in the same step that handles it, and a
//!   completion arriving while a transition is already under way is dropped.
//! - Timers that are not the currently pending ones, and any event at all while not recording, are
//!   no-ops.

use crate::{
    config::SequenceTimings,
    foundation::core::{Millis, SceneId},
    playback::FadeEffect,
    store::ScenePointer,
};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SeqTimer(pub u64);

/// Where the recording currently is.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "phase", content = "scene", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Intro,
    Scene(SceneId),
    Outro,
    /// Fade-out running; the capture stops when it ends.
    Finishing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
    BeginPlayback,
    SwitchTo(SceneId),
    ResetAfterSettle,
    Resume,
    EnterOutro,
    Finish,
}

/// Read-only view of the project the reducer needs for each decision.
#[derive(Clone, Copy, Debug)]
pub struct SequenceContext<'a> {
    pub scenes: &'a [SceneId],
    pub intro_enabled: bool,
    pub outro_enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceEvent {
    /// The capture session is live; take over playback.
    Started,
    /// A timer scheduled through [`Effect::Schedule`] fired.
    Timer(SeqTimer),
    /// The active scene finished its scroll (settle delay included).
    AnimationFinished,
    /// The active pointer was changed by someone other than the sequencer.
    PointerChanged(ScenePointer),
    /// The platform ended the capture stream mid-sequence.
    CaptureLost,
    /// The owner is going away; drop every timer.
    Teardown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    SetPlaying(bool),
    SetActive(ScenePointer),
    TriggerReset,
    SetFade(FadeEffect),
    ClearFinished,
    Schedule { timer: SeqTimer, after: Millis },
    Cancel(SeqTimer),
    StopCapture,
    SetExporting(bool),
    UnlockDimensions,
}

#[derive(Clone, Debug)]
pub struct Sequencer {
    timings: SequenceTimings,
    phase: Phase,
    recording: bool,
    pending: Option<(SeqTimer, Step)>,
    dwell: Option<SeqTimer>,
    fade_clear: Option<SeqTimer>,
    next_timer: u64,
}

impl Sequencer {
    pub fn new(timings: SequenceTimings) -> Self {
        Self {
            timings,
            phase: Phase::Idle,
            recording: false,
            pending: None,
            dwell: None,
            fade_clear: None,
            next_timer: 0,
        }
    }

    pub fn timings(&self) -> &SequenceTimings {
        &self.timings
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// True when `timer` is the running intro/outro dwell.
    pub fn is_dwell(&self, timer: SeqTimer) -> bool {
        self.dwell == Some(timer)
    }

    pub fn reduce(&mut self, event: SequenceEvent, ctx: &SequenceContext<'_>) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            SequenceEvent::Started => self.on_started(ctx, &mut fx),
            other if !self.recording => {
                tracing::debug!(event = ?other, "sequencer idle, event ignored");
            }
            SequenceEvent::Timer(timer) => self.on_timer(timer, ctx, &mut fx),
            SequenceEvent::AnimationFinished => self.on_finished(ctx, &mut fx),
            SequenceEvent::PointerChanged(pointer) => {
                if self.phase == Phase::Finishing {
                    tracing::debug!(%pointer, "pointer change during fade-out ignored");
                } else {
                    self.enter(pointer, &mut fx);
                }
            }
            SequenceEvent::CaptureLost => self.abort("capture stream lost", &mut fx),
            SequenceEvent::Teardown => self.abort("teardown", &mut fx),
        }
        fx
    }

    fn on_started(&mut self, ctx: &SequenceContext<'_>, fx: &mut Vec<Effect>) {
        if self.recording {
            tracing::warn!("sequence already running, start ignored");
            return;
        }
        let Some(first) = ctx.scenes.first() else {
            tracing::warn!("no scenes to record");
            return;
        };
        tracing::info!(
            scenes = ctx.scenes.len(),
            intro = ctx.intro_enabled,
            outro = ctx.outro_enabled,
            "sequence started"
        );
        self.recording = true;
        self.phase = Phase::Idle;

        fx.push(Effect::SetExporting(true));
        fx.push(Effect::SetPlaying(false));
        fx.push(Effect::ClearFinished);
        fx.push(Effect::SetFade(FadeEffect::FadeIn));
        let clear = self.alloc();
        self.fade_clear = Some(clear);
        fx.push(Effect::Schedule {
            timer: clear,
            after: self.timings.fade(),
        });

        let opening = if ctx.intro_enabled {
            ScenePointer::Intro
        } else {
            ScenePointer::Scene(first.clone())
        };
        self.activate(opening, fx);
        fx.push(Effect::TriggerReset);
        self.schedule(Step::BeginPlayback, self.timings.start_delay(), fx);
    }

    fn on_timer(&mut self, timer: SeqTimer, ctx: &SequenceContext<'_>, fx: &mut Vec<Effect>) {
        if self.fade_clear == Some(timer) {
            self.fade_clear = None;
            fx.push(Effect::SetFade(FadeEffect::None));
            return;
        }
        if self.dwell == Some(timer) {
            self.dwell = None;
            tracing::debug!(phase = ?self.phase, "dwell elapsed");
            // A dwell shorter than the start delay overtakes the first playback.
            if let Some((pending, _)) = self.pending.take() {
                fx.push(Effect::Cancel(pending));
            }
            self.on_finished(ctx, fx);
            return;
        }
        match self.pending.take() {
            Some((id, step)) if id == timer => self.run_step(step, fx),
            other => {
                self.pending = other;
                tracing::debug!(?timer, "stale timer ignored");
            }
        }
    }

    fn run_step(&mut self, step: Step, fx: &mut Vec<Effect>) {
        tracing::debug!(?step, "transition step");
        match step {
            Step::BeginPlayback | Step::Resume => fx.push(Effect::SetPlaying(true)),
            Step::SwitchTo(id) => {
                self.activate(ScenePointer::Scene(id), fx);
                self.schedule(Step::ResetAfterSettle, self.timings.scene_settle(), fx);
            }
            Step::ResetAfterSettle => {
                fx.push(Effect::TriggerReset);
                self.schedule(Step::Resume, self.timings.scene_resume(), fx);
            }
            Step::EnterOutro => self.activate(ScenePointer::Outro, fx),
            Step::Finish => self.finish(fx),
        }
    }

    fn on_finished(&mut self, ctx: &SequenceContext<'_>, fx: &mut Vec<Effect>) {
        if self.pending.is_some() {
            tracing::debug!(phase = ?self.phase, "completion during a transition dropped");
            fx.push(Effect::ClearFinished);
            return;
        }

        match self.phase.clone() {
            Phase::Intro => {
                fx.push(Effect::ClearFinished);
                fx.push(Effect::SetPlaying(false));
                let Some(first) = ctx.scenes.first() else {
                    self.abort("scene list emptied mid-recording", fx);
                    return;
                };
                tracing::info!(scene = %first, "intro done");
                self.activate(ScenePointer::Scene(first.clone()), fx);
                fx.push(Effect::TriggerReset);
                self.schedule(Step::Resume, self.timings.intro_exit(), fx);
            }
            Phase::Outro => {
                fx.push(Effect::ClearFinished);
                tracing::info!("outro done");
                self.begin_fade_out(fx);
            }
            Phase::Scene(id) => {
                fx.push(Effect::ClearFinished);
                fx.push(Effect::SetPlaying(false));
                // A scene removed mid-recording has no successor and ends the sequence.
                let next = ctx
                    .scenes
                    .iter()
                    .position(|s| s == &id)
                    .and_then(|i| ctx.scenes.get(i + 1));
                match next {
                    Some(next) => {
                        tracing::info!(from = %id, to = %next, "scene done");
                        self.schedule(Step::SwitchTo(next.clone()), self.timings.scene_exit(), fx);
                    }
                    None if ctx.outro_enabled => {
                        tracing::info!(scene = %id, "last scene done, outro next");
                        self.schedule(Step::EnterOutro, self.timings.outro_enter(), fx);
                    }
                    None => {
                        tracing::info!(scene = %id, "last scene done");
                        self.begin_fade_out(fx);
                    }
                }
            }
            Phase::Idle | Phase::Finishing => fx.push(Effect::ClearFinished),
        }
    }

    fn begin_fade_out(&mut self, fx: &mut Vec<Effect>) {
        if let Some(clear) = self.fade_clear.take() {
            fx.push(Effect::Cancel(clear));
        }
        self.cancel_dwell(fx);
        fx.push(Effect::SetFade(FadeEffect::FadeOut));
        self.phase = Phase::Finishing;
        self.schedule(Step::Finish, self.timings.fade(), fx);
    }

    fn finish(&mut self, fx: &mut Vec<Effect>) {
        tracing::info!("sequence completed");
        fx.push(Effect::StopCapture);
        fx.push(Effect::SetExporting(false));
        fx.push(Effect::SetPlaying(false));
        fx.push(Effect::UnlockDimensions);
        fx.push(Effect::SetFade(FadeEffect::None));
        fx.push(Effect::ClearFinished);
        self.reset_state(fx);
    }

    fn abort(&mut self, reason: &str, fx: &mut Vec<Effect>) {
        tracing::warn!(reason, phase = ?self.phase, "sequence aborted");
        fx.push(Effect::SetPlaying(false));
        fx.push(Effect::StopCapture);
        fx.push(Effect::SetExporting(false));
        fx.push(Effect::UnlockDimensions);
        fx.push(Effect::SetFade(FadeEffect::None));
        fx.push(Effect::ClearFinished);
        self.reset_state(fx);
    }

    fn reset_state(&mut self, fx: &mut Vec<Effect>) {
        if let Some((timer, _)) = self.pending.take() {
            fx.push(Effect::Cancel(timer));
        }
        if let Some(timer) = self.fade_clear.take() {
            fx.push(Effect::Cancel(timer));
        }
        self.cancel_dwell(fx);
        self.recording = false;
        self.phase = Phase::Idle;
    }

    fn activate(&mut self, pointer: ScenePointer, fx: &mut Vec<Effect>) {
        fx.push(Effect::SetActive(pointer.clone()));
        self.enter(pointer, fx);
    }

    /// Track the new position and (re)arm the dwell timer for static cards.
    fn enter(&mut self, pointer: ScenePointer, fx: &mut Vec<Effect>) {
        self.cancel_dwell(fx);
        let dwell = match &pointer {
            ScenePointer::Intro => Some(self.timings.intro_dwell()),
            ScenePointer::Outro => Some(self.timings.outro_dwell()),
            ScenePointer::Scene(_) => None,
        };
        self.phase = match pointer {
            ScenePointer::Intro => Phase::Intro,
            ScenePointer::Outro => Phase::Outro,
            ScenePointer::Scene(id) => Phase::Scene(id),
        };
        tracing::info!(phase = ?self.phase, "entered");
        if let Some(after) = dwell {
            let timer = self.alloc();
            self.dwell = Some(timer);
            fx.push(Effect::Schedule { timer, after });
        }
    }

    fn cancel_dwell(&mut self, fx: &mut Vec<Effect>) {
        if let Some(timer) = self.dwell.take() {
            fx.push(Effect::Cancel(timer));
        }
    }

    fn schedule(&mut self, step: Step, after: Millis, fx: &mut Vec<Effect>) {
        if let Some((old, _)) = self.pending.take() {
            fx.push(Effect::Cancel(old));
        }
        let timer = self.alloc();
        self.pending = Some((timer, step));
        fx.push(Effect::Schedule { timer, after });
    }

    fn alloc(&mut self) -> SeqTimer {
        self.next_timer += 1;
        SeqTimer(self.next_timer)
    }
}
