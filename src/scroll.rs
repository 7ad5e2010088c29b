use crate::{
    anim_ease::Ease,
    config::SequenceTimings,
    foundation::core::Millis,
    model::{AspectRatio, Scene},
};

/// Floor so a speed of 0 still crawls instead of freezing.
pub const MIN_PIXELS_PER_SECOND: f64 = 10.0;
pub const PIXELS_PER_SPEED_UNIT: f64 = 5.0;

pub fn pixels_per_second(scroll_speed: u8) -> f64 {
    (f64::from(scroll_speed) * PIXELS_PER_SPEED_UNIT).max(MIN_PIXELS_PER_SECOND)
}

/// Heights reported back by the phone-mockup renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct ContentMetrics {
    pub content_height: f64,
    pub viewport_height: f64,
}

impl ContentMetrics {
    /// Content shorter than the viewport never scrolls.
    pub fn max_scroll(&self) -> f64 {
        let d = self.content_height - self.viewport_height;
        if d.is_finite() { d.max(0.0) } else { 0.0 }
    }
}

/// The renderer's write-back channel: how tall a scene's screenshot stack lays out.
pub trait LayoutProbe {
    fn measure(&self, scene: &Scene, aspect: AspectRatio) -> ContentMetrics;
}

/// Lays every screenshot out at the same height inside a fixed viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformProbe {
    pub shot_height: f64,
    pub viewport_height: f64,
}

impl Default for UniformProbe {
    fn default() -> Self {
        // 300x600 phone with an 8px bezel; screenshots scaled to the 284px screen width.
        Self {
            shot_height: 615.0,
            viewport_height: 584.0,
        }
    }
}

impl LayoutProbe for UniformProbe {
    fn measure(&self, scene: &Scene, _aspect: AspectRatio) -> ContentMetrics {
        let content_height = if scene.screenshots.is_empty() {
            0.0
        } else {
            self.shot_height * scene.screenshots.len() as f64
        };
        ContentMetrics {
            content_height,
            viewport_height: self.viewport_height,
        }
    }
}

/// A linear run from `from` to `to` (offsets are <= 0, content moves up).
#[derive(Clone, Copy, Debug, PartialEq)]
struct ScrollRun {
    from: f64,
    to: f64,
    started_at: Millis,
    duration: Millis,
}

impl ScrollRun {
    fn offset_at(&self, now: Millis) -> f64 {
        if self.duration.0 == 0 {
            return self.to;
        }
        let t = (now - self.started_at).0 as f64 / self.duration.0 as f64;
        Ease::Linear.lerp(self.from, self.to, t)
    }

    fn ends_at(&self) -> Millis {
        self.started_at + self.duration
    }
}

/// A scheduled completion: the run identified by `generation` reaches the bottom at `at`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollDeadline {
    pub generation: u64,
    pub at: Millis,
}

/// Vertical offset animation over the active scene's screenshot stack.
///
/// Every halt, reset, reflow or restart bumps the generation, so a completion deadline handed out
/// earlier can be recognised as stale.
#[derive(Clone, Debug, Default)]
pub struct ScrollAnimator {
    offset: f64,
    metrics: ContentMetrics,
    scroll_speed: u8,
    run: Option<ScrollRun>,
    generation: u64,
}

impl ScrollAnimator {
    pub fn new(scroll_speed: u8) -> Self {
        Self {
            scroll_speed,
            ..Self::default()
        }
    }

    pub fn max_scroll(&self) -> f64 {
        self.metrics.max_scroll()
    }

    pub fn metrics(&self) -> ContentMetrics {
        self.metrics
    }

    pub fn scroll_speed(&self) -> u8 {
        self.scroll_speed
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_animating(&self) -> bool {
        self.run.is_some()
    }

    pub fn offset_at(&self, now: Millis) -> f64 {
        match &self.run {
            Some(run) => run.offset_at(now),
            None => self.offset,
        }
    }

    /// Seconds to cover the remaining distance from the current offset.
    pub fn remaining_secs(&self, now: Millis) -> f64 {
        let remaining = (-self.max_scroll() - self.offset_at(now)).abs();
        remaining / pixels_per_second(self.scroll_speed)
    }

    /// Start (or resume) the run to the bottom. Returns `None` when there is nothing to scroll.
    pub fn play(&mut self, now: Millis) -> Option<ScrollDeadline> {
        if self.max_scroll() <= 0.0 {
            return None;
        }
        let from = self.offset_at(now);
        let duration = Millis::from_secs_f64(self.remaining_secs(now));
        self.generation += 1;
        let run = ScrollRun {
            from,
            to: -self.max_scroll(),
            started_at: now,
            duration,
        };
        let deadline = ScrollDeadline {
            generation: self.generation,
            at: run.ends_at(),
        };
        tracing::debug!(from, to = run.to, duration = %duration, "scroll run started");
        self.run = Some(run);
        Some(deadline)
    }

    /// Halt in place. No rewind.
    pub fn pause(&mut self, now: Millis) {
        if let Some(run) = self.run.take() {
            self.offset = run.offset_at(now);
            self.generation += 1;
        }
    }

    /// Halt and snap to the top, discarding any run in flight.
    pub fn reset(&mut self) {
        self.run = None;
        self.offset = 0.0;
        self.generation += 1;
    }

    /// New content measurements (screenshots or aspect ratio changed). Implies a reset.
    pub fn reflow(&mut self, metrics: ContentMetrics) {
        self.metrics = metrics;
        self.reset();
    }

    /// Change speed; a run in flight is re-planned from where it currently is.
    pub fn set_scroll_speed(&mut self, speed: u8, now: Millis) -> Option<ScrollDeadline> {
        self.scroll_speed = speed;
        if self.run.is_some() {
            self.pause(now);
            return self.play(now);
        }
        None
    }

    /// Settle a run whose deadline has arrived. Stale generations are ignored.
    pub fn complete(&mut self, generation: u64, now: Millis) -> bool {
        match &self.run {
            Some(run) if generation == self.generation && now >= run.ends_at() => {
                self.offset = run.to;
                self.run = None;
                true
            }
            _ => false,
        }
    }

    /// Advisory whole-sequence length in seconds for the current scene. Display only.
    pub fn estimate_video_duration(
        &self,
        intro_enabled: bool,
        outro_enabled: bool,
        timings: &SequenceTimings,
    ) -> f64 {
        estimate_video_duration(
            self.max_scroll(),
            self.scroll_speed,
            intro_enabled,
            outro_enabled,
            timings,
        )
    }
}

/// Intro dwell + full scroll time + buffer + outro dwell, in seconds.
pub fn estimate_video_duration(
    max_scroll: f64,
    scroll_speed: u8,
    intro_enabled: bool,
    outro_enabled: bool,
    timings: &SequenceTimings,
) -> f64 {
    let scroll = if max_scroll > 0.0 {
        max_scroll / pixels_per_second(scroll_speed)
    } else {
        0.0
    };
    let intro = if intro_enabled {
        timings.intro_dwell().as_secs_f64()
    } else {
        0.0
    };
    let outro = if outro_enabled {
        timings.outro_dwell().as_secs_f64()
    } else {
        0.0
    };
    intro + scroll + timings.estimate_buffer().as_secs_f64() + outro
}
