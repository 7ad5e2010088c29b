use crate::{
    anim_ease::Ease,
    foundation::core::{Millis, Size},
};

/// Overlay driver used to mask the first and last frames of a capture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FadeEffect {
    #[default]
    None,
    FadeIn,
    FadeOut,
}

pub const FADE_EASE: Ease = Ease::OutQuint;

impl FadeEffect {
    /// Black overlay opacity `elapsed` into a fade lasting `duration`.
    ///
    /// `FadeIn` starts fully opaque and clears; `FadeOut` goes the other way; `None` is
    /// transparent.
    pub fn overlay_opacity(self, elapsed: Millis, duration: Millis) -> f64 {
        let t = if duration.0 == 0 {
            1.0
        } else {
            elapsed.0 as f64 / duration.0 as f64
        };
        match self {
            Self::None => 0.0,
            Self::FadeIn => FADE_EASE.lerp(1.0, 0.0, t),
            Self::FadeOut => FADE_EASE.lerp(0.0, 1.0, t),
        }
    }
}

/// Process-wide playback flags observed by the stage and the scroll animator.
///
/// Holds state only; the director decides when any of it changes.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct PlaybackSignal {
    is_playing: bool,
    reset_signal: u64,
    animation_finished: bool,
    video_duration: f64,
    fade_effect: FadeEffect,
    fade_since: Millis,
    locked_dimensions: Option<Size>,
    exporting: bool,
}

impl PlaybackSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Returns true when the value actually changed.
    pub fn set_playing(&mut self, playing: bool) -> bool {
        let changed = self.is_playing != playing;
        self.is_playing = playing;
        changed
    }

    /// Observers compare identity, not value: any change means "restart from zero".
    pub fn reset_signal(&self) -> u64 {
        self.reset_signal
    }

    pub fn trigger_reset(&mut self) -> u64 {
        self.reset_signal = self.reset_signal.wrapping_add(1);
        self.reset_signal
    }

    pub fn animation_finished(&self) -> bool {
        self.animation_finished
    }

    pub fn set_animation_finished(&mut self, finished: bool) {
        self.animation_finished = finished;
    }

    /// Advisory estimate in seconds. Never drives timing.
    pub fn video_duration(&self) -> f64 {
        self.video_duration
    }

    /// Ignores changes of 0.1s or less so a jittery measurement doesn't churn observers.
    pub fn set_video_duration(&mut self, secs: f64) -> bool {
        if (secs - self.video_duration).abs() > 0.1 {
            self.video_duration = secs;
            return true;
        }
        false
    }

    pub fn fade_effect(&self) -> FadeEffect {
        self.fade_effect
    }

    pub fn set_fade_effect(&mut self, effect: FadeEffect, now: Millis) {
        self.fade_effect = effect;
        self.fade_since = now;
    }

    pub fn overlay_opacity(&self, now: Millis, fade_duration: Millis) -> f64 {
        self.fade_effect.overlay_opacity(now - self.fade_since, fade_duration)
    }

    pub fn locked_dimensions(&self) -> Option<Size> {
        self.locked_dimensions
    }

    pub fn lock_dimensions(&mut self, size: Size) {
        self.locked_dimensions = Some(size);
    }

    pub fn unlock_dimensions(&mut self) {
        self.locked_dimensions = None;
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn set_exporting(&mut self, exporting: bool) {
        self.exporting = exporting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_signal_changes_identity_each_time() {
        let mut sig = PlaybackSignal::new();
        let a = sig.trigger_reset();
        let b = sig.trigger_reset();
        assert_ne!(a, b);
        assert_eq!(sig.reset_signal(), b);
    }

    #[test]
    fn video_duration_ignores_small_jitter() {
        let mut sig = PlaybackSignal::new();
        assert!(sig.set_video_duration(5.0));
        assert!(!sig.set_video_duration(5.05));
        assert_eq!(sig.video_duration(), 5.0);
        assert!(sig.set_video_duration(5.2));
    }

    #[test]
    fn set_playing_reports_edges() {
        let mut sig = PlaybackSignal::new();
        assert!(sig.set_playing(true));
        assert!(!sig.set_playing(true));
        assert!(sig.set_playing(false));
    }

    #[test]
    fn fade_overlay_endpoints() {
        let d = Millis(1000);
        assert_eq!(FadeEffect::FadeIn.overlay_opacity(Millis::ZERO, d), 1.0);
        assert_eq!(FadeEffect::FadeIn.overlay_opacity(d, d), 0.0);
        assert_eq!(FadeEffect::FadeOut.overlay_opacity(Millis::ZERO, d), 0.0);
        assert_eq!(FadeEffect::FadeOut.overlay_opacity(Millis(5000), d), 1.0);
        assert_eq!(FadeEffect::None.overlay_opacity(Millis(10), d), 0.0);
        assert_eq!(FadeEffect::FadeOut.overlay_opacity(Millis(10), Millis::ZERO), 1.0);
    }

    #[test]
    fn overlay_tracks_time_since_fade_started() {
        let mut sig = PlaybackSignal::new();
        sig.set_fade_effect(FadeEffect::FadeOut, Millis(2000));
        assert_eq!(sig.overlay_opacity(Millis(2000), Millis(1000)), 0.0);
        let mid = sig.overlay_opacity(Millis(2500), Millis(1000));
        assert!(mid > 0.5 && mid < 1.0);
    }

    #[test]
    fn fade_effect_serializes_camel_case() {
        let s = serde_json::to_string(&FadeEffect::FadeIn).unwrap();
        assert_eq!(s, "\"fadeIn\"");
    }

    #[test]
    fn dimension_lock_roundtrip() {
        let mut sig = PlaybackSignal::new();
        sig.lock_dimensions(Size::new(400.0, 711.0));
        assert_eq!(sig.locked_dimensions(), Some(Size::new(400.0, 711.0)));
        sig.unlock_dimensions();
        assert_eq!(sig.locked_dimensions(), None);
    }
}
