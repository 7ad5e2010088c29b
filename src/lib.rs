#![forbid(unsafe_code)]

pub mod anim_ease;
pub mod capture;
pub mod config;
pub mod director;
pub mod foundation;
pub mod model;
pub mod playback;
pub mod scroll;
pub mod sequence;
pub mod store;
pub mod timers;

pub use anim_ease::Ease;
pub use capture::{
    CaptureBackend, CaptureSession, ExportArtifact, MediaStream,
    simulated::{SimulatedBackend, SimulatedStats},
};
pub use config::{ContainerFormat, ProjectFile, RecorderSettings, SequenceTimings};
pub use director::{Director, TimelineEntry, TimelineKind};
pub use foundation::core::{Millis, Rect, SceneId, Size};
pub use foundation::error::{ReelError, ReelResult};
pub use model::{
    AspectRatio, AudioTrack, Background, BackgroundSettings, IntroCard, OutroCard, PhoneColor,
    Scene,
};
pub use playback::{FadeEffect, PlaybackSignal};
pub use scroll::{ContentMetrics, LayoutProbe, ScrollAnimator, UniformProbe};
pub use sequence::{Effect, Phase, SequenceEvent, Sequencer};
pub use store::{SceneStore, ScenePointer, resolve_target_scene};
pub use timers::TimerQueue;
