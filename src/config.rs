use std::collections::BTreeSet;

use crate::{
    foundation::core::Millis,
    foundation::error::{ReelError, ReelResult},
    model::{AspectRatio, AudioTrack, IntroCard, OutroCard, Scene},
};

/// Every delay the recording sequence uses, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SequenceTimings {
    /// From capture start to the first `is_playing = true`.
    pub start_delay_ms: u64,
    /// How long the intro card is held.
    pub intro_dwell_ms: u64,
    /// How long the outro card is held.
    pub outro_dwell_ms: u64,
    /// Hold on the final scroll frame before reporting completion.
    pub settle_ms: u64,
    /// Intro card exit before the first scene starts scrolling.
    pub intro_exit_ms: u64,
    /// Pause before switching to the next scene.
    pub scene_exit_ms: u64,
    /// Layout settle after the switch, before the reset.
    pub scene_settle_ms: u64,
    /// Gap between the reset and resuming playback.
    pub scene_resume_ms: u64,
    /// Pause after the last scene before the outro card appears.
    pub outro_enter_ms: u64,
    /// Overlay fade length; the capture stops once a fade-out has run this long.
    pub fade_ms: u64,
    /// Padding added to the advisory duration estimate.
    pub estimate_buffer_ms: u64,
}

impl Default for SequenceTimings {
    fn default() -> Self {
        Self {
            start_delay_ms: 1000,
            intro_dwell_ms: 3000,
            outro_dwell_ms: 4000,
            settle_ms: 1000,
            intro_exit_ms: 500,
            scene_exit_ms: 300,
            scene_settle_ms: 500,
            scene_resume_ms: 100,
            outro_enter_ms: 500,
            fade_ms: 1000,
            estimate_buffer_ms: 1000,
        }
    }
}

impl SequenceTimings {
    pub fn start_delay(&self) -> Millis {
        Millis(self.start_delay_ms)
    }
    pub fn intro_dwell(&self) -> Millis {
        Millis(self.intro_dwell_ms)
    }
    pub fn outro_dwell(&self) -> Millis {
        Millis(self.outro_dwell_ms)
    }
    pub fn settle(&self) -> Millis {
        Millis(self.settle_ms)
    }
    pub fn intro_exit(&self) -> Millis {
        Millis(self.intro_exit_ms)
    }
    pub fn scene_exit(&self) -> Millis {
        Millis(self.scene_exit_ms)
    }
    pub fn scene_settle(&self) -> Millis {
        Millis(self.scene_settle_ms)
    }
    pub fn scene_resume(&self) -> Millis {
        Millis(self.scene_resume_ms)
    }
    pub fn outro_enter(&self) -> Millis {
        Millis(self.outro_enter_ms)
    }
    pub fn fade(&self) -> Millis {
        Millis(self.fade_ms)
    }
    pub fn estimate_buffer(&self) -> Millis {
        Millis(self.estimate_buffer_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    WebM,
}

impl ContainerFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::WebM => "video/webm",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::WebM => "webm",
        }
    }
}

/// What the capture session asks of the platform.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_frame_rate: u32,
    pub capture_audio: bool,
    pub video_bits_per_second: u64,
    /// Tried in order; the last entry is used unconditionally if nothing matches.
    pub formats: Vec<ContainerFormat>,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            ideal_width: 3840,
            ideal_height: 2160,
            ideal_frame_rate: 60,
            capture_audio: false,
            video_bits_per_second: 50_000_000,
            formats: vec![ContainerFormat::Mp4, ContainerFormat::WebM],
        }
    }
}

impl RecorderSettings {
    pub fn validate(&self) -> ReelResult<()> {
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err(ReelError::validation(
                "recorder ideal width/height must be non-zero",
            ));
        }
        if self.ideal_frame_rate == 0 {
            return Err(ReelError::validation(
                "recorder ideal frame rate must be non-zero",
            ));
        }
        if self.video_bits_per_second == 0 {
            return Err(ReelError::validation("recorder bitrate must be non-zero"));
        }
        Ok(())
    }
}

/// The editable document: scenes plus the project-wide cards, soundtrack and timing knobs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub scenes: Vec<Scene>,
    pub intro: IntroCard,
    pub outro: OutroCard,
    pub audio: AudioTrack,
    pub aspect_ratio: AspectRatio,
    pub timings: SequenceTimings,
    pub recorder: RecorderSettings,
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self {
            scenes: vec![Scene::initial()],
            intro: IntroCard::default(),
            outro: OutroCard::default(),
            audio: AudioTrack::default(),
            aspect_ratio: AspectRatio::default(),
            timings: SequenceTimings::default(),
            recorder: RecorderSettings::default(),
        }
    }
}

impl ProjectFile {
    pub fn from_json_str(s: &str) -> ReelResult<Self> {
        let project: Self = serde_json::from_str(s)?;
        project.validate()?;
        Ok(project)
    }

    pub fn from_reader(r: impl std::io::Read) -> ReelResult<Self> {
        let project: Self = serde_json::from_reader(r)?;
        project.validate()?;
        Ok(project)
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.scenes.is_empty() {
            return Err(ReelError::validation("a project needs at least one scene"));
        }
        let mut seen = BTreeSet::new();
        for scene in &self.scenes {
            scene.validate()?;
            if !seen.insert(&scene.id) {
                return Err(ReelError::validation(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
        }
        self.audio.validate()?;
        self.recorder.validate()?;
        Ok(())
    }
}
