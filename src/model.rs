use crate::{
    foundation::core::SceneId,
    foundation::error::{ReelError, ReelResult},
};

pub const DEFAULT_HEADLINE: &str = "Experience the Future";
pub const DEFAULT_SUBTITLE: &str = "Seamless, elegant, and powerful.";
pub const NEW_SCENE_HEADLINE: &str = "New Scene";
pub const NEW_SCENE_SUBTITLE: &str = "Describe this scene...";
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";
pub const DEFAULT_BACKGROUND_COLOR: &str = "#1a1a2e";
pub const DEFAULT_SCROLL_SPEED: u8 = 20;
pub const MAX_SCROLL_SPEED: u8 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneColor {
    #[default]
    Black,
    Silver,
    Gold,
    Blue,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    #[default]
    Dots,
    Grid,
    Waves,
    Circles,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    #[default]
    Gradient,
    Solid,
    Pattern,
    Image,
}

/// Everything the background picker has stored for a scene. Only the field group selected by
/// `kind` is rendered; the others survive so switching tabs back and forth loses nothing.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackgroundSettings {
    pub kind: BackgroundKind,
    pub color: String,
    pub gradient: String,
    pub pattern: PatternKind,
    pub image: Option<String>,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Gradient,
            color: DEFAULT_BACKGROUND_COLOR.to_string(),
            gradient: default_gradient().to_string(),
            pattern: PatternKind::Dots,
            image: None,
        }
    }
}

/// The background variant that is actually painted, passed to the renderer unmodified.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Background {
    Gradient { css: String },
    Solid { color: String },
    Pattern { pattern: PatternKind, base_color: String },
    Image { source: String },
}

impl BackgroundSettings {
    pub fn active(&self) -> Background {
        match self.kind {
            BackgroundKind::Gradient => Background::Gradient {
                css: self.gradient.clone(),
            },
            BackgroundKind::Solid => Background::Solid {
                color: self.color.clone(),
            },
            BackgroundKind::Pattern => Background::Pattern {
                pattern: self.pattern,
                base_color: self.color.clone(),
            },
            // An image tab with nothing uploaded paints the base color.
            BackgroundKind::Image => match &self.image {
                Some(source) => Background::Image {
                    source: source.clone(),
                },
                None => Background::Solid {
                    color: self.color.clone(),
                },
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    pub id: SceneId,
    /// Stacked top to bottom inside the phone; this order is the scroll path.
    #[serde(default)]
    pub screenshots: Vec<String>,
    pub headline: String,
    pub subtitle: String,
    pub text_color: String,
    #[serde(default)]
    pub phone_color: PhoneColor,
    #[serde(default)]
    pub background: BackgroundSettings,
    #[serde(default = "default_scroll_speed")]
    pub scroll_speed: u8,
}

fn default_scroll_speed() -> u8 {
    DEFAULT_SCROLL_SPEED
}

impl Scene {
    /// The scene every fresh project starts with.
    pub fn initial() -> Self {
        Self {
            id: SceneId::new("default"),
            screenshots: Vec::new(),
            headline: DEFAULT_HEADLINE.to_string(),
            subtitle: DEFAULT_SUBTITLE.to_string(),
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            phone_color: PhoneColor::Black,
            background: BackgroundSettings::default(),
            scroll_speed: DEFAULT_SCROLL_SPEED,
        }
    }

    /// A new scene carrying `template`'s visual settings and placeholder content.
    pub fn styled_like(template: &Scene) -> Self {
        Self {
            id: SceneId::generate(),
            screenshots: Vec::new(),
            headline: NEW_SCENE_HEADLINE.to_string(),
            subtitle: NEW_SCENE_SUBTITLE.to_string(),
            text_color: template.text_color.clone(),
            phone_color: template.phone_color,
            background: template.background.clone(),
            scroll_speed: template.scroll_speed,
        }
    }

    pub fn validate(&self) -> ReelResult<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(ReelError::validation("scene id must be non-empty"));
        }
        if self.scroll_speed > MAX_SCROLL_SPEED {
            return Err(ReelError::validation(format!(
                "scene '{}' scroll_speed must be within 0..={MAX_SCROLL_SPEED}",
                self.id
            )));
        }
        Ok(())
    }
}

/// Opening card shown before the first scene. Painted with the first scene's background.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IntroCard {
    pub enabled: bool,
    pub logo: Option<String>,
    pub title: String,
    pub subtitle: String,
}

impl Default for IntroCard {
    fn default() -> Self {
        Self {
            enabled: false,
            logo: None,
            title: "Welcome".to_string(),
            subtitle: "Discover the amazing features".to_string(),
        }
    }
}

impl IntroCard {
    /// Monogram shown in place of a missing logo.
    pub fn monogram(&self) -> Option<char> {
        self.title.chars().next()
    }
}

/// Closing card shown after the last scene. Painted with the last scene's background.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutroCard {
    pub enabled: bool,
    pub qr_code: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioTrim {
    pub start: f64,
    pub end: f64,
}

/// Soundtrack selection. Carried with the project for the host to mix; never decoded here.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AudioTrack {
    pub source: Option<String>,
    pub name: Option<String>,
    pub volume: f64,
    pub trim: AudioTrim,
}

impl Default for AudioTrack {
    fn default() -> Self {
        Self {
            source: None,
            name: None,
            volume: 0.5,
            trim: AudioTrim::default(),
        }
    }
}

impl AudioTrack {
    pub fn validate(&self) -> ReelResult<()> {
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(ReelError::validation("audio volume must be within 0..=1"));
        }
        let AudioTrim { start, end } = self.trim;
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end < 0.0 {
            return Err(ReelError::validation(
                "audio trim bounds must be finite and non-negative",
            ));
        }
        // end == 0 means "untrimmed"
        if end > 0.0 && start > end {
            return Err(ReelError::validation("audio trim start must be <= end"));
        }
        Ok(())
    }

    /// Seconds of audio that will play, given the clip's natural length.
    pub fn trimmed_len(&self, natural_secs: f64) -> f64 {
        let end = if self.trim.end > 0.0 {
            self.trim.end.min(natural_secs)
        } else {
            natural_secs
        };
        (end - self.trim.start).max(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct GradientPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub value: &'static str,
}

pub const PRESET_GRADIENTS: &[GradientPreset] = &[
    GradientPreset {
        id: "slate",
        name: "Slate",
        value: "linear-gradient(135deg, #475569 0%, #1e293b 50%, #000000 100%)",
    },
    GradientPreset {
        id: "twilight",
        name: "Twilight",
        value: "linear-gradient(135deg, rgba(88, 28, 135, 0.8) 0%, #0f172a 50%, #000000 100%)",
    },
    GradientPreset {
        id: "carbon",
        name: "Carbon",
        value: "linear-gradient(135deg, #404040 0%, #18181b 50%, #000000 100%)",
    },
    GradientPreset {
        id: "forest",
        name: "Forest",
        value: "linear-gradient(135deg, #166534 0%, #064e3b 50%, #000000 100%)",
    },
    GradientPreset {
        id: "gold",
        name: "Gold",
        value: "linear-gradient(135deg, rgba(202, 138, 4, 0.5) 0%, #111827 50%, #000000 100%)",
    },
    GradientPreset {
        id: "velvet",
        name: "Velvet",
        value: "linear-gradient(225deg, rgba(185, 28, 28, 0.5) 0%, #111827 50%, #000000 100%)",
    },
    GradientPreset {
        id: "cyber",
        name: "Cyber",
        value: "linear-gradient(45deg, rgba(8, 145, 178, 0.5) 0%, #111827 50%, rgba(147, 51, 234, 0.5) 100%)",
    },
    GradientPreset {
        id: "sunset",
        name: "Sunset Glow",
        value: "linear-gradient(135deg, #667eea 0%, #764ba2 50%, #f093fb 100%)",
    },
    GradientPreset {
        id: "midnight",
        name: "Midnight",
        value: "linear-gradient(135deg, #0f0c29 0%, #302b63 50%, #24243e 100%)",
    },
    GradientPreset {
        id: "rose",
        name: "Rose Gold",
        value: "linear-gradient(135deg, #ee9ca7 0%, #ffdde1 100%)",
    },
    GradientPreset {
        id: "cosmic",
        name: "Cosmic",
        value: "linear-gradient(135deg, #8E2DE2 0%, #4A00E0 100%)",
    },
    GradientPreset {
        id: "peach",
        name: "Peach",
        value: "linear-gradient(135deg, #ffecd2 0%, #fcb69f 100%)",
    },
    GradientPreset {
        id: "electric",
        name: "Electric",
        value: "linear-gradient(135deg, #a8edea 0%, #fed6e3 100%)",
    },
    GradientPreset {
        id: "nord",
        name: "Nordic",
        value: "linear-gradient(135deg, #2C3E50 0%, #4CA1AF 100%)",
    },
    GradientPreset {
        id: "lavender",
        name: "Lavender",
        value: "linear-gradient(135deg, #E8CBC0 0%, #636FA4 100%)",
    },
];

pub fn default_gradient() -> &'static str {
    PRESET_GRADIENTS
        .last()
        .map(|p| p.value)
        .unwrap_or("linear-gradient(135deg, #E8CBC0 0%, #636FA4 100%)")
}

pub fn gradient_preset(id: &str) -> Option<&'static GradientPreset> {
    PRESET_GRADIENTS.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styled_like_copies_visuals_and_resets_content() {
        let mut base = Scene::initial();
        base.screenshots = vec!["a.png".to_string()];
        base.phone_color = PhoneColor::Gold;
        base.scroll_speed = 70;
        base.background.kind = BackgroundKind::Pattern;

        let next = Scene::styled_like(&base);
        assert_ne!(next.id, base.id);
        assert!(next.screenshots.is_empty());
        assert_eq!(next.headline, NEW_SCENE_HEADLINE);
        assert_eq!(next.subtitle, NEW_SCENE_SUBTITLE);
        assert_eq!(next.phone_color, PhoneColor::Gold);
        assert_eq!(next.scroll_speed, 70);
        assert_eq!(next.background, base.background);
        assert_eq!(next.text_color, base.text_color);
    }

    #[test]
    fn image_background_without_source_paints_color() {
        let bg = BackgroundSettings {
            kind: BackgroundKind::Image,
            color: "#123456".to_string(),
            ..BackgroundSettings::default()
        };
        assert_eq!(
            bg.active(),
            Background::Solid {
                color: "#123456".to_string()
            }
        );
    }

    #[test]
    fn pattern_background_carries_base_color() {
        let bg = BackgroundSettings {
            kind: BackgroundKind::Pattern,
            pattern: PatternKind::Waves,
            color: "#000".to_string(),
            ..BackgroundSettings::default()
        };
        assert_eq!(
            bg.active(),
            Background::Pattern {
                pattern: PatternKind::Waves,
                base_color: "#000".to_string()
            }
        );
    }

    #[test]
    fn initial_scene_uses_last_preset_gradient() {
        let scene = Scene::initial();
        assert_eq!(scene.background.gradient, PRESET_GRADIENTS[14].value);
        assert_eq!(gradient_preset("nord").map(|p| p.name), Some("Nordic"));
        assert!(gradient_preset("missing").is_none());
    }

    #[test]
    fn aspect_ratio_uses_store_notation() {
        let s = serde_json::to_string(&AspectRatio::Portrait).unwrap();
        assert_eq!(s, "\"9:16\"");
        let de: AspectRatio = serde_json::from_str("\"1:1\"").unwrap();
        assert_eq!(de, AspectRatio::Square);
    }

    #[test]
    fn audio_validation_rejects_bad_values() {
        let mut audio = AudioTrack::default();
        assert!(audio.validate().is_ok());

        audio.volume = 1.5;
        assert!(audio.validate().is_err());

        audio.volume = 0.5;
        audio.trim = AudioTrim {
            start: 10.0,
            end: 4.0,
        };
        assert!(audio.validate().is_err());

        audio.trim = AudioTrim {
            start: 2.0,
            end: 0.0,
        };
        assert!(audio.validate().is_ok());
        assert_eq!(audio.trimmed_len(12.0), 10.0);
    }

    #[test]
    fn scene_validation_bounds_scroll_speed() {
        let mut scene = Scene::initial();
        scene.scroll_speed = 101;
        assert!(scene.validate().is_err());
        scene.scroll_speed = 0;
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn intro_monogram_uses_first_title_char() {
        let intro = IntroCard::default();
        assert_eq!(intro.monogram(), Some('W'));
    }
}
