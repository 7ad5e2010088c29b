use crate::{
    foundation::core::SceneId,
    foundation::error::{ReelError, ReelResult},
    model::{BackgroundKind, BackgroundSettings, PatternKind, PhoneColor, Scene, MAX_SCROLL_SPEED},
};

/// Which sequence position the stage is showing.
///
/// `Intro` and `Outro` are virtual: they have no storage of their own, and content edits made while
/// they are active land on the first and last real scene respectively.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ScenePointer {
    Intro,
    Outro,
    Scene(SceneId),
}

impl ScenePointer {
    pub fn is_virtual(&self) -> bool {
        !matches!(self, Self::Scene(_))
    }

    pub fn scene_id(&self) -> Option<&SceneId> {
        match self {
            Self::Scene(id) => Some(id),
            Self::Intro | Self::Outro => None,
        }
    }
}

impl std::fmt::Display for ScenePointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intro => f.write_str("INTRO"),
            Self::Outro => f.write_str("OUTRO"),
            Self::Scene(id) => write!(f, "{id}"),
        }
    }
}

/// Map a pointer to the real scene that edits should touch.
///
/// `Intro` resolves to the first scene and `Outro` to the last. A scene id that is not in the list
/// silently resolves to the first scene, the same fallback the stage uses when rendering.
/// Returns `None` only for an empty list.
pub fn resolve_target_scene<'a>(
    pointer: &ScenePointer,
    scenes: &'a [Scene],
) -> Option<&'a SceneId> {
    let scene = match pointer {
        ScenePointer::Intro => scenes.first(),
        ScenePointer::Outro => scenes.last(),
        ScenePointer::Scene(id) => scenes.iter().find(|s| &s.id == id).or(scenes.first()),
    };
    scene.map(|s| &s.id)
}

/// Ordered scene list plus the active pointer. Never empty.
#[derive(Clone, Debug)]
pub struct SceneStore {
    scenes: Vec<Scene>,
    active: ScenePointer,
    revision: u64,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneStore {
    pub fn new() -> Self {
        let first = Scene::initial();
        Self {
            active: ScenePointer::Scene(first.id.clone()),
            scenes: vec![first],
            revision: 0,
        }
    }

    pub fn from_scenes(scenes: Vec<Scene>) -> ReelResult<Self> {
        let Some(first) = scenes.first() else {
            return Err(ReelError::validation("a project needs at least one scene"));
        };
        let active = ScenePointer::Scene(first.id.clone());
        Ok(Self {
            scenes,
            active,
            revision: 0,
        })
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn ids(&self) -> Vec<SceneId> {
        self.scenes.iter().map(|s| s.id.clone()).collect()
    }

    pub fn active(&self) -> &ScenePointer {
        &self.active
    }

    /// Bumped by every mutation; observers compare it to notice changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn index_of(&self, id: &SceneId) -> Option<usize> {
        self.scenes.iter().position(|s| &s.id == id)
    }

    pub fn get(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|s| &s.id == id)
    }

    pub fn first(&self) -> &Scene {
        &self.scenes[0]
    }

    pub fn last(&self) -> &Scene {
        &self.scenes[self.scenes.len() - 1]
    }

    /// The scene the stage renders for the current pointer (virtual pointers included).
    pub fn active_scene(&self) -> &Scene {
        let idx = self.target_index();
        &self.scenes[idx]
    }

    /// Index of the scene that content edits currently land on.
    pub fn target_index(&self) -> usize {
        resolve_target_scene(&self.active, &self.scenes)
            .and_then(|id| self.index_of(id))
            .unwrap_or(0)
    }

    pub fn add_scene(&mut self) -> SceneId {
        let scene = Scene::styled_like(self.last());
        let id = scene.id.clone();
        tracing::debug!(scene = %id, "add scene");
        self.scenes.push(scene);
        self.active = ScenePointer::Scene(id.clone());
        self.touch();
        id
    }

    /// Remove a scene. Removing the only scene (or an unknown id) is a silent no-op and returns
    /// `false`.
    pub fn remove_scene(&mut self, id: &SceneId) -> bool {
        if self.scenes.len() <= 1 {
            return false;
        }
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        self.scenes.remove(idx);
        if self.active.scene_id() == Some(id) {
            self.active = ScenePointer::Scene(self.scenes[0].id.clone());
        }
        tracing::debug!(scene = %id, remaining = self.scenes.len(), "remove scene");
        self.touch();
        true
    }

    /// No validation: an unknown id is accepted and resolves to the first scene on lookup.
    pub fn set_active_scene(&mut self, pointer: ScenePointer) {
        if self.active != pointer {
            self.active = pointer;
            self.touch();
        }
    }

    /// Move a scene to a new position in the playback order.
    pub fn move_scene(&mut self, id: &SceneId, to: usize) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let to = to.min(self.scenes.len() - 1);
        if from == to {
            return false;
        }
        let scene = self.scenes.remove(from);
        self.scenes.insert(to, scene);
        self.touch();
        true
    }

    pub fn add_screenshots<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        self.update_target(|s| s.screenshots.extend(urls));
    }

    pub fn remove_screenshot(&mut self, index: usize) -> bool {
        let mut removed = false;
        self.update_target(|s| {
            if index < s.screenshots.len() {
                s.screenshots.remove(index);
                removed = true;
            }
        });
        removed
    }

    pub fn reorder_screenshots(&mut self, new_order: Vec<String>) {
        self.update_target(|s| s.screenshots = new_order);
    }

    pub fn update_headline(&mut self, headline: impl Into<String>) {
        let headline = headline.into();
        self.update_target(|s| s.headline = headline);
    }

    pub fn update_subtitle(&mut self, subtitle: impl Into<String>) {
        let subtitle = subtitle.into();
        self.update_target(|s| s.subtitle = subtitle);
    }

    pub fn set_text_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        self.update_target(|s| s.text_color = color);
    }

    pub fn set_phone_color(&mut self, color: PhoneColor) {
        self.update_target(|s| s.phone_color = color);
    }

    pub fn set_background(&mut self, background: BackgroundSettings) {
        self.update_target(|s| s.background = background);
    }

    pub fn set_background_kind(&mut self, kind: BackgroundKind) {
        self.update_target(|s| s.background.kind = kind);
    }

    pub fn set_background_color(&mut self, color: impl Into<String>) {
        let color = color.into();
        self.update_target(|s| s.background.color = color);
    }

    pub fn set_background_gradient(&mut self, gradient: impl Into<String>) {
        let gradient = gradient.into();
        self.update_target(|s| s.background.gradient = gradient);
    }

    pub fn set_background_pattern(&mut self, pattern: PatternKind) {
        self.update_target(|s| s.background.pattern = pattern);
    }

    pub fn set_background_image(&mut self, image: Option<String>) {
        self.update_target(|s| s.background.image = image);
    }

    /// Clamped to `0..=100`.
    pub fn set_scroll_speed(&mut self, speed: u8) {
        let speed = speed.min(MAX_SCROLL_SPEED);
        self.update_target(|s| s.scroll_speed = speed);
    }

    fn update_target(&mut self, f: impl FnOnce(&mut Scene)) {
        let idx = self.target_index();
        f(&mut self.scenes[idx]);
        self.touch();
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
