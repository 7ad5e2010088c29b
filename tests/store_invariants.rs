use promoreel::{PhoneColor, SceneId, SceneStore, ScenePointer};

/// Small deterministic generator so failures replay exactly.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

#[test]
fn add_remove_never_empties_the_store() {
    for seed in 0..32 {
        let mut rng = Lcg(seed);
        let mut store = SceneStore::new();
        for _ in 0..400 {
            if rng.below(3) == 0 {
                store.add_scene();
            } else {
                let ids = store.ids();
                let victim = ids[rng.below(ids.len())].clone();
                let before = store.ids();
                let removed = store.remove_scene(&victim);
                if before.len() == 1 {
                    assert!(!removed);
                    assert_eq!(store.ids(), before);
                }
            }
            assert!(!store.is_empty());
            assert!(!store.ids().is_empty());
        }
    }
}

#[test]
fn new_scene_copies_style_and_resets_content() {
    let mut rng = Lcg(7);
    let mut store = SceneStore::new();
    let colors = [
        PhoneColor::Black,
        PhoneColor::Silver,
        PhoneColor::Gold,
        PhoneColor::Blue,
    ];
    for round in 0..50 {
        store.set_active_scene(ScenePointer::Outro);
        store.set_phone_color(colors[rng.below(colors.len())]);
        store.set_text_color(format!("#{:06x}", rng.next() & 0xff_ffff));
        store.set_scroll_speed(rng.below(101) as u8);
        store.set_background_color(format!("#{:06x}", rng.next() & 0xff_ffff));
        store.update_headline(format!("headline {round}"));
        store.add_screenshots([format!("shot-{round}")]);

        let template = store.last().clone();
        let id = store.add_scene();
        let created = store.get(&id).unwrap();
        assert_eq!(created.phone_color, template.phone_color);
        assert_eq!(created.text_color, template.text_color);
        assert_eq!(created.scroll_speed, template.scroll_speed);
        assert_eq!(created.background, template.background);
        assert_eq!(created.headline, "New Scene");
        assert_eq!(created.subtitle, "Describe this scene...");
        assert!(created.screenshots.is_empty());
        assert_ne!(created.id, template.id);
    }
}

#[test]
fn virtual_pointers_only_touch_their_scene() {
    let mut rng = Lcg(99);
    let mut store = SceneStore::new();
    for _ in 0..5 {
        store.add_scene();
    }

    for i in 0..200 {
        let to_outro = rng.below(2) == 0;
        let snapshot: Vec<_> = store.scenes().to_vec();
        let target = if to_outro { snapshot.len() - 1 } else { 0 };
        store.set_active_scene(if to_outro {
            ScenePointer::Outro
        } else {
            ScenePointer::Intro
        });

        match rng.below(4) {
            0 => store.update_headline(format!("h{i}")),
            1 => store.update_subtitle(format!("s{i}")),
            2 => store.add_screenshots([format!("x{i}")]),
            _ => store.set_scroll_speed(rng.below(101) as u8),
        }

        for (idx, (before, after)) in snapshot.iter().zip(store.scenes()).enumerate() {
            if idx != target {
                assert_eq!(before, after, "scene {idx} changed while editing {target}");
            }
        }
    }
}

#[test]
fn unknown_pointer_is_a_silent_fallback() {
    let mut store = SceneStore::new();
    store.add_scene();
    store.set_active_scene(ScenePointer::Scene(SceneId::new("missing")));
    assert_eq!(store.active_scene().id, store.first().id);
    store.update_headline("fallback");
    assert_eq!(store.first().headline, "fallback");
}
