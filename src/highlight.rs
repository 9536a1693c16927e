use crate::scene::{ObjectTag, SceneGraph};

/// The object currently lit by hover and the emissive value it had before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Highlighted {
    tag: ObjectTag,
    saved_emissive: Option<u32>,
}

/// Hover highlight. At most one object is highlighted at a time.
#[derive(Debug, Default)]
pub struct HighlightState {
    current: Option<Highlighted>,
}

impl HighlightState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ObjectTag> {
        self.current.map(|h| h.tag)
    }

    /// Saved original emissive of the highlighted object
    #[cfg(test)]
    pub fn saved_emissive(&self) -> Option<u32> {
        self.current.and_then(|h| h.saved_emissive)
    }

    /// Move the highlight to `hit`, or clear it when `hit` is `None`.
    /// Hovering the object that is already highlighted changes nothing.
    pub fn update(&mut self, hit: Option<ObjectTag>, scene: &mut SceneGraph, color: u32) {
        if self.current() == hit {
            return;
        }

        self.clear(scene);

        if let Some(tag) = hit {
            let Some(obj) = scene.get_mut(tag) else {
                log::warn!("highlight target {:?} is not in the scene", tag);
                return;
            };

            let saved_emissive = obj.material.emissive;
            if saved_emissive.is_some() {
                obj.material.emissive = Some(color);
            }
            log::trace!("highlight {:?}", tag);
            self.current = Some(Highlighted { tag, saved_emissive });
        }
    }

    /// Restore the highlighted object's original emissive and forget it
    pub fn clear(&mut self, scene: &mut SceneGraph) {
        if let Some(previous) = self.current.take() {
            if let Some(obj) = scene.get_mut(previous.tag) {
                obj.material.emissive = previous.saved_emissive;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SceneConfigData, StarConfigData};

    const HIGHLIGHT: u32 = 0xfc4e03;

    fn scene() -> SceneGraph {
        SceneGraph::portfolio(&SceneConfigData::default(), Vec::new(), &StarConfigData::default())
    }

    fn emissive(scene: &SceneGraph, tag: ObjectTag) -> Option<u32> {
        scene.get(tag).and_then(|obj| obj.material.emissive)
    }

    #[test]
    fn test_enter_sets_highlight() {
        let mut scene = scene();
        let mut state = HighlightState::new();

        state.update(Some(ObjectTag::Moon), &mut scene, HIGHLIGHT);
        assert_eq!(state.current(), Some(ObjectTag::Moon));
        assert_eq!(emissive(&scene, ObjectTag::Moon), Some(HIGHLIGHT));
        assert_eq!(state.saved_emissive(), Some(0x000000));
    }

    #[test]
    fn test_repeated_hover_keeps_original() {
        let mut scene = scene();
        let mut state = HighlightState::new();

        for _ in 0..5 {
            state.update(Some(ObjectTag::Portrait), &mut scene, HIGHLIGHT);
        }
        assert_eq!(state.saved_emissive(), Some(0x000000));

        state.update(None, &mut scene, HIGHLIGHT);
        assert_eq!(emissive(&scene, ObjectTag::Portrait), Some(0x000000));
    }

    #[test]
    fn test_exit_restores_and_clears() {
        let mut scene = scene();
        if let Some(moon) = scene.get_mut(ObjectTag::Moon) {
            moon.material.emissive = Some(0x112233);
        }
        let mut state = HighlightState::new();

        state.update(Some(ObjectTag::Moon), &mut scene, HIGHLIGHT);
        state.update(None, &mut scene, HIGHLIGHT);

        assert_eq!(state.current(), None);
        assert_eq!(emissive(&scene, ObjectTag::Moon), Some(0x112233));
    }

    #[test]
    fn test_switch_restores_previous() {
        let mut scene = scene();
        let mut state = HighlightState::new();

        state.update(Some(ObjectTag::Moon), &mut scene, HIGHLIGHT);
        state.update(Some(ObjectTag::Portrait), &mut scene, HIGHLIGHT);

        assert_eq!(state.current(), Some(ObjectTag::Portrait));
        assert_eq!(emissive(&scene, ObjectTag::Moon), Some(0x000000));
        assert_eq!(emissive(&scene, ObjectTag::Portrait), Some(HIGHLIGHT));
    }

    #[test]
    fn test_material_without_emissive_is_left_alone() {
        let mut scene = scene();
        if let Some(portrait) = scene.get_mut(ObjectTag::Portrait) {
            portrait.material.emissive = None;
        }
        let mut state = HighlightState::new();

        state.update(Some(ObjectTag::Portrait), &mut scene, HIGHLIGHT);
        assert_eq!(state.current(), Some(ObjectTag::Portrait));
        assert_eq!(emissive(&scene, ObjectTag::Portrait), None);
    }
}
