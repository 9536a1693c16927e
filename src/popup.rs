use glam::Vec2;

use crate::picking::CanvasRect;
use crate::scene::ObjectTag;

/// Screen rectangle in logical pixels, origin at the top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PanelRect {
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Keep a panel anchored at its bottom centre inside the viewport.
///
/// `anchor` is where the object projects to. The anchor is moved, never the
/// panel size, so a panel wider or taller than the padded viewport can still
/// overflow.
pub fn place_panel(anchor: Vec2, size: Vec2, viewport: Vec2, padding: f32) -> PanelRect {
    let mut x = anchor.x;
    let mut y = anchor.y;

    if x - size.x / 2.0 < padding {
        x = size.x / 2.0 + padding;
    } else if x + size.x / 2.0 > viewport.x - padding {
        x = viewport.x - size.x / 2.0 - padding;
    }

    if y - size.y < padding {
        y = size.y + padding;
    } else if y > viewport.y - padding {
        y = viewport.y - padding;
    }

    PanelRect {
        x: x - size.x / 2.0,
        y: y - size.y,
        width: size.x,
        height: size.y,
    }
}

/// A visible annotation for one object
#[derive(Debug, Clone)]
pub struct InfoPanel {
    pub tag: ObjectTag,
    pub text: &'static str,
    /// Object position projected at the moment of the click
    pub anchor_ndc: Vec2,
    /// Last placed rectangle, unknown until the UI has measured the panel
    pub rect: Option<PanelRect>,
    dismiss_on_click: bool,
    dismiss_on_touch: bool,
    age: f32,
}

impl InfoPanel {
    fn new(tag: ObjectTag, text: &'static str, anchor_ndc: Vec2) -> Self {
        Self {
            tag,
            text,
            anchor_ndc,
            rect: None,
            dismiss_on_click: true,
            dismiss_on_touch: true,
            age: 0.0,
        }
    }

    fn is_outside(&self, point: Vec2) -> bool {
        self.rect.map(|rect| !rect.contains(point)).unwrap_or(true)
    }
}

/// Absent or showing exactly one panel
#[derive(Debug)]
pub struct InfoPopup {
    panel: Option<InfoPanel>,
    padding: f32,
    fade_seconds: f32,
}

impl InfoPopup {
    pub fn new(padding: f32, fade_seconds: f32) -> Self {
        Self {
            panel: None,
            padding,
            fade_seconds,
        }
    }

    pub fn panel(&self) -> Option<&InfoPanel> {
        self.panel.as_ref()
    }

    #[cfg(test)]
    pub fn is_shown(&self) -> bool {
        self.panel.is_some()
    }

    /// Replace whatever is showing with a fresh panel for `tag`
    pub fn show(&mut self, tag: ObjectTag, text: &'static str, anchor_ndc: Vec2) {
        if let Some(previous) = self.panel.take() {
            log::debug!("replacing info panel for {:?}", previous.tag);
        }
        log::debug!("showing info panel for {:?}", tag);
        self.panel = Some(InfoPanel::new(tag, text, anchor_ndc));
    }

    pub fn dismiss(&mut self) {
        if let Some(panel) = self.panel.take() {
            log::debug!("dismissed info panel for {:?}", panel.tag);
        }
    }

    /// Runs the one-shot click listener. Returns true when the panel was removed.
    pub fn on_click(&mut self, point: Vec2) -> bool {
        let remove = match self.panel.as_mut() {
            Some(panel) if panel.dismiss_on_click => {
                panel.dismiss_on_click = false;
                panel.is_outside(point)
            }
            _ => false,
        };
        if remove {
            self.dismiss();
        }
        remove
    }

    /// Runs the one-shot touch listener. Returns true when the panel was removed.
    pub fn on_touch_start(&mut self, point: Vec2) -> bool {
        let remove = match self.panel.as_mut() {
            Some(panel) if panel.dismiss_on_touch => {
                panel.dismiss_on_touch = false;
                panel.is_outside(point)
            }
            _ => false,
        };
        if remove {
            self.dismiss();
        }
        remove
    }

    /// Position the panel for this frame and remember where it went
    pub fn place(&mut self, viewport: Vec2, panel_size: Vec2) -> Option<PanelRect> {
        let padding = self.padding;
        let panel = self.panel.as_mut()?;

        let anchor = CanvasRect::from_size(viewport.x, viewport.y).ndc_to_pixels(panel.anchor_ndc);
        let rect = place_panel(anchor, panel_size, viewport, padding);
        panel.rect = Some(rect);
        Some(rect)
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(panel) = self.panel.as_mut() {
            panel.age += dt;
        }
    }

    /// Fade-in progress, 0 when absent
    pub fn opacity(&self) -> f32 {
        match &self.panel {
            None => 0.0,
            Some(_) if self.fade_seconds <= 0.0 => 1.0,
            Some(panel) => (panel.age / self.fade_seconds).clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);
    const PADDING: f32 = 40.0;

    fn assert_within_padding(rect: &PanelRect) {
        assert!(rect.x >= PADDING - 1e-3, "left {:?}", rect);
        assert!(rect.y >= PADDING - 1e-3, "top {:?}", rect);
        assert!(rect.x + rect.width <= VIEWPORT.x - PADDING + 1e-3, "right {:?}", rect);
        assert!(rect.y + rect.height <= VIEWPORT.y - PADDING + 1e-3, "bottom {:?}", rect);
    }

    #[test]
    fn test_centered_anchor_is_untouched() {
        let rect = place_panel(Vec2::new(640.0, 400.0), Vec2::new(300.0, 200.0), VIEWPORT, PADDING);
        assert_eq!(rect.min(), Vec2::new(490.0, 200.0));
    }

    #[test]
    fn test_clamps_every_edge() {
        let size = Vec2::new(360.0, 240.0);
        let anchors = [
            Vec2::new(-500.0, -500.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1280.0, 720.0),
            Vec2::new(5000.0, 5000.0),
            Vec2::new(10.0, 700.0),
            Vec2::new(1270.0, 30.0),
            Vec2::new(640.0, 360.0),
        ];
        for anchor in anchors {
            let rect = place_panel(anchor, size, VIEWPORT, PADDING);
            assert_within_padding(&rect);
            assert_eq!(rect.size(), size);
        }
    }

    #[test]
    fn test_show_replaces_existing() {
        let mut popup = InfoPopup::new(PADDING, 0.3);
        popup.show(ObjectTag::Moon, "moon", Vec2::ZERO);
        popup.show(ObjectTag::Portrait, "me", Vec2::ZERO);
        let panel = popup.panel().expect("shown");
        assert_eq!(panel.tag, ObjectTag::Portrait);
        assert_eq!(panel.text, "me");
    }

    #[test]
    fn test_click_outside_dismisses() {
        let mut popup = InfoPopup::new(PADDING, 0.3);
        popup.show(ObjectTag::Moon, "moon", Vec2::ZERO);
        popup.place(VIEWPORT, Vec2::new(200.0, 100.0));

        assert!(popup.on_click(Vec2::new(5.0, 5.0)));
        assert!(!popup.is_shown());
    }

    #[test]
    fn test_click_inside_spends_listener() {
        let mut popup = InfoPopup::new(PADDING, 0.3);
        popup.show(ObjectTag::Moon, "moon", Vec2::ZERO);
        let rect = popup.place(VIEWPORT, Vec2::new(200.0, 100.0)).expect("placed");
        let inside = rect.min() + rect.size() * 0.5;

        assert!(!popup.on_click(inside));
        assert!(popup.is_shown());

        // Listener is gone, so an outside click no longer dismisses
        assert!(!popup.on_click(Vec2::new(5.0, 5.0)));
        assert!(popup.is_shown());

        // The touch listener is independent
        assert!(popup.on_touch_start(Vec2::new(5.0, 5.0)));
        assert!(!popup.is_shown());
    }

    #[test]
    fn test_place_converts_anchor_to_pixels() {
        let mut popup = InfoPopup::new(PADDING, 0.3);
        popup.show(ObjectTag::Moon, "moon", Vec2::new(0.5, 0.5));
        let rect = popup.place(VIEWPORT, Vec2::new(200.0, 100.0)).expect("placed");
        // Anchor lands at (960, 180); the panel hangs above it
        assert_eq!(rect.min(), Vec2::new(860.0, 80.0));
    }

    #[test]
    fn test_unplaced_panel_counts_as_outside() {
        let mut popup = InfoPopup::new(PADDING, 0.3);
        popup.show(ObjectTag::Portrait, "me", Vec2::ZERO);
        assert!(popup.on_touch_start(Vec2::new(640.0, 360.0)));
    }

    #[test]
    fn test_fade_in() {
        let mut popup = InfoPopup::new(PADDING, 0.5);
        assert_eq!(popup.opacity(), 0.0);
        popup.show(ObjectTag::Moon, "moon", Vec2::ZERO);
        assert_eq!(popup.opacity(), 0.0);
        popup.advance(0.25);
        assert!((popup.opacity() - 0.5).abs() < 1e-6);
        popup.advance(1.0);
        assert_eq!(popup.opacity(), 1.0);
    }
}
