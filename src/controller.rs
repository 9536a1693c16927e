use glam::{Vec2, Vec3};
use rand::{rngs::StdRng, SeedableRng};
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::core::{Camera, CameraPose, LightingData};
use crate::highlight::HighlightState;
use crate::info_text;
use crate::orbit::{DragMode, OrbitControls};
use crate::picking::{pick_nearest, CanvasRect, PointerMapper};
use crate::popup::InfoPopup;
use crate::scene::{ObjectTag, SceneGraph};
use crate::starfield;

/// Mouse clicks a platform synthesizes right after a touch are dropped for this long
pub const EMULATED_CLICK_WINDOW: Duration = Duration::from_millis(500);

/// Animation speeds are authored per 1/60 s frame
const REFERENCE_FPS: f32 = 60.0;

/// Owns the scene and all interaction state. Event handlers and the frame
/// loop get it by reference; nothing lives in globals.
pub struct SceneController {
    config: AppConfig,
    scene: SceneGraph,
    camera: Camera,
    initial_pose: CameraPose,
    orbit: OrbitControls,
    lighting: LightingData,
    highlight: HighlightState,
    popup: InfoPopup,
    canvas: CanvasRect,
    torus_speed: Vec3,
    moon_speed: f32,
    rotation_speed: f32,
    rng: StdRng,
    ignore_clicks_until: Option<Instant>,
}

impl SceneController {
    pub fn new(config: AppConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Build with a caller-provided RNG so star layouts can be reproduced
    pub fn with_rng(config: AppConfig, mut rng: StdRng) -> Self {
        let star_count = config.stars.initial_count.min(config.stars.max_count);
        let stars = starfield::generate(star_count, config.stars.spread, &mut rng);
        let scene = SceneGraph::portfolio(&config.scene, stars, &config.stars);

        let camera = Camera::from(&config.camera);
        let initial_pose = camera.pose();
        let orbit = OrbitControls::new(
            Vec3::ZERO,
            config.interaction.orbit_rotate_speed,
            config.interaction.orbit_zoom_speed,
        );
        let lighting = LightingData::from(&config.lighting);
        let popup = InfoPopup::new(
            config.interaction.popup_padding,
            config.interaction.popup_fade_seconds,
        );
        let canvas = CanvasRect::from_size(config.window.width as f32, config.window.height as f32);
        let torus_speed = config.scene.rotation.torus;
        let moon_speed = config.scene.rotation.moon_y;

        log::info!("scene ready with {} stars", star_count);

        Self {
            config,
            scene,
            camera,
            initial_pose,
            orbit,
            lighting,
            highlight: HighlightState::new(),
            popup,
            canvas,
            torus_speed,
            moon_speed,
            rotation_speed: torus_speed.x,
            rng,
            ignore_clicks_until: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn lighting(&self) -> &LightingData {
        &self.lighting
    }

    pub fn popup(&self) -> &InfoPopup {
        &self.popup
    }

    pub fn popup_mut(&mut self) -> &mut InfoPopup {
        &mut self.popup
    }

    #[cfg(test)]
    pub fn highlighted(&self) -> Option<ObjectTag> {
        self.highlight.current()
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &CanvasRect {
        &self.canvas
    }

    /// Canvas size changed, in logical pixels
    pub fn resize(&mut self, width: f32, height: f32) {
        self.canvas.width = width;
        self.canvas.height = height;
    }

    // Pointer input. Positions are logical pixels relative to the window.

    /// Hover: re-run the hit test and move the highlight
    pub fn on_pointer_move(&mut self, position: Vec2) {
        if self.orbit.is_dragging() {
            self.orbit.drag_to(position, self.canvas.height, &mut self.camera);
        }

        let hit = self.hit_test(position);
        self.highlight.update(
            hit,
            &mut self.scene,
            self.config.interaction.highlight_color,
        );
    }

    /// Pointer left the canvas, nothing can be under it any more
    pub fn on_pointer_leave(&mut self) {
        self.highlight.clear(&mut self.scene);
    }

    pub fn on_click(&mut self, position: Vec2, over_ui: bool, now: Instant) {
        if let Some(until) = self.ignore_clicks_until {
            if now < until {
                log::trace!("ignoring emulated click");
                return;
            }
            self.ignore_clicks_until = None;
        }

        self.popup.on_click(position);

        if !over_ui {
            self.open_info_at(position);
        }
    }

    pub fn on_touch_start(&mut self, position: Vec2) {
        self.popup.on_touch_start(position);
    }

    pub fn on_touch_end(&mut self, position: Vec2, over_ui: bool, now: Instant) {
        if !over_ui {
            self.open_info_at(position);
        }
        self.ignore_clicks_until = Some(now + EMULATED_CLICK_WINDOW);
    }

    pub fn begin_orbit(&mut self, mode: DragMode, position: Vec2) {
        self.orbit.begin_drag(mode, position);
    }

    pub fn end_orbit(&mut self) {
        self.orbit.end_drag();
    }

    pub fn on_wheel(&mut self, steps: f32) {
        self.orbit.zoom(steps, &mut self.camera);
    }

    fn hit_test(&self, position: Vec2) -> Option<ObjectTag> {
        let (_, ray) = PointerMapper::to_ray(position, &self.canvas, &self.camera);
        pick_nearest(&ray, &self.scene).map(|(tag, _)| tag)
    }

    fn open_info_at(&mut self, position: Vec2) {
        let Some(tag) = self.hit_test(position) else {
            return;
        };

        let Some(text) = info_text::text_for(tag) else {
            log::warn!("unknown object intersected: {:?}", tag);
            return;
        };

        let Some(world) = self.scene.get(tag).map(|obj| obj.transform.position) else {
            return;
        };
        let anchor = self.camera.project(world, self.canvas.aspect());
        self.popup.show(tag, text, anchor);
    }

    // UI controls

    pub fn grid_visible(&self) -> bool {
        self.scene.is_visible(ObjectTag::Grid)
    }

    pub fn set_grid_visible(&mut self, visible: bool) {
        self.scene.set_visible(ObjectTag::Grid, visible);
    }

    pub fn axes_visible(&self) -> bool {
        self.scene.is_visible(ObjectTag::Axes)
    }

    pub fn set_axes_visible(&mut self, visible: bool) {
        self.scene.set_visible(ObjectTag::Axes, visible);
    }

    pub fn ambient_intensity(&self) -> f32 {
        self.lighting.ambient.intensity
    }

    pub fn ambient_max(&self) -> f32 {
        self.config.lighting.ambient_max
    }

    /// Out-of-range values are clamped, NaN is ignored
    pub fn set_ambient_intensity(&mut self, intensity: f32) {
        if intensity.is_nan() {
            return;
        }
        self.lighting.ambient.intensity = intensity.clamp(0.0, self.ambient_max());
    }

    pub fn rotation_speed(&self) -> f32 {
        self.rotation_speed
    }

    pub fn rotation_speed_max(&self) -> f32 {
        self.config.scene.rotation.slider_max
    }

    /// One speed for every torus axis and the moon spin
    pub fn set_rotation_speed(&mut self, speed: f32) {
        if speed.is_nan() {
            return;
        }
        let speed = speed.clamp(0.0, self.rotation_speed_max());
        self.rotation_speed = speed;
        self.torus_speed = Vec3::splat(speed);
        self.moon_speed = speed;
    }

    pub fn star_count(&self) -> usize {
        self.scene.star_count()
    }

    pub fn star_limit(&self) -> usize {
        self.config.stars.max_count
    }

    /// Regenerate the star field. Returns the count actually used, which the
    /// input field should be corrected to.
    pub fn set_star_count(&mut self, requested: i64) -> usize {
        let count = starfield::clamp_star_count(requested, self.star_limit());
        if count as i64 != requested {
            log::debug!("star count {} clamped to {}", requested, count);
        }

        let stars = starfield::generate(count, self.config.stars.spread, &mut self.rng);
        self.scene.replace_stars(stars);
        count
    }

    /// Put the camera back exactly where it started, looking at the origin
    pub fn reset_camera(&mut self) {
        self.camera = Camera::from(self.initial_pose);
        self.orbit.reset(Vec3::ZERO);
        log::debug!("camera reset");
    }

    /// Advance one frame of `dt` seconds
    pub fn animate(&mut self, dt: f32) {
        let frames = dt * REFERENCE_FPS;

        if let Some(torus) = self.scene.get_mut(ObjectTag::Torus) {
            torus.transform.rotation += self.torus_speed * frames;
        }
        if let Some(moon) = self.scene.get_mut(ObjectTag::Moon) {
            moon.transform.rotation.y += self.moon_speed * frames;
        }

        self.popup.advance(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ObjectRole;

    fn controller() -> SceneController {
        SceneController::with_rng(AppConfig::default(), StdRng::seed_from_u64(9))
    }

    fn screen_point(controller: &SceneController, tag: ObjectTag) -> Vec2 {
        let world = controller.scene().get(tag).map(|obj| obj.transform.position).unwrap();
        let canvas = *controller.canvas();
        canvas.ndc_to_pixels(controller.camera().project(world, canvas.aspect()))
    }

    #[test]
    fn test_initial_state() {
        let controller = controller();
        assert_eq!(controller.star_count(), 300);
        assert!(!controller.grid_visible());
        assert!(!controller.axes_visible());
        assert_eq!(controller.ambient_intensity(), 50.0);
        assert!(!controller.popup().is_shown());
        assert_eq!(controller.highlighted(), None);
    }

    #[test]
    fn test_hover_and_leave() {
        let mut controller = controller();
        let moon = screen_point(&controller, ObjectTag::Moon);

        controller.on_pointer_move(moon);
        assert_eq!(controller.highlighted(), Some(ObjectTag::Moon));

        controller.on_pointer_move(Vec2::new(5.0, 5.0));
        assert_eq!(controller.highlighted(), None);
        let emissive = controller.scene().get(ObjectTag::Moon).and_then(|m| m.material.emissive);
        assert_eq!(emissive, Some(0x000000));
    }

    #[test]
    fn test_click_a_then_b_leaves_one_panel() {
        let mut controller = controller();
        let now = Instant::now();
        let moon = screen_point(&controller, ObjectTag::Moon);
        let portrait = screen_point(&controller, ObjectTag::Portrait);

        controller.on_click(moon, false, now);
        assert_eq!(controller.popup().panel().map(|p| p.tag), Some(ObjectTag::Moon));

        controller.on_click(portrait, false, now);
        let panel = controller.popup().panel().expect("panel");
        assert_eq!(panel.tag, ObjectTag::Portrait);
        assert_eq!(Some(panel.text), info_text::text_for(ObjectTag::Portrait));
    }

    #[test]
    fn test_click_empty_space_dismisses() {
        let mut controller = controller();
        let now = Instant::now();
        let moon = screen_point(&controller, ObjectTag::Moon);

        controller.on_click(moon, false, now);
        controller.on_click(Vec2::new(5.0, 5.0), false, now);
        assert!(!controller.popup().is_shown());
    }

    #[test]
    fn test_click_over_ui_does_not_pick() {
        let mut controller = controller();
        let portrait = screen_point(&controller, ObjectTag::Portrait);
        controller.on_click(portrait, true, Instant::now());
        assert!(!controller.popup().is_shown());
    }

    #[test]
    fn test_touch_opens_panel_and_swallows_emulated_click() {
        let mut controller = controller();
        let now = Instant::now();
        let portrait = screen_point(&controller, ObjectTag::Portrait);

        controller.on_touch_start(portrait);
        controller.on_touch_end(portrait, false, now);
        assert!(controller.popup().is_shown());

        // The synthesized click lands outside any panel rect but is dropped
        controller.on_click(Vec2::new(5.0, 5.0), false, now + Duration::from_millis(10));
        assert!(controller.popup().is_shown());

        controller.on_touch_start(Vec2::new(5.0, 5.0));
        assert!(!controller.popup().is_shown());
    }

    #[test]
    fn test_checkable_object_without_info_is_ignored() {
        let mut controller = controller();
        let now = Instant::now();
        let moon = screen_point(&controller, ObjectTag::Moon);
        if let Some(torus) = controller.scene.get_mut(ObjectTag::Torus) {
            torus.role = ObjectRole::Checkable;
        }

        // A point on the ring, clear of the portrait box at the centre
        let canvas = *controller.canvas();
        let ring = canvas.ndc_to_pixels(controller.camera().project(Vec3::new(6.0, 0.0, 0.0), canvas.aspect()));
        let (_, ray) = PointerMapper::to_ray(ring, &canvas, controller.camera());
        assert_eq!(pick_nearest(&ray, controller.scene()).map(|(tag, _)| tag), Some(ObjectTag::Torus));

        controller.on_click(ring, false, now);
        assert!(!controller.popup().is_shown());

        // The ignored click still runs the open panel's outside-click listener
        controller.on_click(moon, false, now);
        assert!(controller.popup().is_shown());
        controller.on_click(ring, false, now);
        assert!(!controller.popup().is_shown());
    }

    #[test]
    fn test_overlapping_click_opens_nearest() {
        let mut controller = controller();
        if let Some(moon) = controller.scene.get_mut(ObjectTag::Moon) {
            moon.transform.position = Vec3::new(0.0, 0.0, 10.0);
        }
        let centre = screen_point(&controller, ObjectTag::Portrait);

        controller.on_click(centre, false, Instant::now());
        assert_eq!(controller.popup().panel().map(|p| p.tag), Some(ObjectTag::Moon));
    }

    #[test]
    fn test_star_count_clamped() {
        let mut controller = controller();
        assert_eq!(controller.set_star_count(50_000), 10_000);
        assert_eq!(controller.star_count(), 10_000);
        assert_eq!(controller.set_star_count(-1), 0);
        assert_eq!(controller.star_count(), 0);
        assert_eq!(controller.set_star_count(42), 42);
    }

    #[test]
    fn test_ambient_and_rotation_controls() {
        let mut controller = controller();
        controller.set_ambient_intensity(500.0);
        assert_eq!(controller.ambient_intensity(), 100.0);
        controller.set_ambient_intensity(f32::NAN);
        assert_eq!(controller.ambient_intensity(), 100.0);

        controller.set_rotation_speed(0.01);
        controller.animate(1.0 / 60.0);
        let torus = controller.scene().get(ObjectTag::Torus).unwrap().transform.rotation;
        assert!((torus - Vec3::splat(0.01)).length() < 1e-6);
    }

    #[test]
    fn test_helpers_toggle() {
        let mut controller = controller();
        controller.set_grid_visible(true);
        controller.set_axes_visible(true);
        assert!(controller.grid_visible());
        assert!(controller.axes_visible());
        controller.set_grid_visible(false);
        assert!(!controller.grid_visible());
    }

    #[test]
    fn test_reset_camera_is_exact() {
        let mut controller = controller();
        let initial = controller.camera().pose();

        controller.begin_orbit(DragMode::Rotate, Vec2::new(100.0, 100.0));
        controller.on_pointer_move(Vec2::new(400.0, 250.0));
        controller.end_orbit();
        controller.on_wheel(3.0);
        assert_ne!(controller.camera().pose(), initial);

        controller.reset_camera();
        assert_eq!(controller.camera().pose(), initial);
    }
}
