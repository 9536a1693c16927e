pub mod gui_builder;

use glam::Vec2;
use imgui::Ui;

use crate::controller::SceneController;
use gui_builder::GuiPanelBuilder;

/// Immediate-mode UI: the controls panel and the info popup.
///
/// Widgets edit local copies of the controller's values; changes are
/// written back through the controller's setters after the panel is built,
/// so clamping rules live in one place.
pub struct UiManager {
    /// Contents of the star count field, corrected after each commit
    star_input: i32,
}

impl UiManager {
    pub fn new(controller: &SceneController) -> Self {
        Self {
            star_input: controller.star_count() as i32,
        }
    }

    /// Build all UI for this frame
    pub fn build_ui(&mut self, ui: &Ui, controller: &mut SceneController) {
        self.build_controls_panel(ui, controller);
        Self::build_info_popup(ui, controller);
    }

    fn build_controls_panel(&mut self, ui: &Ui, controller: &mut SceneController) {
        let mut grid = controller.grid_visible();
        let mut axes = controller.axes_visible();
        let mut ambient = controller.ambient_intensity();
        let ambient_max = controller.ambient_max();
        let mut speed = controller.rotation_speed();
        let speed_max = controller.rotation_speed_max();
        let star_label = format!("Star count (0-{})", controller.star_limit());

        let mut committed_stars = None;
        let mut reset_camera = false;
        let star_input = &mut self.star_input;

        GuiPanelBuilder::new(ui, "Controls")
            .position(10.0, 10.0)
            .build(|content| {
                content
                    .header("Helpers")
                    .checkbox("Grid helper", &mut grid)
                    .checkbox("Axes helper", &mut axes)
                    .header("Lighting")
                    .slider_f32("Ambient light", &mut ambient, 0.0, ambient_max, "%.2f")
                    .header("Animation")
                    .slider_f32("Rotation speed", &mut speed, 0.0, speed_max, "%.4f")
                    .header("Stars")
                    .input_int(&star_label, star_input, |value| committed_stars = Some(value))
                    .hint("Enter or click away to apply")
                    .spacing()
                    .separator()
                    .button("Reset camera", || reset_camera = true);
            });

        if grid != controller.grid_visible() {
            controller.set_grid_visible(grid);
        }
        if axes != controller.axes_visible() {
            controller.set_axes_visible(axes);
        }
        if ambient != controller.ambient_intensity() {
            controller.set_ambient_intensity(ambient);
        }
        if speed != controller.rotation_speed() {
            controller.set_rotation_speed(speed);
        }
        if let Some(requested) = committed_stars {
            self.commit_star_count(controller, requested);
        }
        if reset_camera {
            controller.reset_camera();
        }
    }

    /// Apply a typed star count and write the corrected value back into the field
    fn commit_star_count(&mut self, controller: &mut SceneController, requested: i32) {
        let count = controller.set_star_count(i64::from(requested));
        self.star_input = count as i32;
    }

    /// Draw the info panel next to the clicked object, kept inside the viewport
    fn build_info_popup(ui: &Ui, controller: &mut SceneController) {
        let Some(panel) = controller.popup().panel() else {
            return;
        };
        let title = panel.tag.label();
        let text = panel.text;
        let opacity = controller.popup().opacity();
        let width = controller.config().interaction.popup_width;

        // Measure before placing so the clamp sees the real height
        let style = ui.clone_style();
        let padding = Vec2::from(style.window_padding);
        let spacing = style.item_spacing[1];
        let wrap_width = (width - 2.0 * padding.x).max(1.0);
        let title_height = ui.calc_text_size(title)[1];
        let text_height = ui.calc_text_size_with_opts(text, false, wrap_width)[1];
        let height = 2.0 * padding.y + title_height + text_height + 3.0 * spacing + 1.0;

        let viewport = Vec2::from(ui.io().display_size);
        let Some(rect) = controller.popup_mut().place(viewport, Vec2::new(width, height)) else {
            return;
        };

        let _alpha = ui.push_style_var(imgui::StyleVar::Alpha(opacity));
        ui.window("##info_popup")
            .position(rect.min().to_array(), imgui::Condition::Always)
            .size(rect.size().to_array(), imgui::Condition::Always)
            .no_decoration()
            .focus_on_appearing(false)
            .bg_alpha(0.85)
            .build(|| {
                ui.text_colored([1.0, 0.8, 0.4, 1.0], title);
                ui.separator();
                ui.text_wrapped(text);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_committed_star_count_is_corrected_in_field() {
        let mut controller = SceneController::with_rng(AppConfig::default(), StdRng::seed_from_u64(3));
        let mut ui = UiManager::new(&controller);
        assert_eq!(ui.star_input, 300);

        ui.star_input = 50_000;
        ui.commit_star_count(&mut controller, 50_000);
        assert_eq!(ui.star_input, 10_000);
        assert_eq!(controller.star_count(), 10_000);

        ui.commit_star_count(&mut controller, -5);
        assert_eq!(ui.star_input, 0);
        assert_eq!(controller.star_count(), 0);
    }
}
