use imgui::Ui;

/// Section titles in the control panel
const HEADER_COLOR: [f32; 4] = [0.99, 0.55, 0.25, 1.0];

/// Builder for creating GUI panels with common controls
pub struct GuiPanelBuilder<'a> {
    ui: &'a Ui,
    title: &'a str,
    position: [f32; 2],
}

impl<'a> GuiPanelBuilder<'a> {
    pub fn new(ui: &'a Ui, title: &'a str) -> Self {
        Self {
            ui,
            title,
            position: [10.0, 10.0],
        }
    }

    pub fn position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Show the panel, sized to fit its contents
    pub fn build<F>(self, f: F)
    where
        F: FnOnce(&mut GuiContentBuilder),
    {
        self.ui
            .window(self.title)
            .position(self.position, imgui::Condition::FirstUseEver)
            .always_auto_resize(true)
            .build(|| {
                let mut content = GuiContentBuilder::new(self.ui);
                f(&mut content);
            });
    }
}

/// Builder for adding controls to a GUI panel
pub struct GuiContentBuilder<'a> {
    ui: &'a Ui,
}

impl<'a> GuiContentBuilder<'a> {
    fn new(ui: &'a Ui) -> Self {
        Self { ui }
    }

    /// Dimmed hint line
    pub fn hint(&mut self, text: &str) -> &mut Self {
        self.ui.text_disabled(text);
        self
    }

    pub fn separator(&mut self) -> &mut Self {
        self.ui.separator();
        self
    }

    pub fn header(&mut self, text: &str) -> &mut Self {
        self.ui.spacing();
        self.ui.text_colored(HEADER_COLOR, text);
        self.ui.separator();
        self
    }

    /// Slider with a printf-style display format, e.g. "%.4f" for small speeds
    pub fn slider_f32(&mut self, label: &str, value: &mut f32, min: f32, max: f32, format: &str) -> &mut Self {
        self.ui
            .slider_config(label, min, max)
            .display_format(format)
            .build(value);
        self
    }

    /// Integer field that calls `on_commit` when the user presses Enter or
    /// leaves the field after editing it
    pub fn input_int<F>(&mut self, label: &str, value: &mut i32, on_commit: F) -> &mut Self
    where
        F: FnOnce(i32),
    {
        let entered = self.ui.input_int(label, value).enter_returns_true(true).build();
        if entered || self.ui.is_item_deactivated_after_edit() {
            on_commit(*value);
        }
        self
    }

    pub fn button<F>(&mut self, label: &str, on_click: F) -> &mut Self
    where
        F: FnOnce(),
    {
        if self.ui.button(label) {
            on_click();
        }
        self
    }

    pub fn checkbox(&mut self, label: &str, value: &mut bool) -> &mut Self {
        self.ui.checkbox(label, value);
        self
    }

    pub fn spacing(&mut self) -> &mut Self {
        self.ui.spacing();
        self
    }
}
