use glam::Vec2;
use std::time::Instant;
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, Event, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use crate::config::AppConfig;
use crate::controller::SceneController;
use crate::core::VulkanRenderer;
use crate::orbit::DragMode;

/// Pointer travel, in logical pixels, after which a press counts as a drag
const DRAG_THRESHOLD: f32 = 4.0;

/// Pixels of trackpad scrolling per wheel notch
const PIXELS_PER_LINE: f32 = 40.0;

pub struct Engine {
    event_loop: EventLoop<()>,
    renderer: VulkanRenderer,
    controller: SceneController,
}

/// A left press in progress
struct Press {
    origin: Vec2,
    over_ui: bool,
    dragged: bool,
}

struct InputState {
    cursor: Vec2,
    left_press: Option<Press>,
    last_update_time: Instant,
}

impl InputState {
    fn new() -> Self {
        Self {
            cursor: Vec2::ZERO,
            left_press: None,
            last_update_time: Instant::now(),
        }
    }
}

impl Engine {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(config.window.title.as_str())
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .build(&event_loop)?;

        let mut controller = SceneController::new(config);
        let size = window.inner_size().to_logical::<f32>(window.scale_factor());
        controller.resize(size.width, size.height);

        let renderer = VulkanRenderer::new(window, &controller)?;

        Ok(Self {
            event_loop,
            renderer,
            controller,
        })
    }

    pub fn run(self) -> anyhow::Result<()> {
        let Engine {
            event_loop,
            mut renderer,
            mut controller,
        } = self;
        let mut input = InputState::new();

        event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            // ImGui sees every event first so want_capture_mouse is current
            renderer.handle_imgui_event(&event);

            let event = match event {
                Event::WindowEvent { event, .. } => event,
                Event::AboutToWait => {
                    renderer.window().request_redraw();
                    return;
                }
                _ => return,
            };

            let scale = renderer.window().scale_factor();
            let to_logical = |position: PhysicalPosition<f64>| {
                let logical = position.to_logical::<f32>(scale);
                Vec2::new(logical.x, logical.y)
            };

            match event {
                WindowEvent::CloseRequested => {
                    log::info!("close requested");
                    target.exit();
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let position = to_logical(position);
                    input.cursor = position;

                    if let Some(press) = input.left_press.as_mut() {
                        if position.distance(press.origin) > DRAG_THRESHOLD {
                            press.dragged = true;
                        }
                    }

                    let dragging_scene = input.left_press.as_ref().is_some_and(|press| !press.over_ui);
                    if renderer.imgui_wants_mouse() && !dragging_scene {
                        controller.on_pointer_leave();
                    } else {
                        controller.on_pointer_move(position);
                    }
                }
                WindowEvent::CursorLeft { .. } => {
                    controller.on_pointer_leave();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    let over_ui = renderer.imgui_wants_mouse();
                    match (button, state) {
                        (MouseButton::Left, ElementState::Pressed) => {
                            input.left_press = Some(Press {
                                origin: input.cursor,
                                over_ui,
                                dragged: false,
                            });
                            if !over_ui {
                                controller.begin_orbit(DragMode::Rotate, input.cursor);
                            }
                        }
                        (MouseButton::Left, ElementState::Released) => {
                            controller.end_orbit();
                            // A drag that rotated the view is not a click
                            if let Some(press) = input.left_press.take() {
                                if !press.dragged {
                                    controller.on_click(input.cursor, press.over_ui, Instant::now());
                                }
                            }
                        }
                        (MouseButton::Right, ElementState::Pressed) if !over_ui => {
                            controller.begin_orbit(DragMode::Pan, input.cursor);
                        }
                        (MouseButton::Right, ElementState::Released) => {
                            controller.end_orbit();
                        }
                        _ => {}
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    if !renderer.imgui_wants_mouse() {
                        let steps = match delta {
                            MouseScrollDelta::LineDelta(_x, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                        };
                        controller.on_wheel(steps);
                    }
                }
                WindowEvent::Touch(touch) => {
                    let position = to_logical(touch.location);
                    match touch.phase {
                        TouchPhase::Started => {
                            controller.on_touch_start(position);
                            if !renderer.imgui_wants_mouse() {
                                controller.begin_orbit(DragMode::Rotate, position);
                            }
                        }
                        TouchPhase::Moved => controller.on_pointer_move(position),
                        TouchPhase::Ended => {
                            controller.end_orbit();
                            controller.on_touch_end(position, renderer.imgui_wants_mouse(), Instant::now());
                        }
                        TouchPhase::Cancelled => controller.end_orbit(),
                    }
                }
                WindowEvent::Resized(size) => {
                    let logical = size.to_logical::<f32>(scale);
                    controller.resize(logical.width, logical.height);
                    renderer.handle_resize();
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let delta_time = now.duration_since(input.last_update_time).as_secs_f32();
                    input.last_update_time = now;

                    controller.animate(delta_time);

                    if let Err(e) = renderer.render(&mut controller) {
                        log::error!("Render error: {:#}", e);
                        target.exit();
                    }
                }
                _ => {}
            }
        })?;

        Ok(())
    }
}
