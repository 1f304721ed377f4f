use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window},
};
use std::sync::Arc;
use std::time::Instant;

// Import from the library crate
use walkthrough::{
    config::Tuning,
    controller::{FrameClock, InputEvent, PointerCapture, Walkthrough},
    logging,
    model::HouseLayout,
    ui::{self, UiAction, UiFrame},
    view::{GpuContext, GpuError, PlayerDraw, RenderState},
};

struct App {
    gpu: GpuContext,
    window: Arc<Window>,
    render_state: RenderState,

    // egui
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,

    walkthrough: Walkthrough,
    clock: FrameClock,
    started: Instant,
}

impl App {
    async fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();
        let gpu = GpuContext::new_native(window.clone(), size.width, size.height).await?;
        let width = gpu.config.width;
        let height = gpu.config.height;

        let tuning = Tuning::from_env();
        let mut render_state = RenderState::new(
            gpu.device.as_ref(),
            gpu.format,
            gpu.config.alpha_mode,
            width,
            height,
            tuning.house_origin[1],
            (tuning.capsule_radius, tuning.player_height()),
        );

        let mut walkthrough = Walkthrough::new(tuning, width, height);
        match HouseLayout::default_house().and_then(|layout| walkthrough.load_scene(&layout)) {
            Ok(report) => tracing::info!(?report, "house loaded"),
            Err(e) => tracing::error!("house failed to load: {e}"),
        }
        walkthrough.spawn_player_default();
        if let Some(scene) = walkthrough.scene() {
            render_state.set_scene(gpu.device.as_ref(), scene);
        }

        // Initialize egui
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        Ok(Self {
            gpu,
            window,
            render_state,
            egui_state,
            egui_ctx,
            walkthrough,
            clock: FrameClock::default(),
            started: Instant::now(),
        })
    }

    fn input(&mut self, event: &WindowEvent) {
        let _ = self.egui_state.on_window_event(self.window.as_ref(), event);

        match event {
            WindowEvent::KeyboardInput { event: KeyEvent { state, physical_key, repeat, .. }, .. } => {
                let PhysicalKey::Code(code) = physical_key else {
                    return;
                };
                if *code == KeyCode::Escape && *state == ElementState::Pressed {
                    self.set_pointer_capture(false);
                    return;
                }
                // KeyCode's Debug name matches the DOM `code` ("KeyW", "ArrowUp", ...)
                let name = format!("{code:?}");
                match state {
                    ElementState::Pressed if !repeat => self.walkthrough.process_event(&InputEvent::KeyDown(name)),
                    ElementState::Pressed => {}
                    ElementState::Released => self.walkthrough.process_event(&InputEvent::KeyUp(name)),
                }
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                if self.walkthrough.rig().is_first_person() && !self.walkthrough.pointer_locked() {
                    self.set_pointer_capture(true);
                }
            }
            WindowEvent::Focused(false) => self.walkthrough.process_event(&InputEvent::FocusLost),
            WindowEvent::Occluded(occluded) => {
                self.walkthrough.process_event(&InputEvent::VisibilityChanged { visible: !occluded });
            }
            _ => {}
        }
    }

    /// Grab and hide the cursor (or give it back) and tell the sampler.
    fn set_pointer_capture(&mut self, capture: bool) {
        let locked = if capture {
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = &grabbed {
                tracing::warn!(%e, "cursor grab unavailable");
            }
            grabbed.is_ok()
        } else {
            let _ = self.window.set_cursor_grab(CursorGrabMode::None);
            false
        };
        self.window.set_cursor_visible(!locked);
        self.walkthrough.process_event(&InputEvent::PointerLockChanged { locked });
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if self.render_state.resize(self.gpu.device.as_ref(), &self.gpu.surface, new_size.width, new_size.height) {
            self.walkthrough.resize(new_size.width, new_size.height);
        }
    }

    fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.walkthrough.process_event(&InputEvent::MouseMove { dx: dx as f32, dy: dy as f32 });
    }

    /// Advance and draw one frame. Returns false when the app should quit.
    fn frame(&mut self) -> bool {
        let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let dt = self.clock.tick(now_ms);

        let out = self.walkthrough.tick(dt);
        match out.pointer {
            Some(PointerCapture::Acquire) => self.set_pointer_capture(true),
            Some(PointerCapture::Release) => self.set_pointer_capture(false),
            None => {}
        }
        if out.toggled.is_some() {
            if let Some(scene) = self.walkthrough.scene() {
                self.render_state.set_scene(self.gpu.device.as_ref(), scene);
            }
        }

        let w = &self.walkthrough;
        let player = w.player().zip(w.player_position()).map(|(p, position)| PlayerDraw {
            position,
            facing: p.facing,
            visible: !w.rig().is_first_person(),
        });
        self.render_state.update_uniforms(self.gpu.queue.as_ref(), w.camera(), (now_ms / 1000.0) as f32, player);

        let device_lost = self.gpu.device_lost.is_lost();
        let raw_input = self.egui_state.take_egui_input(&self.window);
        let ui_frame = UiFrame { overlay: &out.overlay, fps: self.clock.fps(), device_lost };
        let (mut full_output, action) = ui::build_ui(&self.egui_ctx, raw_input, &self.walkthrough, &ui_frame);
        self.egui_state.handle_platform_output(&self.window, std::mem::take(&mut full_output.platform_output));
        if action == Some(UiAction::Reload) {
            return false;
        }
        if device_lost {
            tracing::error!("graphics device lost, exiting");
            return false;
        }

        let dpr = self.window.scale_factor() as f32;
        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
        self.render_state.set_ui(primitives, full_output, dpr);

        match self.render_state.draw_frame(self.gpu.device.as_ref(), self.gpu.queue.as_ref(), &self.gpu.surface) {
            Ok(()) => true,
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("surface out of memory, exiting");
                false
            }
            Err(e) => {
                tracing::warn!(?e, "frame dropped");
                true
            }
        }
    }
}

#[allow(deprecated)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title("Walkthrough")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window.clone()))?;

    event_loop.run(move |event, elwt| {
        match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == app.window.id() => {
                app.input(event);
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(physical_size) => app.resize(*physical_size),
                    WindowEvent::RedrawRequested => {
                        if !app.frame() {
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::DeviceEvent { event: DeviceEvent::MouseMotion { delta }, .. } => {
                app.handle_mouse_motion(delta.0, delta.1);
            }
            Event::AboutToWait => {
                app.window.request_redraw();
            }
            _ => {}
        }
    })?;
    Ok(())
}
