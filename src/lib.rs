// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod logging;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{JsCast, JsValue, prelude::wasm_bindgen};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, Window};

#[cfg(target_arch = "wasm32")]
use config::Tuning;
#[cfg(target_arch = "wasm32")]
use controller::{input, FrameClock, InputEvent, KeyBindings, PointerCapture, Walkthrough};
#[cfg(target_arch = "wasm32")]
use model::HouseLayout;
#[cfg(target_arch = "wasm32")]
use ui::{UiAction, UiFrame};
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, PlayerDraw, RenderState};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(&window, &document, &canvas).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: &Window,
    document: &Document,
    canvas: &HtmlCanvasElement,
) -> Result<(), JsValue> {
    let (width, height) = window_size(window);
    canvas.set_width(width);
    canvas.set_height(height);

    // Initialize GPU
    let gpu = GpuContext::new(canvas, width, height)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;

    let width = gpu.config.width;
    let height = gpu.config.height;

    let tuning = Tuning::default();
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

    let walkthrough = Rc::new(RefCell::new(walkthrough));
    let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));

    setup_input_listeners(document, window, canvas, walkthrough.clone(), egui_events.clone())?;

    let egui_ctx = egui::Context::default();
    let mut clock = FrameClock::default();
    let start_ms = now_ms(window);
    let mut lost_notice_shown = false;

    // Continuous redraw using requestAnimationFrame
    let f = RcCellCallback::new(window.clone(), {
        let window = window.clone();
        let document = document.clone();
        let canvas = canvas.clone();

        move || {
            if gpu.device_lost.is_lost() && !lost_notice_shown {
                lost_notice_shown = true;
                show_device_lost_notice(&document);
            }

            let now = now_ms(&window);
            let dt = clock.tick(now);
            let mut walkthrough = walkthrough.borrow_mut();

            let (w, h) = window_size(&window);
            if w != render_state.width || h != render_state.height {
                canvas.set_width(w);
                canvas.set_height(h);
            }
            if render_state.resize(gpu.device.as_ref(), &gpu.surface, w, h) {
                walkthrough.resize(w, h);
            }

            let out = walkthrough.tick(dt);
            match out.pointer {
                Some(PointerCapture::Acquire) => canvas.request_pointer_lock(),
                Some(PointerCapture::Release) => document.exit_pointer_lock(),
                None => {}
            }
            if out.toggled.is_some() {
                if let Some(scene) = walkthrough.scene() {
                    render_state.set_scene(gpu.device.as_ref(), scene);
                }
            }

            let player = walkthrough.player().zip(walkthrough.player_position()).map(|(p, position)| PlayerDraw {
                position,
                facing: p.facing,
                visible: !walkthrough.rig().is_first_person(),
            });
            let time = ((now - start_ms) / 1000.0) as f32;
            render_state.update_uniforms(gpu.queue.as_ref(), walkthrough.camera(), time, player);

            // Build egui input from queued events
            let dpr = window.device_pixel_ratio() as f32;
            let mut raw_input = egui::RawInput::default();
            raw_input.time = Some(now / 1000.0);
            raw_input.screen_rect = Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(render_state.width as f32 / dpr, render_state.height as f32 / dpr),
            ));
            raw_input.events.extend(egui_events.borrow_mut().drain(..));
            egui_ctx.set_pixels_per_point(dpr);

            let ui_frame = UiFrame {
                overlay: &out.overlay,
                fps: clock.fps(),
                device_lost: gpu.device_lost.is_lost(),
            };
            let (mut full_output, action) = ui::build_ui(&egui_ctx, raw_input, &walkthrough, &ui_frame);
            if action == Some(UiAction::Reload) {
                if let Err(e) = window.location().reload() {
                    tracing::error!(?e, "reload failed");
                }
            }

            let primitives = egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
            render_state.set_ui(primitives, full_output, dpr);

            if gpu.device_lost.is_lost() {
                return;
            }
            if let Err(e) = render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface) {
                tracing::warn!(?e, "frame dropped");
            }
        }
    });
    f.start()
}

/// Setup all input event listeners with platform-agnostic abstractions
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    walkthrough: Rc<RefCell<Walkthrough>>,
    egui_events: Rc<RefCell<Vec<egui::Event>>>,
) -> Result<(), JsValue> {
    let bindings = KeyBindings::default();

    // Keyboard down
    {
        let walkthrough = walkthrough.clone();
        let bindings = bindings.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            if bindings.is_bound(&e.code()) {
                e.prevent_default();
            }
            walkthrough.borrow_mut().process_event(&input::wasm::keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let walkthrough = walkthrough.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            if bindings.is_bound(&e.code()) {
                e.prevent_default();
            }
            walkthrough.borrow_mut().process_event(&input::wasm::keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss - clear all keys
    {
        let walkthrough = walkthrough.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            walkthrough.borrow_mut().process_event(&InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change
    {
        let walkthrough = walkthrough.clone();
        let doc_vis = document.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            let visible = !doc_vis.hidden();
            walkthrough.borrow_mut().process_event(&InputEvent::VisibilityChanged { visible });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    // Pointer lock change
    {
        let walkthrough = walkthrough.clone();
        let doc_pl = document.clone();
        let plc = Closure::wrap(Box::new(move |_e: Event| {
            let locked = doc_pl.pointer_lock_element().is_some();
            tracing::debug!(locked, "pointer lock changed");
            walkthrough.borrow_mut().process_event(&InputEvent::PointerLockChanged { locked });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
        plc.forget();
    }

    // Canvas click re-enters pointer lock in first-person (e.g. after Escape)
    {
        let walkthrough = walkthrough.clone();
        let canvas_click = canvas.clone();
        let click = Closure::wrap(Box::new(move |_e: MouseEvent| {
            let w = walkthrough.borrow();
            if w.rig().is_first_person() && !w.pointer_locked() {
                canvas_click.request_pointer_lock();
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
    }

    // Mouse move
    {
        let walkthrough = walkthrough.clone();
        let egui_events_q = egui_events.clone();
        let window_mm = window.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            let mut w = walkthrough.borrow_mut();
            if w.pointer_locked() {
                w.process_event(&input::wasm::mouse_move_to_input(&e));
            } else {
                let pos = client_pos(&window_mm, &e);
                egui_events_q.borrow_mut().push(egui::Event::PointerMoved(pos));
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Mouse buttons feed egui only
    for (name, pressed) in [("mousedown", true), ("mouseup", false)] {
        let egui_events_q = egui_events.clone();
        let window_mb = window.clone();
        let handler = Closure::wrap(Box::new(move |e: MouseEvent| {
            if e.button() != 0 {
                return;
            }
            egui_events_q.borrow_mut().push(egui::Event::PointerButton {
                pos: client_pos(&window_mb, &e),
                button: egui::PointerButton::Primary,
                pressed,
                modifiers: egui::Modifiers::default(),
            });
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback(name, handler.as_ref().unchecked_ref())?;
        handler.forget();
    }

    // Context menu prevention
    {
        let contextmenu = Closure::wrap(Box::new(move |e: MouseEvent| {
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("contextmenu", contextmenu.as_ref().unchecked_ref())?;
        contextmenu.forget();
    }

    Ok(())
}

/// Mouse position in egui points.
#[cfg(target_arch = "wasm32")]
fn client_pos(window: &Window, e: &MouseEvent) -> egui::Pos2 {
    let dpr = window.device_pixel_ratio() as f32;
    egui::pos2(e.client_x() as f32 / dpr, e.client_y() as f32 / dpr)
}

#[cfg(target_arch = "wasm32")]
fn now_ms(window: &Window) -> f64 {
    window.performance().map(|p| p.now()).unwrap_or(0.0)
}

#[cfg(target_arch = "wasm32")]
fn window_size(window: &Window) -> (u32, u32) {
    let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
    let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
    ((w as u32).max(1), (h as u32).max(1))
}

/// Plain DOM notice, since the lost device can no longer draw the egui one.
#[cfg(target_arch = "wasm32")]
fn show_device_lost_notice(document: &Document) {
    let result = (|| -> Result<(), JsValue> {
        let body = document.body().ok_or(js_error("no body on document"))?;
        let notice = document.create_element("div")?;
        notice.set_attribute(
            "style",
            "position:fixed;inset:0;display:flex;flex-direction:column;align-items:center;\
             justify-content:center;background:rgba(0,0,0,0.9);color:#fff;font-family:sans-serif;",
        )?;
        notice.set_inner_html(
            "<h2>The graphics device was lost</h2>\
             <p>The scene can no longer be drawn. Reload to start again.</p>\
             <button onclick=\"location.reload()\">Reload</button>",
        );
        body.append_child(&notice)?;
        Ok(())
    })();
    if let Err(e) = result {
        tracing::error!(?e, "could not show device-lost notice");
    }
}

#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) -> Result<(), JsValue> {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            inner.borrow_mut().as_mut()();

            // Recursively schedule next frame
            let cb_ref = callback_clone.borrow();
            if let Some(cb) = cb_ref.as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!(?e, "requestAnimationFrame failed, frame loop stopped");
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            self.window.request_animation_frame(cb.as_ref().unchecked_ref())?;
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
        Ok(())
    }
}
