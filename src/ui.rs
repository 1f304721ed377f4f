use egui::Context;

use crate::controller::{CameraMode, DebugInfo, OverlayFrame, Walkthrough};
use crate::model::Camera;

/// Something the UI asks the platform layer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Reload,
}

/// Per-frame inputs to the UI that do not live in `Walkthrough`.
pub struct UiFrame<'a> {
    pub overlay: &'a OverlayFrame,
    pub fps: f32,
    pub device_lost: bool,
}

/// Build the complete UI and return egui output
pub fn build_ui(
    egui_ctx: &Context,
    raw_input: egui::RawInput,
    walkthrough: &Walkthrough,
    frame: &UiFrame,
) -> (egui::FullOutput, Option<UiAction>) {
    let mut action = None;
    let output = egui_ctx.run(raw_input, |ctx| {
        if frame.device_lost {
            action = draw_device_lost(ctx);
            return;
        }
        if walkthrough.rig().mode() == CameraMode::FirstPerson {
            draw_crosshair(ctx);
        }
        draw_prompts(ctx, walkthrough.camera(), frame.overlay);
        if walkthrough.debug_visible() {
            draw_debug_window(ctx, walkthrough.debug_info(), frame.fps);
        }
        draw_help(ctx);
    });
    (output, action)
}

/// Screen positions (in points) of the visible prompts. Prompts behind the
/// camera are dropped.
pub fn prompt_positions<'a>(camera: &Camera, overlay: &'a OverlayFrame, size: egui::Vec2) -> Vec<(egui::Pos2, &'a str)> {
    if !overlay.visible {
        return Vec::new();
    }
    overlay
        .prompts
        .iter()
        .filter_map(|p| {
            let screen = camera.project(p.anchor, size.x, size.y)?;
            Some((egui::pos2(screen.x, screen.y), p.text.as_str()))
        })
        .collect()
}

fn draw_prompts(ctx: &Context, camera: &Camera, overlay: &OverlayFrame) {
    let screen = ctx.screen_rect();
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Foreground, egui::Id::new("prompts")));
    for (pos, text) in prompt_positions(camera, overlay, screen.size()) {
        let galley = painter.layout_no_wrap(text.to_string(), egui::FontId::proportional(16.0), egui::Color32::WHITE);
        let rect = egui::Rect::from_center_size(pos, galley.size() + egui::vec2(16.0, 8.0));
        painter.rect_filled(rect, 4.0, egui::Color32::from_black_alpha(180));
        painter.galley(rect.center() - galley.size() * 0.5, galley, egui::Color32::WHITE);
    }
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.screen_rect().center();
    let size = 6.0;
    let stroke = egui::Stroke::new(1.0, egui::Color32::WHITE);
    painter.line_segment([egui::pos2(center.x - size, center.y), egui::pos2(center.x + size, center.y)], stroke);
    painter.line_segment([egui::pos2(center.x, center.y - size), egui::pos2(center.x, center.y + size)], stroke);
}

fn draw_debug_window(ctx: &Context, info: Option<DebugInfo>, fps: f32) {
    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {fps:.0}")).small());
            let Some(info) = info else {
                ui.label(egui::RichText::new("Player not loaded").small());
                return;
            };
            let p = info.position;
            ui.label(egui::RichText::new(format!("Pos: x: {:.2} y: {:.2} z: {:.2}", p.x, p.y, p.z)).small());
            ui.label(egui::RichText::new(format!("Facing: {:.0}°", info.facing_degrees)).small());
            ui.label(egui::RichText::new(format!("Camera: {:?}", info.mode)).small());
            ui.label(egui::RichText::new(format!("Animation: {}", info.animation.name())).small());
            ui.label(egui::RichText::new(format!("Moving: {}", info.moving)).small());
            ui.separator();
            let c = info.controls;
            let held = [
                ("fwd", c.forward),
                ("back", c.backward),
                ("left", c.left),
                ("right", c.right),
                ("run", c.run),
                ("cam", c.toggle_camera),
                ("debug", c.toggle_debug),
                ("use", c.interact),
            ];
            ui.horizontal_wrapped(|ui| {
                for (name, on) in held {
                    let color = if on { egui::Color32::LIGHT_GREEN } else { egui::Color32::GRAY };
                    ui.label(egui::RichText::new(name).small().color(color));
                }
            });
        });
}

fn draw_help(ctx: &Context) {
    egui::Area::new(egui::Id::new("help"))
        .anchor(egui::Align2::LEFT_BOTTOM, [8.0, -8.0])
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new("WASD/Arrows move   Shift run   C camera   E open/close   X debug")
                    .small()
                    .color(egui::Color32::from_white_alpha(180)),
            );
        });
}

fn draw_device_lost(ctx: &Context) -> Option<UiAction> {
    let mut action = None;
    egui::CentralPanel::default()
        .frame(egui::Frame::NONE.fill(egui::Color32::from_black_alpha(230)))
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.35);
                ui.heading(egui::RichText::new("The graphics device was lost").color(egui::Color32::WHITE));
                ui.label("The scene can no longer be drawn. Reload to start again.");
                ui.add_space(12.0);
                if ui.button("Reload").clicked() {
                    action = Some(UiAction::Reload);
                }
            });
        });
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::controller::Prompt;
    use glam::Vec3;

    fn overlay(anchors: &[Vec3]) -> OverlayFrame {
        OverlayFrame {
            visible: true,
            prompts: anchors
                .iter()
                .map(|&anchor| Prompt { text: "Press E".to_string(), anchor, source: None })
                .collect(),
        }
    }

    #[test]
    fn test_prompt_positions_drop_points_behind_camera() {
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::ZERO;
        camera.target = Vec3::NEG_Z;
        let frame = overlay(&[Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 5.0)]);
        let positions = prompt_positions(&camera, &frame, egui::vec2(800.0, 600.0));
        assert_eq!(positions.len(), 1);
        let (pos, text) = positions[0];
        assert!((pos.x - 400.0).abs() < 1e-3 && (pos.y - 300.0).abs() < 1e-3, "{pos:?}");
        assert_eq!(text, "Press E");
    }

    #[test]
    fn test_hidden_overlay_has_no_positions() {
        let camera = Camera::new(800, 600);
        let mut frame = overlay(&[Vec3::ZERO]);
        frame.visible = false;
        assert!(prompt_positions(&camera, &frame, egui::vec2(800.0, 600.0)).is_empty());
    }

    #[test]
    fn test_build_ui_headless() {
        let ctx = Context::default();
        let walkthrough = Walkthrough::new(Tuning::default(), 800, 600);
        let empty = OverlayFrame::default();
        let frame = UiFrame { overlay: &empty, fps: 60.0, device_lost: false };
        let (_, action) = build_ui(&ctx, egui::RawInput::default(), &walkthrough, &frame);
        assert!(action.is_none());

        let lost = UiFrame { device_lost: true, ..frame };
        let (_, action) = build_ui(&ctx, egui::RawInput::default(), &walkthrough, &lost);
        assert!(action.is_none(), "nothing clicked");
    }
}
