//! Platform-agnostic input handling
use std::collections::HashSet;

use glam::Vec2;

/// Platform-independent input events. Keys are physical key codes
/// (`"KeyW"`, `"ArrowUp"`, `"ShiftLeft"`, ...).
#[derive(Debug, Clone)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    MouseMove { dx: f32, dy: f32 },
    FocusLost,
    VisibilityChanged { visible: bool },
    PointerLockChanged { locked: bool },
}

/// Logical controls a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Forward,
    Backward,
    Left,
    Right,
    Run,
    ToggleCamera,
    ToggleDebug,
    Interact,
}

impl Control {
    /// Actions fire once per physical press; the rest are polled as levels.
    pub fn is_action(self) -> bool {
        matches!(self, Control::ToggleCamera | Control::ToggleDebug | Control::Interact)
    }
}

/// Level state of every control: true while a bound key is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub run: bool,
    pub toggle_camera: bool,
    pub toggle_debug: bool,
    pub interact: bool,
}

impl ControlState {
    pub fn set(&mut self, control: Control, held: bool) {
        match control {
            Control::Forward => self.forward = held,
            Control::Backward => self.backward = held,
            Control::Left => self.left = held,
            Control::Right => self.right = held,
            Control::Run => self.run = held,
            Control::ToggleCamera => self.toggle_camera = held,
            Control::ToggleDebug => self.toggle_debug = held,
            Control::Interact => self.interact = held,
        }
    }
}

/// Discrete presses collected since the last sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Actions {
    pub toggle_camera: bool,
    pub toggle_debug: bool,
    pub interact: bool,
}

impl Actions {
    fn press(&mut self, control: Control) {
        match control {
            Control::ToggleCamera => self.toggle_camera = true,
            Control::ToggleDebug => self.toggle_debug = true,
            Control::Interact => self.interact = true,
            _ => {}
        }
    }
}

/// Everything the frame loop reads from input for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub controls: ControlState,
    pub pressed: Actions,
    pub look_delta: Vec2,
}

/// Key mapping configuration
#[derive(Clone, Debug)]
pub struct KeyBindings {
    bindings: Vec<(String, Control)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let bindings = [
            ("KeyW", Control::Forward),
            ("ArrowUp", Control::Forward),
            ("KeyS", Control::Backward),
            ("ArrowDown", Control::Backward),
            ("KeyA", Control::Left),
            ("ArrowLeft", Control::Left),
            ("KeyD", Control::Right),
            ("ArrowRight", Control::Right),
            ("ShiftLeft", Control::Run),
            ("ShiftRight", Control::Run),
            ("KeyC", Control::ToggleCamera),
            ("KeyX", Control::ToggleDebug),
            ("KeyE", Control::Interact),
        ];
        Self { bindings: bindings.into_iter().map(|(k, c)| (k.to_string(), c)).collect() }
    }
}

impl KeyBindings {
    pub fn lookup(&self, code: &str) -> Option<Control> {
        self.bindings.iter().find(|(k, _)| k == code).map(|(_, c)| *c)
    }

    /// Whether the browser's default action for this key should be suppressed.
    pub fn is_bound(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }
}

/// Turns raw events into control levels and once-per-press actions.
pub struct InputSampler {
    bindings: KeyBindings,
    held: HashSet<String>,
    controls: ControlState,
    pending: Actions,
    look_delta: Vec2,
    pub pointer_locked: bool,
}

impl InputSampler {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
            controls: ControlState::default(),
            pending: Actions::default(),
            look_delta: Vec2::ZERO,
            pointer_locked: false,
        }
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(code) => {
                // Auto-repeat delivers KeyDown again for a held key; only the first counts
                let newly_pressed = self.held.insert(code.clone());
                if let Some(control) = self.bindings.lookup(code) {
                    if newly_pressed && control.is_action() {
                        tracing::debug!(?control, "action pressed");
                        self.pending.press(control);
                    }
                    self.refresh_controls();
                }
            }
            InputEvent::KeyUp(code) => {
                self.held.remove(code.as_str());
                self.refresh_controls();
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta += Vec2::new(*dx, *dy);
                }
            }
            InputEvent::FocusLost => self.clear_keys(),
            InputEvent::VisibilityChanged { visible } => {
                if !visible {
                    self.clear_keys();
                }
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
                if !locked {
                    self.look_delta = Vec2::ZERO;
                }
            }
        }
    }

    fn refresh_controls(&mut self) {
        let mut controls = ControlState::default();
        for code in &self.held {
            if let Some(control) = self.bindings.lookup(code) {
                controls.set(control, true);
            }
        }
        self.controls = controls;
    }

    pub fn clear_keys(&mut self) {
        self.held.clear();
        self.controls = ControlState::default();
    }

    pub fn controls(&self) -> ControlState {
        self.controls
    }

    /// Snapshot for one tick; pending presses and look delta are consumed.
    pub fn sample(&mut self) -> FrameInput {
        FrameInput {
            controls: self.controls,
            pressed: std::mem::take(&mut self.pending),
            look_delta: std::mem::take(&mut self.look_delta),
        }
    }
}

impl Default for InputSampler {
    fn default() -> Self {
        Self::new(KeyBindings::default())
    }
}

pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, MouseEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let code = e.code();
        if is_down {
            InputEvent::KeyDown(code)
        } else {
            InputEvent::KeyUp(code)
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove { dx: e.movement_x() as f32, dy: e.movement_y() as f32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(s: &mut InputSampler, code: &str) {
        s.process_event(&InputEvent::KeyDown(code.to_string()));
    }

    fn up(s: &mut InputSampler, code: &str) {
        s.process_event(&InputEvent::KeyUp(code.to_string()));
    }

    #[test]
    fn test_movement_keys_are_levels() {
        let mut s = InputSampler::default();
        down(&mut s, "KeyW");
        down(&mut s, "KeyW");
        assert!(s.sample().controls.forward);
        assert!(s.sample().controls.forward, "level persists across samples");
        up(&mut s, "KeyW");
        assert!(!s.sample().controls.forward);
    }

    #[test]
    fn test_alternate_bindings_share_a_control() {
        let mut s = InputSampler::default();
        down(&mut s, "KeyA");
        down(&mut s, "ArrowLeft");
        up(&mut s, "KeyA");
        assert!(s.controls().left, "still held through the arrow key");
        up(&mut s, "ArrowLeft");
        assert!(!s.controls().left);
    }

    #[test]
    fn test_conflicting_keys_are_legal() {
        let mut s = InputSampler::default();
        down(&mut s, "KeyW");
        down(&mut s, "KeyS");
        let c = s.sample().controls;
        assert!(c.forward && c.backward);
    }

    #[test]
    fn test_action_fires_once_per_press() {
        let mut s = InputSampler::default();
        down(&mut s, "KeyC");
        assert!(s.sample().pressed.toggle_camera);
        // held with auto-repeat
        down(&mut s, "KeyC");
        for _ in 0..10 {
            let frame = s.sample();
            assert!(!frame.pressed.toggle_camera);
            assert!(frame.controls.toggle_camera, "level stays true while held");
        }
        up(&mut s, "KeyC");
        down(&mut s, "KeyC");
        assert!(s.sample().pressed.toggle_camera);
    }

    #[test]
    fn test_press_between_ticks_is_not_lost() {
        let mut s = InputSampler::default();
        down(&mut s, "KeyE");
        up(&mut s, "KeyE");
        let frame = s.sample();
        assert!(frame.pressed.interact);
        assert!(!frame.controls.interact);
    }

    #[test]
    fn test_focus_loss_clears_keys() {
        let mut s = InputSampler::default();
        down(&mut s, "KeyD");
        down(&mut s, "ShiftLeft");
        s.process_event(&InputEvent::FocusLost);
        assert_eq!(s.controls(), ControlState::default());
    }

    #[test]
    fn test_look_only_while_locked() {
        let mut s = InputSampler::default();
        s.process_event(&InputEvent::MouseMove { dx: 5.0, dy: 5.0 });
        assert_eq!(s.sample().look_delta, Vec2::ZERO);

        s.process_event(&InputEvent::PointerLockChanged { locked: true });
        s.process_event(&InputEvent::MouseMove { dx: 3.0, dy: -1.0 });
        s.process_event(&InputEvent::MouseMove { dx: 2.0, dy: -1.0 });
        assert_eq!(s.sample().look_delta, Vec2::new(5.0, -2.0));
        assert_eq!(s.sample().look_delta, Vec2::ZERO, "delta is consumed");
    }

    #[test]
    fn test_unbound_keys_ignored() {
        let mut s = InputSampler::default();
        down(&mut s, "KeyQ");
        let frame = s.sample();
        assert_eq!(frame.controls, ControlState::default());
        assert_eq!(frame.pressed, Actions::default());
    }
}
