use glam::Vec3;

use super::camera_rig::{CameraMode, CameraRig, PointerCapture};
use super::input::{ControlState, InputEvent, InputSampler, KeyBindings};
use super::interactables::{InteractableRegistry, LoadReport};
use super::motion::{AnimationState, MotionInput, MotionIntegrator, PlayerBody};
use super::overlay::{OverlayFrame, OverlayPresenter};
use super::physics::{BodyKind, ColliderDesc, PhysicsWorld};
use crate::config::Tuning;
use crate::model::{Camera, HouseLayout, InteractableId, LayoutError, SceneGraph};

/// Longest step a single frame may advance, in seconds.
const MAX_DT: f32 = 0.1;

/// Frame timing from a millisecond clock (`performance.now()` or `Instant`).
#[derive(Debug, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
    fps: f32,
    frames: u32,
    timer: f32,
}

impl FrameClock {
    /// Seconds since the previous call, clamped to `[0, MAX_DT]`. Zero on the first call.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => (((now_ms - last) / 1000.0) as f32).clamp(0.0, MAX_DT),
            None => 0.0,
        };
        self.last_ms = Some(now_ms);

        self.frames += 1;
        self.timer += dt;
        if self.timer >= 0.5 {
            self.fps = self.frames as f32 / self.timer;
            self.frames = 0;
            self.timer = 0.0;
        }
        dt
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// What one tick hands back to the platform layer.
#[derive(Debug, Default)]
pub struct TickOutput {
    /// Pointer lock change to apply after a camera mode switch.
    pub pointer: Option<PointerCapture>,
    pub overlay: OverlayFrame,
    pub toggled: Option<InteractableId>,
}

/// Snapshot for the debug panel.
#[derive(Debug, Clone, Copy)]
pub struct DebugInfo {
    pub position: Vec3,
    pub facing_degrees: f32,
    pub controls: ControlState,
    pub moving: bool,
    pub mode: CameraMode,
    pub animation: AnimationState,
}

/// The walkthrough state machine: input, camera, player, interactables and
/// overlay advanced together once per frame. Free of GPU and DOM types.
pub struct Walkthrough {
    tuning: Tuning,
    input: InputSampler,
    rig: CameraRig,
    motion: MotionIntegrator,
    physics: PhysicsWorld,
    scene: Option<SceneGraph>,
    player: Option<PlayerBody>,
    registry: InteractableRegistry,
    overlay: OverlayPresenter,
    camera: Camera,
    debug_visible: bool,
    last_controls: ControlState,
}

impl Walkthrough {
    pub fn new(tuning: Tuning, width: u32, height: u32) -> Self {
        Self {
            input: InputSampler::new(KeyBindings::default()),
            rig: CameraRig::new(&tuning),
            motion: MotionIntegrator::new(&tuning),
            physics: PhysicsWorld::new(),
            scene: None,
            player: None,
            registry: InteractableRegistry::new(&tuning),
            overlay: OverlayPresenter::new(&tuning),
            camera: Camera::new(width, height),
            debug_visible: false,
            last_controls: ControlState::default(),
            tuning,
        }
    }

    /// Build the scene from a layout and register its colliders and interactables.
    /// Replaces any previous scene; an existing player is carried over in place.
    pub fn load_scene(&mut self, layout: &HouseLayout) -> Result<LoadReport, LayoutError> {
        let scene = SceneGraph::from_layout(layout, Vec3::from(self.tuning.house_origin))?;
        let carried = self.player_position();

        self.physics = PhysicsWorld::new();
        self.player = None;
        let (registry, report) = InteractableRegistry::load(&scene, &mut self.physics, &self.tuning);
        self.registry = registry;
        self.scene = Some(scene);

        if let Some(position) = carried {
            self.spawn_player(position);
        }
        Ok(report)
    }

    /// Put the player's kinematic capsule into the world at `position` (feet).
    pub fn spawn_player(&mut self, position: Vec3) {
        let body = self.physics.create_body(BodyKind::Kinematic, position);
        self.physics.attach_collider(
            body,
            ColliderDesc::capsule(self.tuning.capsule_half_height, self.tuning.capsule_radius)
                .with_offset(Vec3::new(0.0, self.tuning.capsule_offset_y, 0.0)),
        );
        self.player = Some(PlayerBody::new(body));
        tracing::info!(?position, "player spawned");
    }

    pub fn spawn_player_default(&mut self) {
        self.spawn_player(Vec3::from(self.tuning.player_spawn));
    }

    pub fn process_event(&mut self, event: &InputEvent) {
        self.input.process_event(event);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    /// Advance one frame.
    pub fn tick(&mut self, dt: f32) -> TickOutput {
        let frame = self.input.sample();
        self.last_controls = frame.controls;

        let pointer = self.rig.toggle(frame.pressed.toggle_camera);
        self.rig.apply_look(frame.look_delta);

        if frame.pressed.toggle_debug {
            self.debug_visible = !self.debug_visible;
            tracing::debug!(visible = self.debug_visible, "debug panel");
        }

        // The view as last drawn, which may still be easing toward the look target.
        let camera_forward = match self.rig.pose() {
            Some(_) => self.camera.forward(),
            None => self.rig.look_direction(),
        };
        if let Some(player) = self.player.as_mut() {
            let input = MotionInput {
                controls: frame.controls,
                mode: self.rig.mode(),
                camera_forward,
                yaw: self.rig.yaw(),
                dt,
            };
            self.motion.integrate(player, &mut self.physics, &input);
        }

        for event in self.physics.step() {
            self.registry.handle_contact(&event);
        }

        let toggled = match self.scene.as_mut() {
            Some(scene) => self.registry.interact(frame.pressed.interact, scene, &mut self.physics),
            None => None,
        };

        let player_position = self.player_position();
        let pose = self.rig.update(player_position);
        self.rig.apply_to(&mut self.camera);

        TickOutput { pointer, overlay: self.overlay.present(self.rig.mode(), pose, &self.registry), toggled }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn registry(&self) -> &InteractableRegistry {
        &self.registry
    }

    pub fn player(&self) -> Option<&PlayerBody> {
        self.player.as_ref()
    }

    pub fn player_position(&self) -> Option<Vec3> {
        self.physics.translation(self.player?.body)
    }

    pub fn pointer_locked(&self) -> bool {
        self.input.pointer_locked
    }

    pub fn debug_visible(&self) -> bool {
        self.debug_visible
    }

    pub fn debug_info(&self) -> Option<DebugInfo> {
        let player = self.player?;
        Some(DebugInfo {
            position: self.player_position()?,
            facing_degrees: player.facing.to_degrees(),
            controls: self.last_controls,
            moving: player.animation != AnimationState::Idle,
            mode: self.rig.mode(),
            animation: player.animation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.1;

    fn loaded(spawn: Vec3) -> Walkthrough {
        let mut w = Walkthrough::new(Tuning::default(), 800, 600);
        w.load_scene(&HouseLayout::default_house().unwrap()).unwrap();
        w.spawn_player(spawn);
        w
    }

    fn key(w: &mut Walkthrough, code: &str, down: bool) {
        let code = code.to_string();
        w.process_event(&if down { InputEvent::KeyDown(code) } else { InputEvent::KeyUp(code) });
    }

    fn tap(w: &mut Walkthrough, code: &str) -> TickOutput {
        key(w, code, true);
        key(w, code, false);
        w.tick(DT)
    }

    /// Feet position in front of the north door, outside the house.
    fn at_door() -> Vec3 {
        Vec3::new(12.0, -4.95, 7.0)
    }

    #[test]
    fn test_frame_clock_clamps() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.tick(1000.0), 0.0);
        assert!((clock.tick(1016.0) - 0.016).abs() < 1e-6);
        assert_eq!(clock.tick(5000.0), MAX_DT, "long stalls are clamped");
        assert_eq!(clock.tick(4000.0), 0.0, "clock going backwards");
    }

    #[test]
    fn test_tick_before_load_only_affects_camera_mode() {
        let mut w = Walkthrough::new(Tuning::default(), 800, 600);
        key(&mut w, "KeyW", true);
        let out = tap(&mut w, "KeyC");
        assert_eq!(out.pointer, Some(PointerCapture::Acquire));
        assert!(!out.overlay.visible);
        assert!(out.toggled.is_none());
        assert!(w.player_position().is_none());
        assert!(w.rig().pose().is_none());
        assert!(tap(&mut w, "KeyE").toggled.is_none());
    }

    #[test]
    fn test_walks_forward_at_walk_speed() {
        let spawn = Vec3::from(Tuning::default().player_spawn);
        let mut w = loaded(spawn);
        key(&mut w, "KeyW", true);
        for _ in 0..10 {
            w.tick(DT);
        }
        let pos = w.player_position().unwrap();
        assert!(pos.abs_diff_eq(spawn + Vec3::new(0.0, 0.0, -2.0), 1e-4), "{pos:?}");
        assert_eq!(w.player().unwrap().animation, AnimationState::Walking);

        key(&mut w, "KeyW", false);
        w.tick(DT);
        assert_eq!(w.player().unwrap().animation, AnimationState::Idle);
        assert!(!w.debug_info().unwrap().moving);
    }

    #[test]
    fn test_first_person_walks_along_current_camera_forward() {
        let spawn = Vec3::from(Tuning::default().player_spawn);
        let mut w = loaded(spawn);
        w.tick(DT);
        assert_eq!(tap(&mut w, "KeyC").pointer, Some(PointerCapture::Acquire));

        // one tick after the switch the camera is still turning away from the third-person view
        let forward = w.camera().forward();
        let flat = Vec3::new(forward.x, 0.0, forward.z).normalize();
        assert!(flat.x < -0.1, "{flat:?}");

        let before = w.player_position().unwrap();
        key(&mut w, "KeyW", true);
        w.tick(DT);
        let moved = w.player_position().unwrap() - before;
        assert!(moved.abs_diff_eq(flat * 0.2, 1e-4), "moved {moved:?}, camera {flat:?}");
        assert_eq!(w.player().unwrap().facing, 0.0, "no visual facing in first-person");
    }

    #[test]
    fn test_first_person_walks_along_look_direction_once_settled() {
        let spawn = Vec3::from(Tuning::default().player_spawn);
        let mut w = loaded(spawn);
        tap(&mut w, "KeyC");
        w.process_event(&InputEvent::PointerLockChanged { locked: true });
        // a quarter turn to the left
        w.process_event(&InputEvent::MouseMove { dx: -std::f32::consts::FRAC_PI_2 / 0.002, dy: 0.0 });
        for _ in 0..300 {
            w.tick(DT);
        }

        let before = w.player_position().unwrap();
        key(&mut w, "KeyW", true);
        w.tick(DT);
        let moved = w.player_position().unwrap() - before;
        assert!(moved.abs_diff_eq(Vec3::new(-0.2, 0.0, 0.0), 1e-4), "{moved:?}");
    }

    #[test]
    fn test_held_camera_key_toggles_once() {
        let spawn = Vec3::from(Tuning::default().player_spawn);
        let mut w = loaded(spawn);
        let mut acquired = 0;
        for _ in 0..10 {
            key(&mut w, "KeyC", true);
            let out = w.tick(DT);
            assert_ne!(out.pointer, Some(PointerCapture::Release));
            if out.pointer == Some(PointerCapture::Acquire) {
                acquired += 1;
            }
            assert_eq!(w.rig().mode(), CameraMode::FirstPerson);
        }
        assert_eq!(acquired, 1);

        key(&mut w, "KeyC", false);
        w.tick(DT);
        assert_eq!(w.rig().mode(), CameraMode::FirstPerson, "release does not toggle");
    }

    #[test]
    fn test_camera_snaps_then_trails() {
        let spawn = Vec3::from(Tuning::default().player_spawn);
        let mut w = loaded(spawn);
        w.tick(DT);
        assert!(w.camera().eye.abs_diff_eq(spawn + Vec3::new(7.0, 10.0, 10.0), 1e-5));
        assert!(w.camera().target.abs_diff_eq(spawn + Vec3::new(0.0, 2.0, 0.0), 1e-5));

        key(&mut w, "KeyD", true);
        w.tick(DT);
        let lag = (spawn.x + 0.2 + 7.0) - w.camera().eye.x;
        assert!(lag > 0.0, "camera eases behind the player");
    }

    #[test]
    fn test_door_cycle_with_overlay() {
        let mut w = loaded(at_door());
        let out = w.tick(DT);
        assert!(out.overlay.visible, "in range of the door");
        let door = w.registry().active_door().unwrap();
        assert!(out.overlay.prompts.iter().any(|p| p.source == Some(door)));

        assert_eq!(tap(&mut w, "KeyE").toggled, Some(door));
        assert!(w.registry().get(door).unwrap().open);
        let scene = w.scene().unwrap();
        let hinge = scene.node(scene.find("Door_Hinge").unwrap()).unwrap();
        assert_eq!(hinge.yaw, std::f32::consts::FRAC_PI_2);

        // still in range after the sensor grew for the open state
        assert!(w.tick(DT).overlay.visible);
        assert_eq!(tap(&mut w, "KeyE").toggled, Some(door));
        assert!(!w.registry().get(door).unwrap().open);
    }

    #[test]
    fn test_first_person_hides_overlay_but_interacts() {
        let mut w = loaded(at_door());
        w.tick(DT);
        tap(&mut w, "KeyC");
        let out = tap(&mut w, "KeyE");
        assert!(!out.overlay.visible);
        assert!(out.toggled.is_some());
    }

    #[test]
    fn test_wall_stops_the_player() {
        let mut w = loaded(Vec3::new(10.8, -4.95, 7.0));
        key(&mut w, "KeyS", true);
        for _ in 0..5 {
            w.tick(DT);
        }
        let pos = w.player_position().unwrap();
        assert!((pos.z - 7.4).abs() < 1e-4, "stopped in front of the north wall, got {pos:?}");
        assert_eq!(pos.y, -4.95);
    }

    #[test]
    fn test_debug_toggle() {
        let mut w = loaded(at_door());
        assert!(!w.debug_visible());
        tap(&mut w, "KeyX");
        assert!(w.debug_visible());
        let info = w.debug_info().unwrap();
        assert_eq!(info.mode, CameraMode::ThirdPerson);
        assert!(info.position.abs_diff_eq(at_door(), 1e-6));
        tap(&mut w, "KeyX");
        assert!(!w.debug_visible());
    }

    #[test]
    fn test_reload_keeps_player() {
        let mut w = loaded(at_door());
        let report = w.load_scene(&HouseLayout::default_house().unwrap()).unwrap();
        assert_eq!(report.doors, 1);
        assert_eq!(w.player_position(), Some(at_door()));
    }
}
