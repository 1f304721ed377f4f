use glam::Vec3;

use super::camera_rig::CameraMode;
use super::input::ControlState;
use super::physics::{BodyHandle, PhysicsWorld};
use crate::config::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Walking,
    Running,
}

impl AnimationState {
    /// Derived fresh every frame, no hysteresis.
    pub fn from_motion(moving: bool, run: bool) -> Self {
        match (moving, run) {
            (false, _) => AnimationState::Idle,
            (true, false) => AnimationState::Walking,
            (true, true) => AnimationState::Running,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AnimationState::Idle => "idle",
            AnimationState::Walking => "walking",
            AnimationState::Running => "running",
        }
    }
}

/// The player: a kinematic body in the physics world plus visual state.
#[derive(Debug, Clone, Copy)]
pub struct PlayerBody {
    pub body: BodyHandle,
    /// Visual heading about +Y, radians. Only meaningful in third-person.
    pub facing: f32,
    pub animation: AnimationState,
}

impl PlayerBody {
    pub fn new(body: BodyHandle) -> Self {
        Self { body, facing: 0.0, animation: AnimationState::Idle }
    }
}

/// Per-tick inputs to the integrator.
#[derive(Debug, Clone, Copy)]
pub struct MotionInput {
    pub controls: ControlState,
    pub mode: CameraMode,
    /// Current camera view direction (any pitch).
    pub camera_forward: Vec3,
    pub yaw: f32,
    pub dt: f32,
}

pub struct MotionIntegrator {
    walk_speed: f32,
    run_speed: f32,
}

impl MotionIntegrator {
    pub fn new(tuning: &Tuning) -> Self {
        Self { walk_speed: tuning.walk_speed, run_speed: tuning.run_speed }
    }

    pub fn speed(&self, run: bool) -> f32 {
        if run { self.run_speed } else { self.walk_speed }
    }

    /// Horizontal (forward, right) unit vectors for the current mode.
    ///
    /// First-person uses the camera forward flattened onto the ground plane;
    /// `yaw` is the fallback when the camera looks straight up or down.
    pub fn movement_basis(mode: CameraMode, camera_forward: Vec3, yaw: f32) -> (Vec3, Vec3) {
        match mode {
            CameraMode::ThirdPerson => (Vec3::NEG_Z, Vec3::X),
            CameraMode::FirstPerson => {
                let forward = Vec3::new(camera_forward.x, 0.0, camera_forward.z)
                    .try_normalize()
                    .unwrap_or_else(|| Vec3::new(-yaw.sin(), 0.0, -yaw.cos()));
                (forward, forward.cross(Vec3::Y).normalize())
            }
        }
    }

    /// Unit movement direction, or zero when the inputs cancel or none are held.
    pub fn direction(controls: &ControlState, basis: (Vec3, Vec3)) -> Vec3 {
        let (forward, right) = basis;
        let mut dir = Vec3::ZERO;
        if controls.forward {
            dir += forward;
        }
        if controls.backward {
            dir -= forward;
        }
        if controls.left {
            dir -= right;
        }
        if controls.right {
            dir += right;
        }
        dir.normalize_or_zero()
    }

    /// Advance the player one frame: write the new position into the physics
    /// body and refresh facing and animation.
    /// No-op (returns `None`) if the body is not in the world.
    pub fn integrate(&self, player: &mut PlayerBody, physics: &mut PhysicsWorld, input: &MotionInput) -> Option<Vec3> {
        let MotionInput { controls, mode, camera_forward, yaw, dt } = *input;
        let current = physics.translation(player.body)?;
        let basis = Self::movement_basis(mode, camera_forward, yaw);
        let dir = Self::direction(&controls, basis);
        let moving = dir != Vec3::ZERO;

        let position = if moving {
            let step = dir * self.speed(controls.run) * dt;
            let desired = Vec3::new(current.x + step.x, current.y, current.z + step.z);
            let resolved = physics.move_kinematic(player.body, desired)?;

            if mode == CameraMode::ThirdPerson {
                player.facing = dir.x.atan2(dir.z);
            }
            resolved
        } else {
            current
        };

        let animation = AnimationState::from_motion(moving, controls.run);
        if animation != player.animation {
            tracing::debug!(from = player.animation.name(), to = animation.name(), "animation");
            player.animation = animation;
        }
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::physics::{BodyKind, ColliderDesc};

    const DT: f32 = 0.1;

    fn setup(start: Vec3) -> (MotionIntegrator, PhysicsWorld, PlayerBody) {
        let mut physics = PhysicsWorld::new();
        let body = physics.create_body(BodyKind::Kinematic, start);
        physics.attach_collider(body, ColliderDesc::capsule(0.8, 0.4).with_offset(Vec3::new(0.0, 1.0, 0.0)));
        (MotionIntegrator::new(&Tuning::default()), physics, PlayerBody::new(body))
    }

    fn input(controls: ControlState, mode: CameraMode, camera_forward: Vec3) -> MotionInput {
        MotionInput { controls, mode, camera_forward, yaw: 0.0, dt: DT }
    }

    fn step(controls: ControlState, mode: CameraMode, camera_forward: Vec3) -> (Vec3, PlayerBody) {
        let start = Vec3::new(1.0, -4.95, 2.0);
        let (motion, mut physics, mut player) = setup(start);
        let end = motion.integrate(&mut player, &mut physics, &input(controls, mode, camera_forward)).unwrap();
        (end - start, player)
    }

    fn held(f: impl Fn(&mut ControlState)) -> ControlState {
        let mut c = ControlState::default();
        f(&mut c);
        c
    }

    #[test]
    fn test_single_direction_unit_speed() {
        let cases: [(fn(&mut ControlState), Vec3); 4] = [
            (|c| c.forward = true, Vec3::NEG_Z),
            (|c| c.backward = true, Vec3::Z),
            (|c| c.left = true, Vec3::NEG_X),
            (|c| c.right = true, Vec3::X),
        ];
        for (set, axis) in cases {
            for run in [false, true] {
                let mut controls = held(set);
                controls.run = run;
                let (d, _) = step(controls, CameraMode::ThirdPerson, Vec3::NEG_Z);
                let speed = if run { 4.0 } else { 2.0 };
                assert!(d.abs_diff_eq(axis * speed * DT, 1e-5), "{axis:?} run={run}: {d:?}");
                assert_eq!(d.y, 0.0);
            }
        }
    }

    #[test]
    fn test_diagonal_is_normalized() {
        let pairs: [fn(&mut ControlState); 4] = [
            |c| { c.forward = true; c.right = true },
            |c| { c.forward = true; c.left = true },
            |c| { c.backward = true; c.right = true },
            |c| { c.backward = true; c.left = true },
        ];
        for set in pairs {
            let (d, _) = step(held(set), CameraMode::ThirdPerson, Vec3::NEG_Z);
            assert!((d.length() - 2.0 * DT).abs() < 1e-5, "diagonal length {}", d.length());
            assert_eq!(d.y, 0.0);
        }
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let (d, player) = step(held(|c| { c.forward = true; c.backward = true }), CameraMode::ThirdPerson, Vec3::NEG_Z);
        assert_eq!(d, Vec3::ZERO);
        assert_eq!(player.animation, AnimationState::Idle);
    }

    #[test]
    fn test_first_person_ignores_pitch() {
        // looking steeply down toward +X
        let camera_forward = Vec3::new(0.3, -0.95, 0.0).normalize();
        let (d, _) = step(held(|c| c.forward = true), CameraMode::FirstPerson, camera_forward);
        assert_eq!(d.y, 0.0);
        assert!(d.abs_diff_eq(Vec3::X * 2.0 * DT, 1e-5), "{d:?}");

        let (d, _) = step(held(|c| c.right = true), CameraMode::FirstPerson, camera_forward);
        assert!(d.abs_diff_eq(Vec3::Z * 2.0 * DT, 1e-5), "right of +X is +Z, got {d:?}");
    }

    #[test]
    fn test_first_person_straight_down_uses_yaw() {
        let basis = MotionIntegrator::movement_basis(CameraMode::FirstPerson, Vec3::NEG_Y, 0.0);
        assert!(basis.0.abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(basis.1.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_facing_only_in_third_person() {
        let (_, player) = step(held(|c| c.right = true), CameraMode::ThirdPerson, Vec3::NEG_Z);
        assert!((player.facing - std::f32::consts::FRAC_PI_2).abs() < 1e-6);

        let (_, player) = step(held(|c| c.right = true), CameraMode::FirstPerson, Vec3::NEG_Z);
        assert_eq!(player.facing, 0.0);
    }

    #[test]
    fn test_animation_table() {
        assert_eq!(AnimationState::from_motion(false, false), AnimationState::Idle);
        assert_eq!(AnimationState::from_motion(false, true), AnimationState::Idle);
        assert_eq!(AnimationState::from_motion(true, false), AnimationState::Walking);
        assert_eq!(AnimationState::from_motion(true, true), AnimationState::Running);
    }

    #[test]
    fn test_animation_follows_input_without_debounce() {
        let (motion, mut physics, mut player) = setup(Vec3::ZERO);
        let walking = held(|c| c.forward = true);
        let idle = ControlState::default();
        for i in 0..6 {
            let controls = if i % 2 == 0 { walking } else { idle };
            motion.integrate(&mut player, &mut physics, &input(controls, CameraMode::ThirdPerson, Vec3::NEG_Z));
            let expected = if i % 2 == 0 { AnimationState::Walking } else { AnimationState::Idle };
            assert_eq!(player.animation, expected);
        }
    }

    #[test]
    fn test_missing_body_is_noop() {
        let (motion, _, _) = setup(Vec3::ZERO);
        let mut empty = PhysicsWorld::new();
        let (_, _, mut orphan) = setup(Vec3::ZERO);
        let result = motion.integrate(&mut orphan, &mut empty, &input(held(|c| c.forward = true), CameraMode::ThirdPerson, Vec3::NEG_Z));
        assert!(result.is_none());
        assert_eq!(orphan.animation, AnimationState::Idle);
    }
}
