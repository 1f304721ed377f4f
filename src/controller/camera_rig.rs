use std::f32::consts::FRAC_PI_2;

use glam::{EulerRot, Quat, Vec2, Vec3};

use crate::config::Tuning;
use crate::model::Camera;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    #[default]
    ThirdPerson,
    FirstPerson,
}

/// Request for the platform layer, issued on mode transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCapture {
    Acquire,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
}

impl CameraPose {
    pub fn forward(&self) -> Vec3 {
        (self.look_at - self.position).try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    fn lerp(self, target: CameraPose, t: f32) -> CameraPose {
        CameraPose {
            position: self.position.lerp(target.position, t),
            look_at: self.look_at.lerp(target.look_at, t),
        }
    }
}

/// First/third-person camera: mode, mouse look and the smoothed pose.
pub struct CameraRig {
    mode: CameraMode,
    yaw: f32,
    pitch: f32,
    pose: Option<CameraPose>,

    third_person_offset: Vec3,
    third_person_look_at_offset: Vec3,
    first_person_eye_offset: Vec3,
    look_distance: f32,
    sensitivity: f32,
    third_person_lerp: f32,
    first_person_lerp: f32,
}

impl CameraRig {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            mode: CameraMode::ThirdPerson,
            yaw: 0.0,
            pitch: 0.0,
            pose: None,
            third_person_offset: Vec3::from(tuning.third_person_offset),
            third_person_look_at_offset: Vec3::from(tuning.third_person_look_at_offset),
            first_person_eye_offset: Vec3::from(tuning.first_person_eye_offset),
            look_distance: tuning.look_distance,
            sensitivity: tuning.mouse_sensitivity,
            third_person_lerp: tuning.lerp_factor(false),
            first_person_lerp: tuning.lerp_factor(true),
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn is_first_person(&self) -> bool {
        self.mode == CameraMode::FirstPerson
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Current smoothed pose; `None` until a player position has been seen.
    pub fn pose(&self) -> Option<CameraPose> {
        self.pose
    }

    /// Flip the mode on a press. Returns the pointer-capture change the platform must apply.
    pub fn toggle(&mut self, pressed: bool) -> Option<PointerCapture> {
        if !pressed {
            return None;
        }
        let (mode, capture) = match self.mode {
            CameraMode::ThirdPerson => (CameraMode::FirstPerson, PointerCapture::Acquire),
            CameraMode::FirstPerson => (CameraMode::ThirdPerson, PointerCapture::Release),
        };
        self.mode = mode;
        tracing::info!(?mode, "camera mode changed");
        Some(capture)
    }

    /// Accumulate a pixel delta into yaw/pitch. Ignored in third-person.
    pub fn apply_look(&mut self, delta: Vec2) {
        if !self.is_first_person() {
            return;
        }
        self.yaw -= delta.x * self.sensitivity;
        self.pitch = (self.pitch - delta.y * self.sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// Unit look direction from yaw/pitch; `-Z` at rest.
    pub fn look_direction(&self) -> Vec3 {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0) * Vec3::NEG_Z
    }

    pub fn target_pose(&self, player: Vec3) -> CameraPose {
        match self.mode {
            CameraMode::ThirdPerson => CameraPose {
                position: player + self.third_person_offset,
                look_at: player + self.third_person_look_at_offset,
            },
            CameraMode::FirstPerson => {
                let eye = player + self.first_person_eye_offset;
                CameraPose { position: eye, look_at: eye + self.look_direction() * self.look_distance }
            }
        }
    }

    fn lerp_factor(&self) -> f32 {
        match self.mode {
            CameraMode::ThirdPerson => self.third_person_lerp,
            CameraMode::FirstPerson => self.first_person_lerp,
        }
    }

    /// Ease the pose toward its target. The first call snaps.
    /// Without a player position this is a no-op.
    pub fn update(&mut self, player: Option<Vec3>) -> Option<CameraPose> {
        let player = player?;
        let target = self.target_pose(player);
        let pose = match self.pose {
            Some(current) => current.lerp(target, self.lerp_factor()),
            None => target,
        };
        self.pose = Some(pose);
        Some(pose)
    }

    pub fn apply_to(&self, camera: &mut Camera) {
        if let Some(pose) = self.pose {
            camera.eye = pose.position;
            camera.target = pose.look_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> CameraRig {
        CameraRig::new(&Tuning::default())
    }

    #[test]
    fn test_starts_in_third_person() {
        let rig = rig();
        assert_eq!(rig.mode(), CameraMode::ThirdPerson);
        assert!(rig.pose().is_none());
    }

    #[test]
    fn test_toggle_requests_pointer_capture() {
        let mut rig = rig();
        assert_eq!(rig.toggle(false), None);
        assert_eq!(rig.toggle(true), Some(PointerCapture::Acquire));
        assert!(rig.is_first_person());
        assert_eq!(rig.toggle(true), Some(PointerCapture::Release));
        assert_eq!(rig.mode(), CameraMode::ThirdPerson);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut rig = rig();
        rig.toggle(true);
        for _ in 0..1000 {
            rig.apply_look(Vec2::new(0.0, -1.0e6));
            assert!(rig.pitch() <= FRAC_PI_2 && rig.pitch() >= -FRAC_PI_2);
        }
        assert_eq!(rig.pitch(), FRAC_PI_2);
        rig.apply_look(Vec2::new(0.0, f32::MAX));
        assert_eq!(rig.pitch(), -FRAC_PI_2);
        rig.apply_look(Vec2::new(0.0, 100.0));
        assert!(rig.pitch() >= -FRAC_PI_2);
    }

    #[test]
    fn test_look_ignored_in_third_person() {
        let mut rig = rig();
        rig.apply_look(Vec2::new(100.0, 100.0));
        assert_eq!(rig.yaw(), 0.0);
        assert_eq!(rig.pitch(), 0.0);
    }

    #[test]
    fn test_mouse_right_turns_right() {
        let mut rig = rig();
        rig.toggle(true);
        rig.apply_look(Vec2::new(100.0, 0.0));
        let dir = rig.look_direction();
        assert!(dir.x > 0.0, "turning right from -Z heads toward +X, got {dir:?}");
        assert!(dir.y.abs() < 1e-6);
    }

    #[test]
    fn test_third_person_target_pose() {
        let rig = rig();
        let pose = rig.target_pose(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.position, Vec3::new(8.0, 12.0, 13.0));
        assert_eq!(pose.look_at, Vec3::new(1.0, 4.0, 3.0));
    }

    #[test]
    fn test_first_person_target_pose() {
        let mut rig = rig();
        rig.toggle(true);
        let pose = rig.target_pose(Vec3::ZERO);
        assert_eq!(pose.position, Vec3::new(0.0, 1.5, 0.0));
        assert!(pose.look_at.abs_diff_eq(Vec3::new(0.0, 1.5, -10.0), 1e-5));
    }

    #[test]
    fn test_update_snaps_then_smooths() {
        let mut rig = rig();
        assert!(rig.update(None).is_none(), "no player, no pose");

        let first = rig.update(Some(Vec3::ZERO)).unwrap();
        assert_eq!(first, rig.target_pose(Vec3::ZERO));

        let moved = Vec3::new(10.0, 0.0, 0.0);
        let second = rig.update(Some(moved)).unwrap();
        let expected = first.position.lerp(rig.target_pose(moved).position, 0.05);
        assert!(second.position.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_first_person_converges_faster() {
        let player = Vec3::new(20.0, 0.0, 0.0);

        let mut third = rig();
        third.update(Some(Vec3::ZERO));
        let mut first = rig();
        first.update(Some(Vec3::ZERO));
        first.toggle(true);

        for _ in 0..5 {
            third.update(Some(player));
            first.update(Some(player));
        }
        let third_gap = third.pose().unwrap().position.distance(third.target_pose(player).position);
        let first_gap = first.pose().unwrap().position.distance(first.target_pose(player).position);
        assert!(first_gap < third_gap);
    }
}
