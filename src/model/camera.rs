use glam::{Mat4, Vec2, Vec3};

/// Render camera: a position and the point it looks at.
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            eye: Vec3::new(15.0, 4.0, 15.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 50f32.to_radians(),
            aspect: width as f32 / height.max(1) as f32,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }

    /// Unit view direction; `-Z` if eye and target coincide.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * self.view()
    }

    /// Project a world point to screen pixels (origin top-left).
    /// `None` when the point is behind the camera or outside the depth range.
    pub fn project(&self, world: Vec3, width: f32, height: f32) -> Option<Vec2> {
        let clip = self.view_proj() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        Some(Vec2::new((ndc.x + 1.0) * 0.5 * width, (1.0 - ndc.y) * 0.5 * height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center_and_behind() {
        let mut cam = Camera::new(800, 600);
        cam.eye = Vec3::ZERO;
        cam.target = Vec3::NEG_Z;

        let center = cam.project(Vec3::new(0.0, 0.0, -5.0), 800.0, 600.0).unwrap();
        assert!(center.abs_diff_eq(Vec2::new(400.0, 300.0), 1e-3), "got {center:?}");

        let above = cam.project(Vec3::new(0.0, 1.0, -5.0), 800.0, 600.0).unwrap();
        assert!(above.y < 300.0, "points above the axis land in the upper half");

        assert!(cam.project(Vec3::new(0.0, 0.0, 5.0), 800.0, 600.0).is_none());
    }

    #[test]
    fn test_degenerate_forward() {
        let mut cam = Camera::new(1, 1);
        cam.target = cam.eye;
        assert_eq!(cam.forward(), Vec3::NEG_Z);
    }
}
