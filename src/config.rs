use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid tuning file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
}

/// Sensor sizing for one open/closed state of an interactable.
///
/// Half extents are `size * 0.5 * scale + pad`, where `size` is the world
/// bounding box of the mesh in that state.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct HitboxSizing {
    pub scale: [f32; 3],
    pub pad: [f32; 3],
}

impl HitboxSizing {
    pub fn half_extents(&self, size: Vec3) -> Vec3 {
        size * 0.5 * Vec3::from(self.scale) + Vec3::from(self.pad)
    }
}

/// Every calibrated constant of the walkthrough.
///
/// The hitbox numbers are tuned against `assets/house.json`; a different
/// house needs them recalibrated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // Locomotion
    pub walk_speed: f32,
    pub run_speed: f32,

    // Camera
    pub mouse_sensitivity: f32,
    pub third_person_offset: [f32; 3],
    pub third_person_look_at_offset: [f32; 3],
    pub first_person_eye_offset: [f32; 3],
    pub look_distance: f32,
    pub third_person_lerp: f32,
    pub first_person_lerp: f32,

    // Interactables
    pub door_open_angle: f32,
    pub window_slide_distance: f32,
    pub door_closed_hitbox: HitboxSizing,
    pub door_open_hitbox: HitboxSizing,
    pub window_closed_hitbox: HitboxSizing,
    pub window_open_hitbox: HitboxSizing,

    // Player
    pub player_spawn: [f32; 3],
    pub capsule_half_height: f32,
    pub capsule_radius: f32,
    pub capsule_offset_y: f32,

    // Scene
    pub house_origin: [f32; 3],

    // Overlay
    pub prompt_text: String,
    pub overlay_distance: f32,
    pub prompt_lift: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            walk_speed: 2.0,
            run_speed: 4.0,

            mouse_sensitivity: 0.002,
            third_person_offset: [7.0, 10.0, 10.0],
            third_person_look_at_offset: [0.0, 2.0, 0.0],
            first_person_eye_offset: [0.0, 1.5, 0.0],
            look_distance: 10.0,
            third_person_lerp: 0.05,
            first_person_lerp: 0.1,

            door_open_angle: std::f32::consts::FRAC_PI_2,
            window_slide_distance: 70.0,
            door_closed_hitbox: HitboxSizing { scale: [1.2, 1.0, 1.0], pad: [0.0, 0.0, 1.0] },
            door_open_hitbox: HitboxSizing { scale: [1.0, 1.0, 1.2], pad: [1.2, 0.0, 0.2] },
            window_closed_hitbox: HitboxSizing { scale: [1.0, 1.0, 1.0], pad: [0.0, 0.5, 1.0] },
            window_open_hitbox: HitboxSizing { scale: [1.6, 1.0, 1.0], pad: [0.0, 0.5, 1.0] },

            player_spawn: [5.0, -4.95, 5.0],
            capsule_half_height: 0.8,
            capsule_radius: 0.4,
            capsule_offset_y: 1.0,

            house_origin: [12.0, -5.0, 12.0],

            prompt_text: "Press E to Open/Close".to_string(),
            overlay_distance: 1.5,
            prompt_lift: 0.5,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) tuning document; missing fields keep their defaults.
    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(src)?)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path)?;
        Self::from_json(&src)
    }

    /// Load overrides from `WALKTHROUGH_TUNING` if set, falling back to defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        match std::env::var("WALKTHROUGH_TUNING") {
            Ok(path) => match Self::from_file(std::path::Path::new(&path)) {
                Ok(tuning) => {
                    tracing::info!(path = %path, "loaded tuning overrides");
                    tuning
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "ignoring tuning file");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Feet to top of the capsule.
    pub fn player_height(&self) -> f32 {
        self.capsule_offset_y + self.capsule_half_height + self.capsule_radius
    }

    pub fn lerp_factor(&self, first_person: bool) -> f32 {
        if first_person { self.first_person_lerp } else { self.third_person_lerp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "walk_speed": 3.5, "window_slide_distance": 40.0 }"#).unwrap();
        assert_eq!(tuning.walk_speed, 3.5);
        assert_eq!(tuning.window_slide_distance, 40.0);
        assert_eq!(tuning.run_speed, 4.0, "untouched fields fall back to defaults");
        assert_eq!(tuning.prompt_text, "Press E to Open/Close");
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(Tuning::from_json("{ walk_speed: }"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_hitbox_sizing() {
        let sizing = HitboxSizing { scale: [2.0, 1.0, 1.0], pad: [0.0, 0.0, 0.5] };
        let half = sizing.half_extents(Vec3::new(1.0, 2.0, 0.2));
        assert!(half.abs_diff_eq(Vec3::new(1.0, 1.0, 0.6), 1e-6));
    }

    #[test]
    fn test_player_height_spans_capsule() {
        let tuning = Tuning::default();
        assert!((tuning.player_height() - 2.2).abs() < 1e-6);
    }
}
