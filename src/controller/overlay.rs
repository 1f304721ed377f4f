use glam::Vec3;

use super::camera_rig::{CameraMode, CameraPose};
use super::interactables::InteractableRegistry;
use crate::config::Tuning;
use crate::model::InteractableId;

/// A prompt anchored at a world position, drawn facing the camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub anchor: Vec3,
    /// The interactable this prompt belongs to; `None` for the generic one.
    pub source: Option<InteractableId>,
}

/// What the UI should draw this frame. Rebuilt every tick, never stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    pub visible: bool,
    pub prompts: Vec<Prompt>,
}

pub struct OverlayPresenter {
    text: String,
    distance: f32,
    lift: f32,
}

impl OverlayPresenter {
    pub fn new(tuning: &Tuning) -> Self {
        Self { text: tuning.prompt_text.clone(), distance: tuning.overlay_distance, lift: tuning.prompt_lift }
    }

    /// Visible only in third-person while something is in range.
    pub fn is_visible(mode: CameraMode, any_in_proximity: bool) -> bool {
        mode == CameraMode::ThirdPerson && any_in_proximity
    }

    pub fn present(&self, mode: CameraMode, camera: Option<CameraPose>, registry: &InteractableRegistry) -> OverlayFrame {
        if !Self::is_visible(mode, registry.any_in_proximity()) {
            return OverlayFrame::default();
        }

        let mut prompts: Vec<Prompt> = registry
            .iter()
            .filter(|i| i.in_proximity)
            .map(|i| Prompt {
                text: self.text.clone(),
                anchor: i.bounds.center() + Vec3::new(0.0, i.bounds.size().y + self.lift, 0.0),
                source: Some(i.id),
            })
            .collect();

        if let Some(pose) = camera {
            prompts.push(Prompt {
                text: self.text.clone(),
                anchor: pose.position + pose.forward() * self.distance,
                source: None,
            });
        }

        OverlayFrame { visible: true, prompts }
    }
}
