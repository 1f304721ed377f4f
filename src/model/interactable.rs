use glam::Vec3;

use super::scene::{Aabb, NodeId};

/// Load-time classification of a scene mesh by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshKind {
    /// Static, solid.
    Wall,
    /// Swings about its parent's vertical axis.
    Door,
    /// Slides along X inside its parent.
    Window,
    /// Static, solid, never interactive.
    Furniture,
}

impl MeshKind {
    pub fn classify(name: &str) -> MeshKind {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("door") {
            MeshKind::Door
        } else if lower.starts_with("window") {
            MeshKind::Window
        } else if lower.contains("wall") && !lower.contains("door") {
            MeshKind::Wall
        } else {
            MeshKind::Furniture
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSide {
    Left,
    Right,
}

impl WindowSide {
    /// Side from a `left`/`right` tag in the name, if any.
    pub fn from_name(name: &str) -> Option<WindowSide> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("left") {
            Some(WindowSide::Left)
        } else if lower.contains("right") {
            Some(WindowSide::Right)
        } else {
            None
        }
    }

    /// Side relative to the structure's center along X.
    pub fn from_position(window_center: Vec3, structure_center: Vec3) -> WindowSide {
        if window_center.x < structure_center.x { WindowSide::Left } else { WindowSide::Right }
    }

    /// Sign of the slide applied when the window opens.
    pub fn open_direction(self) -> f32 {
        match self {
            WindowSide::Left => -1.0,
            WindowSide::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractableKind {
    Door,
    Window(WindowSide),
}

/// Stable identity of an interactable, assigned in classification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractableId(pub u32);

#[derive(Debug, Clone)]
pub struct Interactable {
    pub id: InteractableId,
    pub kind: InteractableKind,
    pub name: String,
    /// The mesh itself.
    pub mesh: NodeId,
    /// Node whose transform is changed on toggle: the door's parent group,
    /// or the window mesh.
    pub target: NodeId,
    pub open: bool,
    pub in_proximity: bool,
    /// World bounds at the last collider refresh.
    pub bounds: Aabb,
}
