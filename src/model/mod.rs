// MODEL: Scene description and data
pub mod camera;
pub mod interactable;
pub mod layout;
pub mod scene;

pub use camera::Camera;
pub use interactable::{Interactable, InteractableId, InteractableKind, MeshKind, WindowSide};
pub use layout::{HouseLayout, LayoutError};
pub use scene::{Aabb, Node, NodeId, SceneGraph};
