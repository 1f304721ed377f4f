use serde::Deserialize;
use thiserror::Error;

/// Default house shipped with the app.
pub const DEFAULT_HOUSE: &str = include_str!("../../assets/house.json");

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid layout: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("node `{node}` references unknown parent `{parent}` (parents must be listed first)")]
    UnknownParent { node: String, parent: String },
    #[error("duplicate node name `{0}`")]
    DuplicateName(String),
}

/// Axis-aligned box in the node's local space.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoxGeometry {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

/// One entry of the house description. Names drive classification, the same
/// way mesh names do in an exported model.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutNode {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default)]
    pub yaw: f32,
    #[serde(default = "unit_scale")]
    pub scale: f32,
    /// Group nodes only carry a transform; everything else is a mesh.
    #[serde(default)]
    pub group: bool,
    #[serde(default, rename = "box")]
    pub geometry: Option<BoxGeometry>,
    #[serde(default = "default_color")]
    pub color: [f32; 4],
}

fn unit_scale() -> f32 {
    1.0
}

fn default_color() -> [f32; 4] {
    [0.8, 0.8, 0.8, 1.0]
}

#[derive(Debug, Clone, Deserialize)]
pub struct HouseLayout {
    pub nodes: Vec<LayoutNode>,
}

impl HouseLayout {
    pub fn from_json(src: &str) -> Result<Self, LayoutError> {
        Ok(serde_json::from_str(src)?)
    }

    pub fn default_house() -> Result<Self, LayoutError> {
        Self::from_json(DEFAULT_HOUSE)
    }
}
