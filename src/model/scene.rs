use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use super::layout::{HouseLayout, LayoutError};

/// Stable handle for a scene node, assigned at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Returns `None` for boxes that cannot bound anything (inverted or non-finite).
    pub fn new(min: Vec3, max: Vec3) -> Option<Self> {
        if min.is_finite() && max.is_finite() && min.cmple(max).all() {
            Some(Self { min, max })
        } else {
            None
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self { min: center - half_extents, max: center + half_extents }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmplt(other.max).all() && other.min.cmplt(self.max).all()
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounding box of this box after an affine transform.
    pub fn transformed(&self, m: &Mat4) -> Aabb {
        let corners = self.corners().map(|c| m.transform_point3(c));
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min = min.min(*c);
            max = max.max(*c);
        }
        Aabb { min, max }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub translation: Vec3,
    /// Rotation about +Y, radians.
    pub yaw: f32,
    pub scale: f32,
    pub is_mesh: bool,
    /// Local-space box; `None` when the mesh has no usable geometry.
    pub geometry: Option<Aabb>,
    pub color: [f32; 4],
}

impl Node {
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.yaw),
            self.translation,
        )
    }
}

/// Flat scene graph: nodes are stored parent-before-child, indexed by id.
pub struct SceneGraph {
    nodes: Vec<Node>,
    by_name: HashMap<String, NodeId>,
}

pub const ROOT_NAME: &str = "House";

impl SceneGraph {
    /// Build the graph from a layout, hanging every top-level node below a root
    /// group placed at `origin`.
    pub fn from_layout(layout: &HouseLayout, origin: Vec3) -> Result<Self, LayoutError> {
        let mut graph = SceneGraph { nodes: Vec::with_capacity(layout.nodes.len() + 1), by_name: HashMap::new() };
        let root = graph.push(ROOT_NAME.to_string(), None, origin, 0.0, 1.0, false, None, [1.0; 4]);

        for entry in &layout.nodes {
            if graph.by_name.contains_key(&entry.name) {
                return Err(LayoutError::DuplicateName(entry.name.clone()));
            }
            let parent = match &entry.parent {
                Some(name) => graph.by_name.get(name).copied().ok_or_else(|| LayoutError::UnknownParent {
                    node: entry.name.clone(),
                    parent: name.clone(),
                })?,
                None => root,
            };
            let geometry = entry
                .geometry
                .and_then(|g| Aabb::new(Vec3::from(g.min), Vec3::from(g.max)));
            graph.push(
                entry.name.clone(),
                Some(parent),
                Vec3::from(entry.translation),
                entry.yaw,
                entry.scale,
                !entry.group,
                geometry,
                entry.color,
            );
        }

        tracing::info!(nodes = graph.nodes.len(), "scene graph built");
        Ok(graph)
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        name: String,
        parent: Option<NodeId>,
        translation: Vec3,
        yaw: f32,
        scale: f32,
        is_mesh: bool,
        geometry: Option<Aabb>,
        color: [f32; 4],
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.nodes.push(Node { id, name, parent, translation, yaw, scale, is_mesh, geometry, color });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.idx())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.idx())
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_mesh)
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        let mut cursor = self.node(id);
        while let Some(node) = cursor {
            m = node.local_matrix() * m;
            cursor = node.parent.and_then(|p| self.node(p));
        }
        m
    }

    /// World-space bounds of a mesh, or `None` if it has no geometry.
    pub fn world_aabb(&self, id: NodeId) -> Option<Aabb> {
        let geometry = self.node(id)?.geometry?;
        Some(geometry.transformed(&self.world_matrix(id)))
    }

    /// Union of every mesh's world bounds.
    pub fn bounds(&self) -> Option<Aabb> {
        self.meshes()
            .filter_map(|n| self.world_aabb(n.id))
            .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(src: &str) -> HouseLayout {
        HouseLayout::from_json(src).unwrap()
    }

    #[test]
    fn test_world_aabb_follows_parent_chain() {
        let graph = SceneGraph::from_layout(
            &layout(r#"{ "nodes": [
                { "name": "Frame", "group": true, "translation": [1.0, 0.0, 0.0], "scale": 0.5 },
                { "name": "Pane", "parent": "Frame", "box": { "min": [0.0, 0.0, 0.0], "max": [2.0, 2.0, 2.0] } }
            ] }"#),
            Vec3::new(10.0, 0.0, 0.0),
        )
        .unwrap();

        let pane = graph.find("Pane").unwrap();
        let aabb = graph.world_aabb(pane).unwrap();
        assert!(aabb.min.abs_diff_eq(Vec3::new(11.0, 0.0, 0.0), 1e-5), "min was {:?}", aabb.min);
        assert!(aabb.max.abs_diff_eq(Vec3::new(12.0, 1.0, 1.0), 1e-5), "max was {:?}", aabb.max);
    }

    #[test]
    fn test_rotation_swings_child_about_pivot() {
        let mut graph = SceneGraph::from_layout(
            &layout(r#"{ "nodes": [
                { "name": "Hinge", "group": true },
                { "name": "Leaf", "parent": "Hinge", "box": { "min": [0.0, 0.0, -0.05], "max": [1.0, 2.0, 0.05] } }
            ] }"#),
            Vec3::ZERO,
        )
        .unwrap();

        let hinge = graph.find("Hinge").unwrap();
        graph.node_mut(hinge).unwrap().yaw = std::f32::consts::FRAC_PI_2;
        let aabb = graph.world_aabb(graph.find("Leaf").unwrap()).unwrap();
        // +X swings to -Z under a quarter turn about +Y
        assert!((aabb.min.z + 1.0).abs() < 1e-5);
        assert!((aabb.size().x - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_geometry_is_dropped() {
        let graph = SceneGraph::from_layout(
            &layout(r#"{ "nodes": [
                { "name": "Broken", "box": { "min": [1.0, 0.0, 0.0], "max": [0.0, 1.0, 1.0] } },
                { "name": "Hollow" }
            ] }"#),
            Vec3::ZERO,
        )
        .unwrap();
        assert!(graph.world_aabb(graph.find("Broken").unwrap()).is_none());
        assert!(graph.world_aabb(graph.find("Hollow").unwrap()).is_none());
        assert!(graph.node(graph.find("Hollow").unwrap()).unwrap().is_mesh);
    }

    #[test]
    fn test_layout_errors() {
        let unknown = SceneGraph::from_layout(
            &layout(r#"{ "nodes": [ { "name": "A", "parent": "Missing" } ] }"#),
            Vec3::ZERO,
        );
        assert!(matches!(unknown, Err(LayoutError::UnknownParent { .. })));

        let dup = SceneGraph::from_layout(
            &layout(r#"{ "nodes": [ { "name": "A" }, { "name": "A" } ] }"#),
            Vec3::ZERO,
        );
        assert!(matches!(dup, Err(LayoutError::DuplicateName(_))));
    }

    #[test]
    fn test_default_house_loads() {
        let graph = SceneGraph::from_layout(&HouseLayout::default_house().unwrap(), Vec3::ZERO).unwrap();
        assert!(graph.find("Door_1").is_some());
        assert!(graph.bounds().is_some());
    }
}
