use bytemuck::NoUninit;
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::model::{Aabb, SceneGraph};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
        wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
        wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Outward normal and the four corners (counter-clockwise seen from outside)
/// of each face of the unit cube `[0,1]^3`.
const CUBE_FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    ([1.0, 0.0, 0.0], [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0]]),
    ([-1.0, 0.0, 0.0], [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]]),
    ([0.0, 1.0, 0.0], [[0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]),
    ([0.0, -1.0, 0.0], [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]),
    ([0.0, 0.0, 1.0], [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]]),
    ([0.0, 0.0, -1.0], [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]),
];

impl Mesh {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    /// Append a box given in local space, placed by `transform`.
    pub fn push_box(&mut self, bounds: &Aabb, transform: &Mat4, color: [f32; 4]) {
        let size = bounds.size();
        for (normal, corners) in CUBE_FACES {
            let base = self.vertices.len() as u32;
            let normal = transform.transform_vector3(Vec3::from(normal)).normalize_or_zero();
            for corner in corners {
                let local = bounds.min + Vec3::from(corner) * size;
                self.vertices.push(Vertex {
                    pos: transform.transform_point3(local).to_array(),
                    normal: normal.to_array(),
                    color,
                });
            }
            self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }

    /// Every mesh node with geometry, in world space.
    pub fn from_scene(scene: &SceneGraph) -> Self {
        let mut mesh = Self::empty();
        for node in scene.meshes() {
            if let Some(geometry) = node.geometry {
                mesh.push_box(&geometry, &scene.world_matrix(node.id), node.color);
            }
        }
        mesh
    }

    /// Player stand-in in model space: a body with a small marker on its +Z side
    /// so the facing is visible. Feet at the origin.
    pub fn player(radius: f32, height: f32) -> Self {
        let mut mesh = Self::empty();
        let body = Aabb::from_center_half_extents(Vec3::new(0.0, height * 0.5, 0.0), Vec3::new(radius, height * 0.5, radius));
        mesh.push_box(&body, &Mat4::IDENTITY, [0.85, 0.45, 0.2, 1.0]);
        let marker = Aabb::from_center_half_extents(
            Vec3::new(0.0, height * 0.8, radius),
            Vec3::new(radius * 0.4, height * 0.06, radius * 0.25),
        );
        mesh.push_box(&marker, &Mat4::IDENTITY, [0.1, 0.1, 0.1, 1.0]);
        mesh
    }

    /// Horizontal square of side `size` at height `y`, facing up.
    pub fn ground_plane(size: f32, y: f32) -> Self {
        let h = size * 0.5;
        let normal = [0.0, 1.0, 0.0];
        let color = [1.0; 4];
        let vertices = [[-h, y, h], [h, y, h], [h, y, -h], [-h, y, -h]]
            .into_iter()
            .map(|pos| Vertex { pos, normal, color })
            .collect();
        Mesh { vertices, indices: vec![0, 1, 2, 0, 2, 3] }
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer { vertex_buffer, index_buffer, index_count: self.indices.len() as u32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HouseLayout;

    fn unit() -> Aabb {
        Aabb::new(Vec3::ZERO, Vec3::ONE).unwrap()
    }

    #[test]
    fn test_box_counts() {
        let mut mesh = Mesh::empty();
        assert!(mesh.is_empty());
        mesh.push_box(&unit(), &Mat4::IDENTITY, [1.0; 4]);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_faces_wind_counter_clockwise_outward() {
        let mut mesh = Mesh::empty();
        mesh.push_box(&unit(), &Mat4::IDENTITY, [1.0; 4]);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.vertices[i as usize].pos));
            let n = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!((b - a).cross(c - a).dot(n) > 0.0, "triangle {tri:?} winds against its normal");
        }
    }

    #[test]
    fn test_transform_rotates_normals() {
        let mut mesh = Mesh::empty();
        let transform = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        mesh.push_box(&unit(), &transform, [1.0; 4]);
        // +X face now points to -Z
        let n = Vec3::from(mesh.vertices[0].normal);
        assert!(n.abs_diff_eq(Vec3::NEG_Z, 1e-6), "{n:?}");
    }

    #[test]
    fn test_scene_mesh_covers_geometry_nodes() {
        let layout = HouseLayout::default_house().unwrap();
        let scene = SceneGraph::from_layout(&layout, Vec3::ZERO).unwrap();
        let boxes = scene.meshes().filter(|n| n.geometry.is_some()).count();
        let mesh = Mesh::from_scene(&scene);
        assert_eq!(mesh.vertices.len(), boxes * 24);
    }

    #[test]
    fn test_ground_plane_faces_up() {
        let plane = Mesh::ground_plane(150.0, -5.0);
        assert_eq!(plane.indices.len(), 6);
        assert!(plane.vertices.iter().all(|v| v.pos[1] == -5.0));
        let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(plane.vertices[i].pos));
        assert!((b - a).cross(c - a).y > 0.0);
    }
}
