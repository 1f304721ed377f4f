// VIEW: Rendering and graphics
pub mod gpu_init;
pub mod mesh;
pub mod render;

pub use gpu_init::{DeviceLost, GpuContext, GpuError};
pub use mesh::{Mesh, MeshBuffer, Vertex};
pub use render::{PlayerDraw, RenderState};
