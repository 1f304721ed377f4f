use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;
use wgpu::*;

use super::mesh::{Mesh, MeshBuffer, Vertex};
use crate::model::{Camera, SceneGraph};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const GROUND_SIZE: f32 = 150.0;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    pub eye: [f32; 3],
    pub time: f32,
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera, time: f32) -> Self {
        let view_proj = camera.view_proj();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            eye: camera.eye.to_array(),
            time,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

impl LightingUniform {
    /// Pale moonlight from the same direction the sky draws the moon.
    pub fn moonlight() -> Self {
        Self { sun_dir: [0.45, 0.55, -0.7], sun_intensity: 0.55, ambient: 0.45, _pad1: 0.0, _pad2: 0.0, _pad3: 0.0 }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub transform: [[f32; 4]; 4],
}

// Shared graphics setup used by native and web
pub struct CameraResources {
    pub camera_buffer: Buffer,
    pub lighting_buffer: Buffer,
    pub bind_group_layout: BindGroupLayout,
    pub camera_bind_group: BindGroup,
}

/// A per-draw model transform bound at group 1.
pub struct ModelBinding {
    pub buffer: Buffer,
    pub bind_group: BindGroup,
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer { ty: BufferBindingType::Uniform, has_dynamic_offset: false, min_binding_size: None },
        count: None,
    }
}

pub fn create_camera_resources(device: &Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as u64,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some("lighting_buffer"),
        contents: bytemuck::bytes_of(&LightingUniform::moonlight()),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });

    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT),
            uniform_entry(1, ShaderStages::FRAGMENT),
        ],
    });

    let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

pub fn create_model_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("model_bind_group_layout"),
        entries: &[uniform_entry(0, ShaderStages::VERTEX)],
    })
}

pub fn create_model_binding(device: &Device, layout: &BindGroupLayout, label: &str) -> ModelBinding {
    let buffer = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(&TransformUniform { transform: Mat4::IDENTITY.to_cols_array_2d() }),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
    });
    ModelBinding { buffer, bind_group }
}

struct PipelineDesc<'a> {
    label: &'a str,
    source: &'a str,
    layouts: &'a [&'a BindGroupLayout],
    with_vertices: bool,
    blend: BlendState,
    cull_mode: Option<Face>,
    depth_write: bool,
    depth_compare: CompareFunction,
}

fn create_pipeline(device: &Device, format: TextureFormat, desc: PipelineDesc) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(desc.label),
        source: ShaderSource::Wgsl(desc.source.into()),
    });

    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: desc.layouts,
        push_constant_ranges: &[],
    });

    let vertex_layouts = if desc.with_vertices { vec![Vertex::layout()] } else { Vec::new() };
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState { format, blend: Some(desc.blend), write_mask: ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: desc.cull_mode,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: desc.depth_compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

pub struct Pipelines {
    pub scene: RenderPipeline,
    pub ground: RenderPipeline,
    pub sky: RenderPipeline,
}

pub fn create_pipelines(
    device: &Device,
    format: TextureFormat,
    camera_layout: &BindGroupLayout,
    model_layout: &BindGroupLayout,
) -> Pipelines {
    let scene = create_pipeline(device, format, PipelineDesc {
        label: "scene_pipeline",
        source: include_str!("shaders/scene.wgsl"),
        layouts: &[camera_layout, model_layout],
        with_vertices: true,
        blend: BlendState::ALPHA_BLENDING,
        cull_mode: Some(Face::Back),
        depth_write: true,
        depth_compare: CompareFunction::Less,
    });
    let ground = create_pipeline(device, format, PipelineDesc {
        label: "ground_pipeline",
        source: include_str!("shaders/ground.wgsl"),
        layouts: &[camera_layout],
        with_vertices: true,
        blend: BlendState::REPLACE,
        cull_mode: None,
        depth_write: true,
        depth_compare: CompareFunction::Less,
    });
    let sky = create_pipeline(device, format, PipelineDesc {
        label: "sky_pipeline",
        source: include_str!("shaders/sky.wgsl"),
        layouts: &[camera_layout],
        with_vertices: false,
        blend: BlendState::REPLACE,
        cull_mode: None,
        depth_write: false,
        depth_compare: CompareFunction::Always,
    });
    Pipelines { scene, ground, sky }
}

/// Where and whether to draw the player this frame.
#[derive(Debug, Clone, Copy)]
pub struct PlayerDraw {
    pub position: Vec3,
    pub facing: f32,
    pub visible: bool,
}

///////////////////////////////////////////////////////////////////////////////

/// Consolidated render state to avoid parameter explosion
pub struct RenderState {
    // wgpu resources
    pub format: TextureFormat,
    pub alpha_mode: CompositeAlphaMode,
    pub width: u32,
    pub height: u32,
    depth_view: TextureView,

    // Pipelines and bindings
    pipelines: Pipelines,
    camera: CameraResources,
    scene_model: ModelBinding,
    player_model: ModelBinding,

    // Meshes
    scene_mesh: Option<MeshBuffer>,
    player_mesh: MeshBuffer,
    ground_mesh: MeshBuffer,
    show_player: bool,

    // UI
    pub egui_renderer: egui_wgpu::Renderer,
    pub egui_primitives: Option<Vec<egui::ClippedPrimitive>>,
    pub egui_full_output: Option<egui::FullOutput>,
    pub egui_dpr: f32,
}

impl RenderState {
    pub fn new(
        device: &Device,
        format: TextureFormat,
        alpha_mode: CompositeAlphaMode,
        width: u32,
        height: u32,
        ground_y: f32,
        player_size: (f32, f32),
    ) -> Self {
        let camera = create_camera_resources(device);
        let model_layout = create_model_layout(device);
        let pipelines = create_pipelines(device, format, &camera.bind_group_layout, &model_layout);
        let (_, depth_view) = create_depth_texture(device, width, height);
        let (radius, height_m) = player_size;

        Self {
            format,
            alpha_mode,
            width,
            height,
            depth_view,
            pipelines,
            scene_model: create_model_binding(device, &model_layout, "scene_model"),
            player_model: create_model_binding(device, &model_layout, "player_model"),
            camera,
            scene_mesh: None,
            player_mesh: Mesh::player(radius, height_m).upload(device),
            ground_mesh: Mesh::ground_plane(GROUND_SIZE, ground_y).upload(device),
            show_player: false,
            egui_renderer: egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default()),
            egui_primitives: None,
            egui_full_output: None,
            egui_dpr: 1.0,
        }
    }

    fn surface_config(&self) -> SurfaceConfiguration {
        SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: self.width,
            height: self.height,
            present_mode: PresentMode::Fifo,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    /// Reconfigure the surface and depth buffer if the size changed.
    pub fn resize(&mut self, device: &Device, surface: &Surface, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width == self.width && height == self.height) {
            return false;
        }
        self.width = width;
        self.height = height;
        surface.configure(device, &self.surface_config());
        self.depth_view = create_depth_texture(device, width, height).1;
        true
    }

    /// Rebuild the static scene geometry, e.g. after a door or window moved.
    pub fn set_scene(&mut self, device: &Device, scene: &SceneGraph) {
        let mesh = Mesh::from_scene(scene);
        tracing::debug!(vertices = mesh.vertices.len(), "scene mesh rebuilt");
        self.scene_mesh = (!mesh.is_empty()).then(|| mesh.upload(device));
    }

    pub fn update_uniforms(&mut self, queue: &Queue, camera: &Camera, time: f32, player: Option<PlayerDraw>) {
        queue.write_buffer(&self.camera.camera_buffer, 0, bytemuck::bytes_of(&CameraUniform::from_camera(camera, time)));

        self.show_player = player.is_some_and(|p| p.visible);
        if let Some(p) = player {
            let transform = Mat4::from_rotation_translation(glam::Quat::from_rotation_y(p.facing), p.position);
            queue.write_buffer(
                &self.player_model.buffer,
                0,
                bytemuck::bytes_of(&TransformUniform { transform: transform.to_cols_array_2d() }),
            );
        }
    }

    pub fn set_ui(&mut self, primitives: Vec<egui::ClippedPrimitive>, full_output: egui::FullOutput, dpr: f32) {
        self.egui_primitives = Some(primitives);
        self.egui_full_output = Some(full_output);
        self.egui_dpr = dpr;
    }

    fn acquire(&self, device: &Device, surface: &Surface) -> Result<SurfaceTexture, SurfaceError> {
        match surface.get_current_texture() {
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                surface.configure(device, &self.surface_config());
                surface.get_current_texture()
            }
            other => other,
        }
    }

    pub fn draw_frame(&mut self, device: &Device, queue: &Queue, surface: &Surface) -> Result<(), SurfaceError> {
        let frame = self.acquire(device, surface)?;

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations { load: LoadOp::Clear(Color { r: 0.0, g: 0.02, b: 0.1, a: 1.0 }), store: StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations { load: LoadOp::Clear(1.0), store: StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_bind_group(0, &self.camera.camera_bind_group, &[]);

            rp.set_pipeline(&self.pipelines.sky);
            rp.draw(0..3, 0..1);

            rp.set_pipeline(&self.pipelines.ground);
            draw_mesh(&mut rp, &self.ground_mesh);

            rp.set_pipeline(&self.pipelines.scene);
            if let Some(scene_mesh) = &self.scene_mesh {
                rp.set_bind_group(1, &self.scene_model.bind_group, &[]);
                draw_mesh(&mut rp, scene_mesh);
            }
            if self.show_player {
                rp.set_bind_group(1, &self.player_model.bind_group, &[]);
                draw_mesh(&mut rp, &self.player_mesh);
            }
        }

        if let (Some(primitives), Some(full_output)) = (self.egui_primitives.take(), self.egui_full_output.take()) {
            self.draw_ui(device, queue, &mut encoder, &view, &primitives, &full_output);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn draw_ui(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        view: &TextureView,
        primitives: &[egui::ClippedPrimitive],
        full_output: &egui::FullOutput,
    ) {
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width, self.height],
            pixels_per_point: self.egui_dpr,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer.update_buffers(device, queue, encoder, primitives, &screen_descriptor);

        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations { load: LoadOp::Load, store: StoreOp::Store },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.egui_renderer.render(&mut egui_pass.forget_lifetime(), primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn draw_mesh(rp: &mut RenderPass, mesh: &MeshBuffer) {
    if mesh.index_count == 0 {
        return;
    }
    rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
    rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
    rp.draw_indexed(0..mesh.index_count, 0, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_match_shaders() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 32);
        assert_eq!(std::mem::size_of::<TransformUniform>(), 64);
    }

    #[test]
    fn test_camera_uniform_inverts() {
        let camera = Camera::new(800, 600);
        let u = CameraUniform::from_camera(&camera, 1.5);
        let vp = Mat4::from_cols_array_2d(&u.view_proj);
        let inv = Mat4::from_cols_array_2d(&u.inv_view_proj);
        assert!((vp * inv).abs_diff_eq(Mat4::IDENTITY, 1e-4));
        assert_eq!(u.time, 1.5);
    }
}
