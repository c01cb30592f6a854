mod camera;
mod egui_overlay;
mod gpu;
mod light_helpers;
mod mesh;
mod pipelines;
mod shadow;

pub use camera::CameraController;

use crate::app::EguiFrameOutput;
use crate::config::ViewerConfig;
use crate::scene::{ContactShadowSettings, MeshNode, SceneGraph};
use egui_overlay::EguiOverlay;
use gpu::{
    uniform_stride, ContactUniform, DepthPassUniform, FrameUniform, GridUniform, LightUniform,
    LineVertex, MeshUniform,
};
use pipelines::{Layouts, Pipelines, DEPTH_FORMAT};
use shadow::{ContactCapture, ShadowMaps, MAX_SHADOW_FACES};
use std::sync::Arc;
use std::time::Instant;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

const MAX_MESHES: usize = 8;
/// Shadow faces first, then the contact capture.
const DEPTH_PASS_SLOTS: usize = MAX_SHADOW_FACES + 1;
const CONTACT_SLOT: usize = MAX_SHADOW_FACES;
const INITIAL_LINE_CAPACITY: u64 = 256;
const EXPOSURE: f32 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreate(#[from] wgpu::CreateSurfaceError),
    #[error("no GPU adapter can present to this window")]
    AdapterUnavailable,
    #[error("failed to open GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("GPU ran out of memory")]
    OutOfMemory,
}

/// Owns every GPU object; the rest of the app only hands it a `SceneGraph`.
pub struct RenderContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    layouts: Layouts,
    pipelines: Pipelines,
    clear_color: wgpu::Color,

    frame_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    shadow_maps: ShadowMaps,

    mesh_buffer: wgpu::Buffer,
    mesh_bind_group: wgpu::BindGroup,
    mesh_stride: u64,
    cube_vertices: wgpu::Buffer,
    cube_indices: wgpu::Buffer,
    cube_index_count: u32,

    depth_pass_buffer: wgpu::Buffer,
    depth_pass_bind_group: wgpu::BindGroup,
    depth_pass_stride: u64,

    contact_capture: ContactCapture,
    contact_buffer: wgpu::Buffer,
    contact_bind_group: wgpu::BindGroup,

    grid_buffer: wgpu::Buffer,
    grid_bind_group: wgpu::BindGroup,

    line_buffer: wgpu::Buffer,
    line_capacity: u64,

    egui: EguiOverlay,
    warned_mesh_overflow: bool,
}

impl RenderContext {
    pub fn new(window: Arc<Window>, config: &ViewerConfig) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::AdapterUnavailable)?;
        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("lightbench device"),
                ..Default::default()
            },
            None,
        ))?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "Surface configured: {}x{} {:?}",
            surface_config.width,
            surface_config.height,
            format
        );
        let depth_view = create_depth_view(&device, &surface_config);

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, &layouts, format);
        let alignment = device.limits().min_uniform_buffer_offset_alignment;

        let frame_buffer = uniform_buffer::<FrameUniform>(&device, "frame uniform", 1);
        let light_buffer = uniform_buffer::<LightUniform>(&device, "light uniform", 1);
        let shadow_maps = ShadowMaps::new(&device, config.shadow_map_size);
        let frame_bind_group =
            create_frame_bind_group(&device, &layouts, &frame_buffer, &light_buffer, &shadow_maps);

        let mesh_stride = uniform_stride::<MeshUniform>(alignment);
        let mesh_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mesh uniforms"),
            size: mesh_stride * MAX_MESHES as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mesh_bind_group = dynamic_bind_group::<MeshUniform>(
            &device,
            "mesh bind group",
            &layouts.mesh,
            &mesh_buffer,
        );

        let (vertices, indices) = mesh::unit_cube();
        let cube_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let cube_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("cube indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let depth_pass_stride = uniform_stride::<DepthPassUniform>(alignment);
        let depth_pass_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("depth pass uniforms"),
            size: depth_pass_stride * DEPTH_PASS_SLOTS as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let depth_pass_bind_group = dynamic_bind_group::<DepthPassUniform>(
            &device,
            "depth pass bind group",
            &layouts.depth_pass,
            &depth_pass_buffer,
        );

        let contact_settings = &config.environment.contact_shadows;
        let contact_capture = ContactCapture::new(&device, contact_settings.resolution);
        let contact_buffer = uniform_buffer::<ContactUniform>(&device, "contact uniform", 1);
        let contact_bind_group =
            create_contact_bind_group(&device, &layouts, &contact_buffer, &contact_capture);

        let grid_buffer = uniform_buffer::<GridUniform>(&device, "grid uniform", 1);
        let grid_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grid bind group"),
            layout: &layouts.grid,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: grid_buffer.as_entire_binding(),
            }],
        });

        let line_buffer = create_line_buffer(&device, INITIAL_LINE_CAPACITY);
        let egui = EguiOverlay::new(&device, format);

        let [r, g, b] = config.clear_color.to_linear();
        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            depth_view,
            layouts,
            pipelines,
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            frame_buffer,
            light_buffer,
            frame_bind_group,
            shadow_maps,
            mesh_buffer,
            mesh_bind_group,
            mesh_stride,
            cube_vertices,
            cube_indices,
            cube_index_count: indices.len() as u32,
            depth_pass_buffer,
            depth_pass_bind_group,
            depth_pass_stride,
            contact_capture,
            contact_buffer,
            contact_bind_group,
            grid_buffer,
            grid_bind_group,
            line_buffer,
            line_capacity: INITIAL_LINE_CAPACITY,
            egui,
            warned_mesh_overflow: false,
        })
    }

    pub fn max_texture_side(&self) -> usize {
        self.device.limits().max_texture_dimension_2d as usize
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
        log::debug!("Surface resized to {}x{}", new_size.width, new_size.height);
    }

    /// Draws one frame and returns the CPU time spent recording it, in ms.
    pub fn render_frame(
        &mut self,
        scene: &SceneGraph,
        camera: &CameraController,
        ui: &EguiFrameOutput,
    ) -> Result<f32, RenderError> {
        let started = Instant::now();
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(0.0);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(err) => {
                log::warn!("Skipping frame: {err}");
                return Ok(0.0);
            }
        };
        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let meshes = self.visible_meshes(scene);
        let shadow_faces = self.upload_scene(scene, camera, meshes);
        let line_vertex_count = self.upload_lines(scene);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        for face in 0..shadow_faces {
            let mut pass = depth_only_pass(&mut encoder, "shadow pass", &self.shadow_maps.face_views[face]);
            pass.set_pipeline(&self.pipelines.shadow);
            pass.set_bind_group(0, &self.depth_pass_bind_group, &[self.depth_pass_offset(face)]);
            self.draw_meshes(&mut pass, meshes, |mesh| mesh.cast_shadow);
        }

        {
            let mut pass = depth_only_pass(&mut encoder, "contact capture pass", &self.contact_capture.view);
            pass.set_pipeline(&self.pipelines.contact_capture);
            pass.set_bind_group(
                0,
                &self.depth_pass_bind_group,
                &[self.depth_pass_offset(CONTACT_SLOT)],
            );
            self.draw_meshes(&mut pass, meshes, |mesh| mesh.cast_shadow);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &self.frame_bind_group, &[]);

            pass.set_pipeline(&self.pipelines.lit_opaque);
            self.draw_meshes(&mut pass, meshes, |mesh| !mesh.material.is_blended());

            pass.set_pipeline(&self.pipelines.grid);
            pass.set_bind_group(1, &self.grid_bind_group, &[]);
            pass.draw(0..6, 0..1);

            pass.set_pipeline(&self.pipelines.contact_plane);
            pass.set_bind_group(1, &self.contact_bind_group, &[]);
            pass.draw(0..6, 0..1);

            pass.set_pipeline(&self.pipelines.lit_blended);
            self.draw_meshes(&mut pass, meshes, |mesh| mesh.material.is_blended());

            if line_vertex_count > 0 {
                pass.set_pipeline(&self.pipelines.lines);
                pass.set_vertex_buffer(0, self.line_buffer.slice(..));
                pass.draw(0..line_vertex_count, 0..1);
            }
        }

        let egui_commands = self
            .egui
            .paint(&self.device, &self.queue, &mut encoder, &target, ui);
        self.queue
            .submit(egui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        self.egui.free_textures(ui);

        Ok(started.elapsed().as_secs_f32() * 1000.0)
    }

    fn visible_meshes<'a>(&mut self, scene: &'a SceneGraph) -> &'a [MeshNode] {
        let (drawn, skipped) = split_at_capacity(&scene.meshes);
        if !skipped.is_empty() && !self.warned_mesh_overflow {
            log::warn!(
                "Scene has {} meshes; only the first {} are drawn, skipping {}",
                scene.meshes.len(),
                MAX_MESHES,
                mesh_names(skipped)
            );
            self.warned_mesh_overflow = true;
        }
        drawn
    }

    /// Writes every uniform for the frame; returns how many shadow faces to render.
    fn upload_scene(
        &mut self,
        scene: &SceneGraph,
        camera: &CameraController,
        meshes: &[MeshNode],
    ) -> usize {
        let aspect = self.surface_config.width as f32 / self.surface_config.height.max(1) as f32;
        let frame = FrameUniform::new(camera.view_proj(aspect), camera.position(), EXPOSURE);
        self.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let projection = shadow::shadow_projection(&scene.light, self.shadow_maps.size);
        let light = LightUniform::new(&scene.light, projection.as_ref());
        self.queue
            .write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(&light));

        for (index, mesh) in meshes.iter().enumerate() {
            let uniform = MeshUniform::new(mesh);
            self.queue.write_buffer(
                &self.mesh_buffer,
                index as u64 * self.mesh_stride,
                bytemuck::bytes_of(&uniform),
            );
        }

        let shadow_faces = projection.as_ref().map_or(0, |projection| projection.faces().len());
        if let Some(projection) = &projection {
            for (slot, matrix) in projection.faces().iter().enumerate() {
                self.write_depth_pass(slot, DepthPassUniform::new(*matrix));
            }
        }
        self.sync_contact_capture(&scene.contact_shadows);
        let capture = shadow::contact_capture_view_proj(&scene.contact_shadows);
        self.write_depth_pass(CONTACT_SLOT, DepthPassUniform::new(capture));
        let contact = ContactUniform::new(&scene.contact_shadows, capture);
        self.queue
            .write_buffer(&self.contact_buffer, 0, bytemuck::bytes_of(&contact));

        let grid = GridUniform::new(&scene.grid);
        self.queue
            .write_buffer(&self.grid_buffer, 0, bytemuck::bytes_of(&grid));
        shadow_faces
    }

    /// Returns the number of line vertices uploaded.
    fn upload_lines(&mut self, scene: &SceneGraph) -> u32 {
        let vertices = light_helpers::helper_lines(&scene.helpers);
        let needed = vertices.len() as u64;
        if needed > self.line_capacity {
            self.line_capacity = needed.next_power_of_two();
            self.line_buffer = create_line_buffer(&self.device, self.line_capacity);
        }
        if !vertices.is_empty() {
            self.queue
                .write_buffer(&self.line_buffer, 0, bytemuck::cast_slice(&vertices));
        }
        vertices.len() as u32
    }

    /// Rebuilds the capture target when its configured resolution changes.
    fn sync_contact_capture(&mut self, settings: &ContactShadowSettings) {
        if self.contact_capture.resolution == settings.resolution {
            return;
        }
        self.contact_capture = ContactCapture::new(&self.device, settings.resolution);
        self.contact_bind_group = create_contact_bind_group(
            &self.device,
            &self.layouts,
            &self.contact_buffer,
            &self.contact_capture,
        );
    }

    fn write_depth_pass(&self, slot: usize, uniform: DepthPassUniform) {
        self.queue.write_buffer(
            &self.depth_pass_buffer,
            slot as u64 * self.depth_pass_stride,
            bytemuck::bytes_of(&uniform),
        );
    }

    fn depth_pass_offset(&self, slot: usize) -> u32 {
        (slot as u64 * self.depth_pass_stride) as u32
    }

    /// Issues one cube draw per mesh accepted by `include`; group 1 is the mesh uniform.
    fn draw_meshes(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        meshes: &[MeshNode],
        include: impl Fn(&MeshNode) -> bool,
    ) {
        pass.set_vertex_buffer(0, self.cube_vertices.slice(..));
        pass.set_index_buffer(self.cube_indices.slice(..), wgpu::IndexFormat::Uint16);
        for (index, mesh) in meshes.iter().enumerate() {
            if !include(mesh) {
                continue;
            }
            let offset = (index as u64 * self.mesh_stride) as u32;
            pass.set_bind_group(1, &self.mesh_bind_group, &[offset]);
            pass.draw_indexed(0..self.cube_index_count, 0, 0..1);
        }
    }
}

/// Meshes that fit the per-frame uniform slots, then the overflow.
fn split_at_capacity(meshes: &[MeshNode]) -> (&[MeshNode], &[MeshNode]) {
    meshes.split_at(meshes.len().min(MAX_MESHES))
}

fn mesh_names(meshes: &[MeshNode]) -> String {
    meshes
        .iter()
        .map(|mesh| mesh.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn depth_only_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

fn create_depth_view(
    device: &wgpu::Device,
    surface_config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scene depth"),
        size: wgpu::Extent3d {
            width: surface_config.width,
            height: surface_config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn uniform_buffer<T>(device: &wgpu::Device, label: &str, count: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64 * count,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_line_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("helper lines"),
        size: capacity * std::mem::size_of::<LineVertex>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Binds one `T`-sized window of `buffer`; the window moves via dynamic offsets.
fn dynamic_bind_group<T>(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
            }),
        }],
    })
}

fn create_frame_bind_group(
    device: &wgpu::Device,
    layouts: &Layouts,
    frame_buffer: &wgpu::Buffer,
    light_buffer: &wgpu::Buffer,
    shadow_maps: &ShadowMaps,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame bind group"),
        layout: &layouts.frame,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&shadow_maps.sample_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&shadow_maps.sampler),
            },
        ],
    })
}

fn create_contact_bind_group(
    device: &wgpu::Device,
    layouts: &Layouts,
    contact_buffer: &wgpu::Buffer,
    capture: &ContactCapture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("contact shadow bind group"),
        layout: &layouts.contact,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: contact_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&capture.view),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{floor_mesh, BoxParams};

    #[test]
    fn overflowing_meshes_are_named_in_draw_order() {
        let mut meshes = vec![floor_mesh(); MAX_MESHES];
        let mut extra = BoxParams::default().mesh();
        meshes.push(extra.clone());
        extra.name = "floor";
        meshes.push(extra);

        let (drawn, skipped) = split_at_capacity(&meshes);
        assert_eq!(drawn.len(), MAX_MESHES);
        assert_eq!(mesh_names(skipped), "box, floor");
    }

    #[test]
    fn default_scene_fits_without_overflow() {
        let meshes = [floor_mesh(), BoxParams::default().mesh()];
        let (drawn, skipped) = split_at_capacity(&meshes);
        assert_eq!(drawn.len(), 2);
        assert!(skipped.is_empty());
        assert_eq!(mesh_names(drawn), "floor, box");
    }
}
