use crate::app::EguiFrameOutput;

/// Paints egui's tessellated output over the finished scene.
pub struct EguiOverlay {
    renderer: egui_wgpu::Renderer,
}

impl EguiOverlay {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        Self {
            renderer: egui_wgpu::Renderer::new(device, color_format, None, 1, false),
        }
    }

    /// Uploads textures and buffers, then records a load-and-draw pass onto `target`.
    /// Returns the renderer's own command buffers, which must be submitted before `encoder`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        ui: &EguiFrameOutput,
    ) -> Vec<wgpu::CommandBuffer> {
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: ui.screen_size_px,
            pixels_per_point: ui.pixels_per_point,
        };
        for (id, delta) in &ui.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        let command_buffers =
            self.renderer
                .update_buffers(device, queue, encoder, &ui.clipped_primitives, &screen);

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer
                .render(&mut pass.forget_lifetime(), &ui.clipped_primitives, &screen);
        }

        command_buffers
    }

    /// Releases textures egui dropped this frame; call after submission.
    pub fn free_textures(&mut self, ui: &EguiFrameOutput) {
        for id in &ui.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}
