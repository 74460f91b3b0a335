use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::backend::{ClearColor, DrawCall, GpuBackend};
use crate::compile::CompiledStages;
use crate::error::ContextUnavailable;
use crate::geometry::{Viewport, QUAD_VERTEX_COUNT};
use crate::types::GpuPowerPreference;

use super::context::GpuContext;
use super::pipeline::{PipelineLayouts, ShaderProgram};
use super::uniforms::{write_resolved, SandboxUniforms};

/// Failure to produce one frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

impl FrameError {
    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            FrameError::Surface(err) => Some(err),
        }
    }
}

/// wgpu implementation of [`GpuBackend`]: owns the device, the quad vertex
/// buffer and the shared uniform buffer.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        viewport: &Viewport,
        gpu_power: GpuPowerPreference,
        vsync: bool,
    ) -> Result<Self, ContextUnavailable>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let size = PhysicalSize::new(viewport.width(), viewport.height());
        let context =
            GpuContext::new(target, size, gpu_power, vsync).map_err(ContextUnavailable::new)?;
        let layouts = PipelineLayouts::new(&context.device);

        let vertex_buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad vertex buffer"),
                contents: bytemuck::cast_slice(&viewport.quad()),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sandbox uniform buffer"),
            size: SandboxUniforms::size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sandbox uniform bind group"),
                layout: &layouts.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        tracing::debug!(
            width = viewport.width(),
            height = viewport.height(),
            format = ?context.surface_format,
            "GPU state ready"
        );

        Ok(Self {
            context,
            layouts,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Reconfigures the swapchain. The quad and the uniforms keep their
    /// startup dimensions.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }
}

impl GpuBackend for GpuState {
    type Program = ShaderProgram;
    type FrameError = FrameError;

    fn build_program(&mut self, stages: &CompiledStages) -> Result<ShaderProgram, String> {
        ShaderProgram::new(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            stages,
        )
    }

    fn render(
        &mut self,
        clear: ClearColor,
        draw: Option<DrawCall<'_, ShaderProgram>>,
    ) -> Result<(), FrameError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        if let Some(call) = &draw {
            write_resolved(
                &self.context.queue,
                &self.uniform_buffer,
                call.bindings,
                &call.uniforms,
            );
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("sandbox frame encoder"),
                });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sandbox render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r,
                            g: clear.g,
                            b: clear.b,
                            a: clear.a,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(call) = &draw {
                render_pass.set_pipeline(&call.program.pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
