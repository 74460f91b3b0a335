use bytemuck::{Pod, Zeroable};

use crate::backend::FrameUniforms;
use crate::reflect::{UniformBindings, UniformName};

/// CPU mirror of the std140 `SandboxUniforms` block.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SandboxUniforms {
    pub projection: [[f32; 4]; 4],
    pub resolution: [f32; 2],
    pub mouse: [f32; 2],
    pub time: f32,
    pub _padding: [f32; 3],
}

unsafe impl Zeroable for SandboxUniforms {}
unsafe impl Pod for SandboxUniforms {}

impl SandboxUniforms {
    pub fn size() -> wgpu::BufferAddress {
        std::mem::size_of::<Self>() as wgpu::BufferAddress
    }

    pub fn from_frame(frame: &FrameUniforms) -> Self {
        Self {
            projection: frame.projection,
            resolution: frame.resolution,
            mouse: frame.mouse,
            time: frame.time,
            _padding: [0.0; 3],
        }
    }

    fn field_bytes(&self, name: UniformName) -> &[u8] {
        match name {
            UniformName::Projection => bytemuck::bytes_of(&self.projection),
            UniformName::Resolution => bytemuck::bytes_of(&self.resolution),
            UniformName::Mouse => bytemuck::bytes_of(&self.mouse),
            UniformName::Time => bytemuck::bytes_of(&self.time),
        }
    }
}

/// Byte ranges to upload for one frame: one per resolved uniform, at the
/// offset the program reflected for it.
pub(crate) fn resolved_writes<'a>(
    bindings: &UniformBindings,
    uniforms: &'a SandboxUniforms,
) -> Vec<(wgpu::BufferAddress, &'a [u8])> {
    bindings
        .resolved()
        .map(|(name, binding)| {
            let bytes = uniforms.field_bytes(name);
            let len = (binding.size as usize).min(bytes.len());
            (binding.offset as wgpu::BufferAddress, &bytes[..len])
        })
        .collect()
}

pub(crate) fn write_resolved(
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    bindings: &UniformBindings,
    frame: &FrameUniforms,
) {
    let uniforms = SandboxUniforms::from_frame(frame);
    for (offset, bytes) in resolved_writes(bindings, &uniforms) {
        queue.write_buffer(buffer, offset, bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::UniformBinding;

    fn frame() -> FrameUniforms {
        FrameUniforms {
            time: 3.0,
            mouse: [10.0, 20.0],
            resolution: [640.0, 480.0],
            projection: glam::Mat4::IDENTITY.to_cols_array_2d(),
        }
    }

    #[test]
    fn mirror_matches_std140_layout() {
        assert_eq!(SandboxUniforms::size(), 96);
        assert_eq!(std::mem::offset_of!(SandboxUniforms, resolution), 64);
        assert_eq!(std::mem::offset_of!(SandboxUniforms, mouse), 72);
        assert_eq!(std::mem::offset_of!(SandboxUniforms, time), 80);
    }

    #[test]
    fn only_resolved_bindings_are_written() {
        let mut bindings = UniformBindings::default();
        bindings.insert(UniformName::Time, UniformBinding { offset: 80, size: 4 });
        bindings.insert(UniformName::Mouse, UniformBinding { offset: 72, size: 8 });

        let uniforms = SandboxUniforms::from_frame(&frame());
        let writes = resolved_writes(&bindings, &uniforms);
        assert_eq!(writes.len(), 2);

        let (offset, bytes) = writes[0];
        assert_eq!(offset, 72);
        assert_eq!(bytemuck::cast_slice::<u8, f32>(bytes), &[10.0, 20.0]);

        let (offset, bytes) = writes[1];
        assert_eq!(offset, 80);
        assert_eq!(bytemuck::cast_slice::<u8, f32>(bytes), &[3.0]);
    }
}
