use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Number of vertices in the full-viewport quad (two triangles).
pub const QUAD_VERTEX_COUNT: u32 = 6;

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

/// Interleaved vertex: 3-float position followed by 3-float color.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    /// Attribute 0 is the position, attribute 1 the color, stride six floats.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Builds the two triangles covering `(0, 0)`-`(width, height)`.
///
/// The diagonal `(0, 0)`-`(width, height)` is shared by both triangles and its
/// endpoints carry the same color in each of them.
pub fn quad_vertices(width: f32, height: f32) -> [Vertex; 6] {
    [
        Vertex::new([0.0, 0.0, 0.0], RED),
        Vertex::new([width, 0.0, 0.0], GREEN),
        Vertex::new([width, height, 0.0], BLUE),
        Vertex::new([width, height, 0.0], BLUE),
        Vertex::new([0.0, height, 0.0], GREEN),
        Vertex::new([0.0, 0.0, 0.0], RED),
    ]
}

/// Orthographic projection of `[0,w]x[0,h]x[-1,1]` onto clip space.
pub fn orthographic_projection(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, width, 0.0, height, -1.0, 1.0)
}

/// Viewport dimensions captured once at startup.
///
/// Nothing here follows later window resizes: the quad, the projection and the
/// resolution uniform all keep the startup size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    projection: Mat4,
}

impl Viewport {
    /// Captures the startup size. Zero edges are clamped to one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            projection: orthographic_projection(width as f32, height as f32),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels, also the flip axis for pointer positions.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Value pushed to `uResolution`.
    pub fn resolution(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }

    /// Value pushed to `projection`.
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Quad covering the whole viewport.
    pub fn quad(&self) -> [Vertex; 6] {
        quad_vertices(self.width as f32, self.height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn quad_spans_the_viewport() {
        let quad = quad_vertices(800.0, 600.0);
        let xs: Vec<f32> = quad.iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = quad.iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::INFINITY, f32::min), 0.0);
        assert_eq!(xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max), 800.0);
        assert_eq!(ys.iter().cloned().fold(f32::INFINITY, f32::min), 0.0);
        assert_eq!(ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max), 600.0);
        assert!(quad.iter().all(|v| v.position[2] == 0.0));
    }

    #[test]
    fn shared_diagonal_vertices_match_colors() {
        let quad = quad_vertices(10.0, 20.0);
        assert_eq!(quad[0], quad[5]);
        assert_eq!(quad[2], quad[3]);
        assert_eq!(quad[0].color, RED);
        assert_eq!(quad[2].color, BLUE);
    }

    #[test]
    fn vertex_stride_is_six_floats() {
        assert_eq!(std::mem::size_of::<Vertex>(), 6 * 4);
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 24);
        assert_eq!(layout.attributes[0].shader_location, 0);
        assert_eq!(layout.attributes[1].shader_location, 1);
        assert_eq!(layout.attributes[1].offset, 12);
    }

    #[test]
    fn projection_maps_corners_to_clip_space() {
        let viewport = Viewport::new(1280, 720);
        let projection = viewport.projection();

        let bottom_left = projection.project_point3(Vec3::new(0.0, 0.0, 0.0));
        assert!((bottom_left.x + 1.0).abs() < 1e-6);
        assert!((bottom_left.y + 1.0).abs() < 1e-6);

        let top_right = projection.project_point3(Vec3::new(1280.0, 720.0, 0.0));
        assert!((top_right.x - 1.0).abs() < 1e-6);
        assert!((top_right.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn viewport_clamps_degenerate_sizes() {
        let viewport = Viewport::new(0, 0);
        assert_eq!(viewport.resolution(), [1.0, 1.0]);
    }
}
