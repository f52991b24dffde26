use bytemuck::{Pod, Zeroable};

/// GPU uniform buffer for 3D scene rendering.
/// Contains camera transform + per-draw-call parameters.
/// 112 bytes = 7 * 16, properly 16-byte aligned.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Plot3DUniforms {
    /// View-projection matrix (column-major).
    pub view_proj: [[f32; 4]; 4],
    /// Camera world position (w unused).
    pub camera_pos: [f32; 4],
    /// RGBA multiplier applied to every per-vertex color of the draw call.
    pub tint: [f32; 4],
    /// Viewport resolution in pixels.
    pub resolution: [f32; 2],
    /// Point radius in pixels.
    pub point_size: f32,
    /// Line width in pixels.
    pub line_width: f32,
}

/// GPU-ready 3D marker cloud.
#[derive(Debug, Clone)]
pub struct Scatter3DData {
    /// Positions as [x, y, z, _pad] (w unused, set to 1.0).
    pub positions: Vec<[f32; 4]>,
    /// One RGBA color per position.
    pub colors: Vec<[f32; 4]>,
    /// Applied on top of `colors`; carries the trace opacity.
    pub tint: [f32; 4],
    /// Point radius in pixels.
    pub point_size: f32,
}

/// GPU-ready 3D polyline.
#[derive(Debug, Clone)]
pub struct Line3DData {
    /// Segment endpoint pairs: [start, end, start, end, ...].
    /// Each position is [x, y, z, _pad].
    pub segments: Vec<[f32; 4]>,
    /// One RGBA color per endpoint, interpolated along the segment.
    pub colors: Vec<[f32; 4]>,
    pub tint: [f32; 4],
    /// Line width in pixels.
    pub line_width: f32,
}

impl Line3DData {
    /// Split an ordered point path into consecutive segments. Segments
    /// touching a point without a color (NaN feature) are dropped, which
    /// leaves a gap in the line.
    pub fn from_path(points: &[[f32; 4]], colors: &[Option<[f32; 4]>], line_width: f32) -> Self {
        let mut segments = Vec::with_capacity(points.len().saturating_sub(1) * 2);
        let mut seg_colors = Vec::with_capacity(segments.capacity());
        for i in 1..points.len().min(colors.len()) {
            if let (Some(c0), Some(c1)) = (colors[i - 1], colors[i]) {
                segments.push(points[i - 1]);
                segments.push(points[i]);
                seg_colors.push(c0);
                seg_colors.push(c1);
            }
        }
        Self { segments, colors: seg_colors, tint: [1.0; 4], line_width }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size_is_16_aligned() {
        assert_eq!(std::mem::size_of::<Plot3DUniforms>(), 112);
    }

    #[test]
    fn test_path_segments_skip_gaps() {
        let p = |x: f32| [x, 0.0, 0.0, 1.0];
        let c = Some([1.0, 0.0, 0.0, 1.0]);
        let line = Line3DData::from_path(&[p(0.0), p(1.0), p(2.0), p(3.0)], &[c, c, None, c], 2.0);
        // Only 0->1 survives; 1->2 and 2->3 touch the missing color.
        assert_eq!(line.segments, vec![p(0.0), p(1.0)]);
        assert_eq!(line.colors.len(), 2);
    }
}
