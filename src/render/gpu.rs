//! Plain-old-data layouts shared with the WGSL shaders.
//!
//! Every struct here is `#[repr(C)]` and padded to 16-byte rows so it can be
//! copied into a uniform buffer with `bytemuck::bytes_of`.

use super::shadow::{ShadowProjection, DEPTH_BIAS, MAX_SHADOW_FACES, NORMAL_BIAS};
use crate::scene::{ContactShadowSettings, GridSettings, LightNode, LightShape, MeshNode};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

const LIGHT_AMBIENT: f32 = 0.0;
const LIGHT_DIRECTIONAL: f32 = 1.0;
const LIGHT_POINT: f32 = 2.0;
const LIGHT_SPOT: f32 = 3.0;

/// Smallest gap kept between the outer and inner spot cone cosines.
const MIN_PENUMBRA_GAP: f32 = 1e-4;

/// Contact-shadow blur offsets are expressed against a 256-texel reference.
const BLUR_REFERENCE_TEXELS: f32 = 256.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    /// xyz camera position, w tone-mapping exposure.
    pub camera_position: [f32; 4],
}

impl FrameUniform {
    pub fn new(view_proj: Mat4, camera_position: [f32; 3], exposure: f32) -> Self {
        let [x, y, z] = camera_position;
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_position: [x, y, z, exposure],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    /// Linear rgb, intensity.
    pub color_intensity: [f32; 4],
    /// Position, kind tag.
    pub position_kind: [f32; 4],
    /// Unit direction towards the target, cutoff distance.
    pub direction_distance: [f32; 4],
    /// Decay, outer cone cos, inner cone cos, casts shadow.
    pub params: [f32; 4],
    /// Face count, depth bias, texel size, normal bias.
    pub shadow_meta: [f32; 4],
    pub shadow_view_proj: [[[f32; 4]; 4]; MAX_SHADOW_FACES],
}

impl LightUniform {
    pub fn new(light: &LightNode, shadow: Option<&ShadowProjection>) -> Self {
        let [r, g, b] = light.color.to_linear();
        let direction = light.direction();
        let (kind, distance, decay, cone_cos, penumbra_cos) = match light.shape {
            LightShape::Ambient => (LIGHT_AMBIENT, 0.0, 0.0, 0.0, 0.0),
            LightShape::Directional => (LIGHT_DIRECTIONAL, 0.0, 0.0, 0.0, 0.0),
            LightShape::Point { distance, decay } => (LIGHT_POINT, distance, decay, 0.0, 0.0),
            LightShape::Spot {
                angle,
                penumbra,
                distance,
                decay,
            } => {
                let (cone_cos, penumbra_cos) = spot_cone_cosines(angle, penumbra);
                (LIGHT_SPOT, distance, decay, cone_cos, penumbra_cos)
            }
        };

        let mut shadow_view_proj = [[[0.0; 4]; 4]; MAX_SHADOW_FACES];
        let (face_count, texel_size) = match shadow {
            Some(projection) => {
                for (slot, matrix) in shadow_view_proj
                    .iter_mut()
                    .zip(projection.padded_faces())
                {
                    *slot = matrix.to_cols_array_2d();
                }
                (projection.faces().len() as f32, projection.texel_size)
            }
            None => (0.0, 0.0),
        };

        let [px, py, pz] = light.position;
        Self {
            color_intensity: [r, g, b, light.intensity],
            position_kind: [px, py, pz, kind],
            direction_distance: [direction.x, direction.y, direction.z, distance],
            params: [
                decay,
                cone_cos,
                penumbra_cos,
                if shadow.is_some() { 1.0 } else { 0.0 },
            ],
            shadow_meta: [face_count, DEPTH_BIAS, texel_size, NORMAL_BIAS],
            shadow_view_proj,
        }
    }
}

/// Outer and inner cone cosines for a spot light, never closer than
/// `MIN_PENUMBRA_GAP` so the smoothstep stays well defined.
pub fn spot_cone_cosines(angle: f32, penumbra: f32) -> (f32, f32) {
    let cone_cos = angle.cos();
    let mut penumbra_cos = (angle * (1.0 - penumbra)).cos();
    if penumbra_cos - cone_cos < MIN_PENUMBRA_GAP {
        penumbra_cos = cone_cos + MIN_PENUMBRA_GAP;
    }
    (cone_cos, penumbra_cos)
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// Linear rgb, effective alpha.
    pub color: [f32; 4],
    /// Roughness, metalness, receives shadow, unused.
    pub surface: [f32; 4],
}

impl MeshUniform {
    pub fn new(mesh: &MeshNode) -> Self {
        let model = Mat4::from_scale_rotation_translation(
            Vec3::from_array(mesh.size),
            glam::Quat::IDENTITY,
            Vec3::from_array(mesh.position),
        );
        let normal_matrix = model.inverse().transpose();
        let [r, g, b] = mesh.material.color.to_linear();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color: [r, g, b, mesh.material.effective_alpha()],
            surface: [
                mesh.material.roughness,
                mesh.material.metalness,
                if mesh.receive_shadow { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DepthPassUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl DepthPassUniform {
    pub fn new(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ContactUniform {
    pub capture_view_proj: [[f32; 4]; 4],
    /// Linear rgb, opacity.
    pub color_opacity: [f32; 4],
    /// Plane y, half extent, blur step in texels, unused.
    pub plane: [f32; 4],
}

impl ContactUniform {
    pub fn new(settings: &ContactShadowSettings, capture_view_proj: Mat4) -> Self {
        let [r, g, b] = settings.color.to_linear();
        let blur_step = settings.blur * settings.resolution as f32 / BLUR_REFERENCE_TEXELS;
        Self {
            capture_view_proj: capture_view_proj.to_cols_array_2d(),
            color_opacity: [r, g, b, settings.opacity],
            plane: [settings.elevation, settings.scale * 0.5, blur_step, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GridUniform {
    /// Linear rgb, cell size.
    pub cell: [f32; 4],
    /// Linear rgb, section size.
    pub section: [f32; 4],
    /// Cell thickness, section thickness, fade distance, fade strength.
    pub params: [f32; 4],
}

impl GridUniform {
    pub fn new(grid: &GridSettings) -> Self {
        let [cr, cg, cb] = grid.cell_color.to_linear();
        let [sr, sg, sb] = grid.section_color.to_linear();
        Self {
            cell: [cr, cg, cb, grid.cell_size],
            section: [sr, sg, sb, grid.section_size],
            params: [
                grid.cell_thickness,
                grid.section_thickness,
                grid.fade_distance,
                grid.fade_strength,
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    /// Linear rgb.
    pub color: [f32; 3],
}

impl LineVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Byte distance between consecutive dynamic-offset entries of `T`.
pub fn uniform_stride<T>(alignment: u32) -> u64 {
    let size = std::mem::size_of::<T>() as u64;
    let alignment = u64::from(alignment.max(1));
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{floor_mesh, BoxParams, LightKind, LightRig};
    use crate::render::shadow::shadow_projection;

    #[test]
    fn uniform_sizes_are_row_aligned() {
        for size in [
            std::mem::size_of::<FrameUniform>(),
            std::mem::size_of::<LightUniform>(),
            std::mem::size_of::<MeshUniform>(),
            std::mem::size_of::<DepthPassUniform>(),
            std::mem::size_of::<ContactUniform>(),
            std::mem::size_of::<GridUniform>(),
        ] {
            assert_eq!(size % 16, 0);
        }
        assert_eq!(std::mem::size_of::<LightUniform>(), 5 * 16 + 6 * 64);
    }

    #[test]
    fn stride_rounds_up_to_device_alignment() {
        assert_eq!(uniform_stride::<MeshUniform>(256), 256);
        assert_eq!(uniform_stride::<LightUniform>(256), 512);
        assert_eq!(uniform_stride::<DepthPassUniform>(64), 64);
    }

    #[test]
    fn spot_cone_keeps_a_gap_without_penumbra() {
        let (outer, inner) = spot_cone_cosines(0.3, 0.0);
        assert!(inner > outer);
        let (outer, inner) = spot_cone_cosines(0.3, 0.5);
        assert!((outer - 0.3f32.cos()).abs() < 1e-6);
        assert!((inner - 0.15f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn light_uniform_tags_kind_and_shadow() {
        let point = LightRig::new(LightKind::Point).node();
        let projection = shadow_projection(&point, 2048);
        let uniform = LightUniform::new(&point, projection.as_ref());
        assert_eq!(uniform.position_kind, [0.0, 3.0, 0.0, LIGHT_POINT]);
        assert_eq!(uniform.direction_distance[3], 5.0);
        assert_eq!(uniform.params[0], 2.0);
        assert_eq!(uniform.params[3], 1.0);
        assert_eq!(uniform.shadow_meta[0], 6.0);
        assert_eq!(uniform.color_intensity[3], 6.0);

        let ambient = LightRig::new(LightKind::Ambient).node();
        let uniform = LightUniform::new(&ambient, None);
        assert_eq!(uniform.position_kind[3], LIGHT_AMBIENT);
        assert_eq!(uniform.params[3], 0.0);
        assert_eq!(uniform.shadow_meta[0], 0.0);
    }

    #[test]
    fn mesh_uniform_carries_alpha_and_scale() {
        let floor = MeshUniform::new(&floor_mesh());
        assert_eq!(floor.model[0][0], 20.0);
        assert_eq!(floor.model[1][1], 0.1);
        assert_eq!(floor.color[3], 1.0);
        assert_eq!(floor.surface, [1.0, 0.0, 1.0, 0.0]);

        let clear_box = BoxParams {
            opacity: 0.0,
            transparent: true,
            ..BoxParams::default()
        };
        let uniform = MeshUniform::new(&clear_box.mesh());
        assert_eq!(uniform.color[3], 0.0);
        assert_eq!(uniform.model[3][1], 0.55);
    }
}
