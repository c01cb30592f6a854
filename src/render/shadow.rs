use crate::scene::{ContactShadowSettings, LightNode, LightShape};
use glam::{Mat4, Vec3};
use std::f32::consts::PI;

pub const MAX_SHADOW_FACES: usize = 6;
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 500.0;
const DIRECTIONAL_HALF_EXTENT: f32 = 5.0;
const MIN_SPOT_FOV: f32 = 0.02;

/// Constant offset subtracted from the receiver depth before comparison.
pub const DEPTH_BIAS: f32 = 0.0005;
/// World-space push along the receiver normal before projecting.
pub const NORMAL_BIAS: f32 = 0.02;

/// Point-light faces, in array-layer order.
const CUBE_FACES: [Vec3; MAX_SHADOW_FACES] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// Light-space matrices for every shadow layer the current light renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowProjection {
    faces: [Mat4; MAX_SHADOW_FACES],
    face_count: usize,
    pub texel_size: f32,
}

impl ShadowProjection {
    pub fn faces(&self) -> &[Mat4] {
        &self.faces[..self.face_count]
    }

    pub fn padded_faces(&self) -> &[Mat4; MAX_SHADOW_FACES] {
        &self.faces
    }
}

/// `None` when the light has no shadow to render.
pub fn shadow_projection(light: &LightNode, map_size: u32) -> Option<ShadowProjection> {
    if !light.cast_shadow {
        return None;
    }
    let position = Vec3::from_array(light.position);
    let mut faces = [Mat4::IDENTITY; MAX_SHADOW_FACES];
    let face_count = match light.shape {
        LightShape::Ambient => return None,
        LightShape::Directional => {
            let projection = Mat4::orthographic_rh(
                -DIRECTIONAL_HALF_EXTENT,
                DIRECTIONAL_HALF_EXTENT,
                -DIRECTIONAL_HALF_EXTENT,
                DIRECTIONAL_HALF_EXTENT,
                SHADOW_NEAR,
                SHADOW_FAR,
            );
            faces[0] = projection * look_along(position, light.direction());
            1
        }
        LightShape::Spot { angle, .. } => {
            let fov = (angle * 2.0).clamp(MIN_SPOT_FOV, PI - MIN_SPOT_FOV);
            let projection = Mat4::perspective_rh(fov, 1.0, SHADOW_NEAR, SHADOW_FAR);
            faces[0] = projection * look_along(position, light.direction());
            1
        }
        LightShape::Point { distance, .. } => {
            let far = if distance > SHADOW_NEAR { distance } else { SHADOW_FAR };
            let projection =
                Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, SHADOW_NEAR, far);
            for (face, direction) in faces.iter_mut().zip(CUBE_FACES) {
                *face = projection * look_along(position, direction);
            }
            MAX_SHADOW_FACES
        }
    };
    Some(ShadowProjection {
        faces,
        face_count,
        texel_size: 1.0 / map_size.max(1) as f32,
    })
}

/// Orthographic capture looking straight up from the contact plane.
pub fn contact_capture_view_proj(settings: &ContactShadowSettings) -> Mat4 {
    let half = settings.scale * 0.5;
    let eye = Vec3::new(0.0, settings.elevation, 0.0);
    let projection = Mat4::orthographic_rh(-half, half, -half, half, 0.0, settings.far);
    projection * Mat4::look_at_rh(eye, eye + Vec3::Y, Vec3::Z)
}

fn look_along(eye: Vec3, direction: Vec3) -> Mat4 {
    let up = if direction.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    Mat4::look_at_rh(eye, eye + direction, up)
}

/// Depth array sampled with a comparison sampler; one layer per shadow face.
pub struct ShadowMaps {
    _texture: wgpu::Texture,
    pub sample_view: wgpu::TextureView,
    pub face_views: Vec<wgpu::TextureView>,
    pub sampler: wgpu::Sampler,
    pub size: u32,
}

impl ShadowMaps {
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow maps"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: MAX_SHADOW_FACES as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let sample_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow maps (array)"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let face_views = (0..MAX_SHADOW_FACES as u32)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("shadow face"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow comparison sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        Self {
            _texture: texture,
            sample_view,
            face_views,
            sampler,
            size,
        }
    }
}

/// Upward depth capture read back by the contact-shadow plane.
pub struct ContactCapture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub resolution: u32,
}

impl ContactCapture {
    pub fn new(device: &wgpu::Device, resolution: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("contact shadow capture"),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
            resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::lights::ANGLE_RANGE;
    use crate::scene::{LightKind, LightRig, LightVariant};
    use glam::Vec4;

    fn project(matrix: &Mat4, point: Vec3) -> Vec3 {
        let clip = *matrix * Vec4::new(point.x, point.y, point.z, 1.0);
        clip.truncate() / clip.w
    }

    fn inside(ndc: Vec3) -> bool {
        ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && (0.0..=1.0).contains(&ndc.z)
    }

    #[test]
    fn ambient_and_disabled_lights_have_no_shadow() {
        let ambient = LightRig::new(LightKind::Ambient).node();
        assert!(shadow_projection(&ambient, 2048).is_none());

        let mut directional = LightRig::new(LightKind::Directional).node();
        directional.cast_shadow = false;
        assert!(shadow_projection(&directional, 2048).is_none());
    }

    #[test]
    fn directional_frustum_covers_the_box() {
        let light = LightRig::new(LightKind::Directional).node();
        let projection = shadow_projection(&light, 2048).expect("shadow");
        assert_eq!(projection.faces().len(), 1);
        assert_eq!(projection.texel_size, 1.0 / 2048.0);
        for corner in [Vec3::new(0.5, 1.05, 0.5), Vec3::new(-0.5, 0.05, -0.5)] {
            assert!(inside(project(&projection.faces()[0], corner)));
        }
    }

    #[test]
    fn spot_frustum_sees_its_target() {
        let light = LightRig::new(LightKind::Spot).node();
        let projection = shadow_projection(&light, 1024).expect("shadow");
        let ndc = project(&projection.faces()[0], Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(inside(ndc));
    }

    #[test]
    fn widest_spot_keeps_box_and_floor_apart() {
        let mut rig = LightRig::new(LightKind::Spot);
        if let LightVariant::Spot { cone, .. } = rig.variant_mut() {
            cone.angle = ANGLE_RANGE.max;
        }
        let light = rig.node();
        let projection = shadow_projection(&light, 2048).expect("shadow");
        let face = projection.faces()[0];
        assert!(face.is_finite());

        let texel = |point: Vec3| {
            let ndc = project(&face, point);
            assert!(inside(ndc), "{point} falls outside the spot frustum");
            ((ndc.x * 0.5 + 0.5) * 2048.0, (ndc.y * 0.5 + 0.5) * 2048.0)
        };
        let box_corner = texel(Vec3::new(0.5, 1.05, 0.5));
        let floor_point = texel(Vec3::new(8.0, 0.05, 8.0));
        assert!((box_corner.0 - floor_point.0).abs() >= 1.0);
        assert!((box_corner.1 - floor_point.1).abs() >= 1.0);
    }

    #[test]
    fn point_light_renders_six_faces_with_major_axis_layout() {
        let light = LightRig::new(LightKind::Point).node();
        let projection = shadow_projection(&light, 512).expect("shadow");
        assert_eq!(projection.faces().len(), MAX_SHADOW_FACES);
        let origin = Vec3::from_array(light.position);
        for (layer, axis) in CUBE_FACES.iter().enumerate() {
            let sample = origin + *axis * 2.0 + Vec3::new(0.1, 0.1, 0.1) * 0.5;
            assert!(
                inside(project(&projection.faces()[layer], sample)),
                "layer {layer} misses its axis"
            );
        }
    }

    #[test]
    fn contact_capture_maps_plane_into_view() {
        let settings = ContactShadowSettings::default();
        let matrix = contact_capture_view_proj(&settings);
        let above = project(&matrix, Vec3::new(4.0, settings.elevation + 1.0, -4.0));
        assert!(inside(above));
        let below = project(&matrix, Vec3::new(0.0, settings.elevation - 1.0, 0.0));
        assert!(below.z < 0.0);
    }
}
