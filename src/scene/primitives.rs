use super::{MeshNode, ParamRange, Rgb, SurfaceMaterial};

pub const OPACITY_RANGE: ParamRange = ParamRange::stepped(0.0, 1.0, 0.01);

const FLOOR_SIZE: [f32; 3] = [20.0, 0.1, 20.0];
const BOX_SIZE: [f32; 3] = [1.0, 1.0, 1.0];

/// User-tunable cube, edited from the "Box Control" group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxParams {
    pub position: [f32; 3],
    pub color: Rgb,
    pub opacity: f32,
    pub transparent: bool,
}

impl Default for BoxParams {
    fn default() -> Self {
        Self {
            position: [0.0, 0.55, 0.0],
            color: Rgb::from_hex(0xff0000),
            opacity: 1.0,
            transparent: false,
        }
    }
}

impl BoxParams {
    pub fn normalize(&mut self) {
        self.opacity = OPACITY_RANGE.clamp(self.opacity);
        for axis in &mut self.position {
            if !axis.is_finite() {
                *axis = 0.0;
            }
        }
    }

    pub fn mesh(&self) -> MeshNode {
        MeshNode {
            name: "box",
            size: BOX_SIZE,
            position: self.position,
            material: SurfaceMaterial {
                color: self.color,
                opacity: self.opacity,
                transparent: self.transparent,
                ..SurfaceMaterial::default()
            },
            cast_shadow: true,
            receive_shadow: true,
        }
    }
}

/// Thin white slab the cube rests on; its top face sits at y = 0.05.
pub fn floor_mesh() -> MeshNode {
    MeshNode {
        name: "floor",
        size: FLOOR_SIZE,
        position: [0.0, 0.0, 0.0],
        material: SurfaceMaterial::default(),
        cast_shadow: true,
        receive_shadow: true,
    }
}
