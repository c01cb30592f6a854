pub mod environment;
pub mod lights;
pub mod primitives;

pub use environment::{ContactShadowSettings, Environment, GridSettings};
pub use lights::{
    CommonLightParams, GizmoShape, LightGizmo, LightKind, LightNode, LightRig, LightShape,
    LightVariant, ShadowFlags,
};
pub use primitives::{floor_mesh, BoxParams};

use std::fmt;
use std::str::FromStr;

/// sRGB color as edited in the panel (`#rrggbb`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("color '{0}' is not of the form #rrggbb or #rgb")]
pub struct ColorParseError(String);

impl Rgb {
    pub const WHITE: Rgb = Rgb([0xff, 0xff, 0xff]);
    pub const RED: Rgb = Rgb([0xff, 0x00, 0x00]);

    pub const fn from_hex(value: u32) -> Self {
        Self([
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        ])
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }

    /// Linear-light components, which is what the shaders integrate over.
    pub fn to_linear(self) -> [f32; 3] {
        self.0.map(|channel| srgb_to_linear(channel as f32 / 255.0))
    }
}

fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let digits = text.trim().trim_start_matches('#');
        let malformed = || ColorParseError(text.to_string());
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        match digits.len() {
            6 => u32::from_str_radix(digits, 16)
                .map(Rgb::from_hex)
                .map_err(|_| malformed()),
            3 => {
                let expanded: String = digits.chars().flat_map(|ch| [ch, ch]).collect();
                u32::from_str_radix(&expanded, 16)
                    .map(Rgb::from_hex)
                    .map_err(|_| malformed())
            }
            _ => Err(malformed()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Inclusive bounds plus an optional slider step for one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub step: Option<f32>,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            step: None,
        }
    }

    pub const fn stepped(min: f32, max: f32, step: f32) -> Self {
        Self {
            min,
            max,
            step: Some(step),
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMaterial {
    pub color: Rgb,
    pub opacity: f32,
    pub transparent: bool,
    pub roughness: f32,
    pub metalness: f32,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            opacity: 1.0,
            transparent: false,
            roughness: 1.0,
            metalness: 0.0,
        }
    }
}

impl SurfaceMaterial {
    /// Opacity only takes effect on transparent materials; opaque ones always cover.
    pub fn effective_alpha(&self) -> f32 {
        if self.transparent {
            self.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    pub fn is_blended(&self) -> bool {
        self.transparent
    }
}

/// A box-shaped mesh: every solid in this viewer is a scaled unit cube.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: &'static str,
    pub size: [f32; 3],
    pub position: [f32; 3],
    pub material: SurfaceMaterial,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl MeshNode {
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let half = self.size.map(|extent| extent * 0.5);
        (
            [
                self.position[0] - half[0],
                self.position[1] - half[1],
                self.position[2] - half[2],
            ],
            [
                self.position[0] + half[0],
                self.position[1] + half[1],
                self.position[2] + half[2],
            ],
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HelperNode {
    Light(LightGizmo),
    BoundingBox {
        min: [f32; 3],
        max: [f32; 3],
        color: Rgb,
    },
    Axes {
        size: f32,
    },
}

/// Everything the renderer needs for one frame, rebuilt from UI state each redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGraph {
    pub meshes: Vec<MeshNode>,
    pub light: LightNode,
    pub helpers: Vec<HelperNode>,
    pub grid: GridSettings,
    pub contact_shadows: ContactShadowSettings,
}

pub fn compose_scene(
    lights: &LightRig,
    box_params: &BoxParams,
    environment: &Environment,
) -> SceneGraph {
    let box_mesh = box_params.mesh();
    let (min, max) = box_mesh.bounds();
    let mut helpers = vec![
        HelperNode::Axes {
            size: environment.axes_size,
        },
        HelperNode::BoundingBox {
            min,
            max,
            color: Rgb::RED,
        },
    ];
    if let Some(gizmo) = lights.gizmo() {
        helpers.push(HelperNode::Light(gizmo));
    }

    SceneGraph {
        meshes: vec![floor_mesh(), box_mesh],
        light: lights.node(),
        helpers,
        grid: environment.grid.clone(),
        contact_shadows: environment.contact_shadows.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!("#ff5151".parse::<Rgb>(), Ok(Rgb([0xff, 0x51, 0x51])));
        assert_eq!("6f6f6f".parse::<Rgb>(), Ok(Rgb([0x6f, 0x6f, 0x6f])));
        assert_eq!("#f0a".parse::<Rgb>(), Ok(Rgb([0xff, 0x00, 0xaa])));
        assert!("#ff51".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
        assert_eq!(Rgb([0xff, 0x51, 0x51]).to_hex(), "#ff5151");
    }

    #[test]
    fn linear_conversion_keeps_endpoints() {
        assert_eq!(Rgb([0, 0, 0]).to_linear(), [0.0, 0.0, 0.0]);
        let white = Rgb::WHITE.to_linear();
        assert!(white.iter().all(|value| (value - 1.0).abs() < 1e-6));
        let mid = Rgb([0x80, 0x80, 0x80]).to_linear()[0];
        assert!(mid > 0.2 && mid < 0.23);
    }

    #[test]
    fn opacity_only_applies_to_transparent_materials() {
        let mut material = SurfaceMaterial {
            opacity: 0.0,
            transparent: true,
            ..SurfaceMaterial::default()
        };
        assert_eq!(material.effective_alpha(), 0.0);
        material.transparent = false;
        assert_eq!(material.effective_alpha(), 1.0);
        material.opacity = 1.0;
        material.transparent = true;
        assert_eq!(material.effective_alpha(), 1.0);
    }

    #[test]
    fn every_kind_composes_exactly_its_own_light() {
        for kind in LightKind::ALL {
            let rig = LightRig::new(kind);
            let scene = compose_scene(&rig, &BoxParams::default(), &Environment::default());
            assert_eq!(scene.light.kind(), kind);
            let gizmos = scene
                .helpers
                .iter()
                .filter(|helper| matches!(helper, HelperNode::Light(_)))
                .count();
            assert_eq!(gizmos, usize::from(kind != LightKind::Ambient));
        }
    }

    #[test]
    fn intensity_edits_reach_the_composed_light() {
        for kind in LightKind::ALL {
            let mut rig = LightRig::new(kind);
            assert_eq!(rig.node().intensity, 6.0);
            rig.variant_mut().common_mut().intensity = 9.0;
            let scene = compose_scene(&rig, &BoxParams::default(), &Environment::default());
            assert_eq!(scene.light.intensity, 9.0);
        }
    }

    #[test]
    fn every_bound_field_reaches_the_composed_light() {
        let color = Rgb::from_hex(0x20c0ff);
        let position = [1.5, 4.0, -2.0];
        for kind in LightKind::ALL {
            let mut rig = LightRig::new(kind);
            let variant = rig.variant_mut();
            variant.common_mut().color = color;
            variant.common_mut().position = position;
            match variant {
                LightVariant::Ambient { .. } => {}
                LightVariant::Directional { shadows, .. } => shadows.cast_shadow = false,
                LightVariant::Point {
                    shadows, falloff, ..
                } => {
                    shadows.cast_shadow = false;
                    falloff.distance = 12.0;
                    falloff.decay = 1.0;
                }
                LightVariant::Spot { shadows, cone, .. } => {
                    shadows.cast_shadow = false;
                    cone.angle = 0.7;
                    cone.penumbra = 0.25;
                }
            }

            let scene = compose_scene(&rig, &BoxParams::default(), &Environment::default());
            let light = scene.light;
            assert_eq!(light.color, color, "{kind:?} color");
            assert_eq!(light.position, position, "{kind:?} position");
            assert!(!light.cast_shadow, "{kind:?} cast_shadow");
            let expected_shape = match kind {
                LightKind::Ambient => LightShape::Ambient,
                LightKind::Directional => LightShape::Directional,
                LightKind::Point => LightShape::Point {
                    distance: 12.0,
                    decay: 1.0,
                },
                LightKind::Spot => LightShape::Spot {
                    angle: 0.7,
                    penumbra: 0.25,
                    distance: 0.0,
                    decay: 2.0,
                },
            };
            assert_eq!(light.shape, expected_shape, "{kind:?} shape");

            let gizmo = scene.helpers.iter().find_map(|helper| match helper {
                HelperNode::Light(gizmo) => Some(*gizmo),
                _ => None,
            });
            match kind {
                LightKind::Ambient => assert!(gizmo.is_none()),
                _ => {
                    let gizmo = gizmo.expect("light gizmo");
                    assert_eq!(gizmo.position, position, "{kind:?} gizmo position");
                    if kind == LightKind::Spot {
                        assert_eq!(gizmo.shape, GizmoShape::Spot { angle: 0.7 });
                    }
                }
            }
        }
    }

    #[test]
    fn scene_has_floor_box_and_box_helper() {
        let scene = compose_scene(
            &LightRig::default(),
            &BoxParams::default(),
            &Environment::default(),
        );
        let names: Vec<_> = scene.meshes.iter().map(|mesh| mesh.name).collect();
        assert_eq!(names, ["floor", "box"]);
        assert!(scene.meshes.iter().all(|mesh| mesh.cast_shadow && mesh.receive_shadow));
        let bounding = scene
            .helpers
            .iter()
            .find_map(|helper| match helper {
                HelperNode::BoundingBox { min, max, .. } => Some((*min, *max)),
                _ => None,
            })
            .expect("box helper present");
        assert!((bounding.0[1] - 0.05).abs() < 1e-6);
        assert!((bounding.1[1] - 1.05).abs() < 1e-6);
    }
}
