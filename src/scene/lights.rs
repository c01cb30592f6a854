use super::{ParamRange, Rgb};
use std::f32::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

pub const INTENSITY_RANGE: ParamRange = ParamRange::stepped(0.0, 10.0, 0.1);
pub const DISTANCE_RANGE: ParamRange = ParamRange::new(0.0, 20.0);
pub const DECAY_RANGE: ParamRange = ParamRange::new(0.0, 5.0);
pub const ANGLE_RANGE: ParamRange = ParamRange::new(0.0, FRAC_PI_2);
pub const PENUMBRA_RANGE: ParamRange = ParamRange::new(0.0, 1.0);

/// Lights aim at the world origin.
pub const LIGHT_TARGET: [f32; 3] = [0.0, 0.0, 0.0];

/// Spot lights have no cutoff distance and physical (inverse-square) decay.
const SPOT_DISTANCE: f32 = 0.0;
const SPOT_DECAY: f32 = 2.0;

const GIZMO_SIZE: f32 = 1.0;
const POINT_GIZMO_SIZE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightKind {
    Ambient,
    Directional,
    #[default]
    Point,
    Spot,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown light kind '{0}' (expected ambient, directional, point or spot)")]
pub struct UnknownLightKind(String);

impl LightKind {
    pub const ALL: [LightKind; 4] = [
        LightKind::Ambient,
        LightKind::Directional,
        LightKind::Point,
        LightKind::Spot,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LightKind::Ambient => "Ambient Light",
            LightKind::Directional => "Directional Light",
            LightKind::Point => "Point Light",
            LightKind::Spot => "Spot Light",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            LightKind::Ambient => "ambient",
            LightKind::Directional => "directional",
            LightKind::Point => "point",
            LightKind::Spot => "spot",
        }
    }
}

impl fmt::Display for LightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LightKind {
    type Err = UnknownLightKind;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let wanted = text.trim();
        LightKind::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLightKind(text.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommonLightParams {
    pub color: Rgb,
    pub intensity: f32,
    pub position: [f32; 3],
}

impl Default for CommonLightParams {
    fn default() -> Self {
        Self {
            color: Rgb::from_hex(0xff5151),
            intensity: 6.0,
            position: [0.0, 3.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowFlags {
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Default for ShadowFlags {
    fn default() -> Self {
        Self {
            cast_shadow: true,
            receive_shadow: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointFalloff {
    pub distance: f32,
    pub decay: f32,
}

impl Default for PointFalloff {
    fn default() -> Self {
        Self {
            distance: 5.0,
            decay: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotCone {
    pub angle: f32,
    pub penumbra: f32,
}

impl Default for SpotCone {
    fn default() -> Self {
        Self {
            angle: 0.3,
            penumbra: 0.5,
        }
    }
}

/// The one mounted light, with exactly the parameters its kind exposes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightVariant {
    Ambient {
        common: CommonLightParams,
    },
    Directional {
        common: CommonLightParams,
        shadows: ShadowFlags,
    },
    Point {
        common: CommonLightParams,
        shadows: ShadowFlags,
        falloff: PointFalloff,
    },
    Spot {
        common: CommonLightParams,
        shadows: ShadowFlags,
        cone: SpotCone,
    },
}

impl LightVariant {
    pub fn with_defaults(kind: LightKind) -> Self {
        let common = CommonLightParams::default();
        let shadows = ShadowFlags::default();
        match kind {
            LightKind::Ambient => LightVariant::Ambient { common },
            LightKind::Directional => LightVariant::Directional { common, shadows },
            LightKind::Point => LightVariant::Point {
                common,
                shadows,
                falloff: PointFalloff::default(),
            },
            LightKind::Spot => LightVariant::Spot {
                common,
                shadows,
                cone: SpotCone::default(),
            },
        }
    }

    pub fn kind(&self) -> LightKind {
        match self {
            LightVariant::Ambient { .. } => LightKind::Ambient,
            LightVariant::Directional { .. } => LightKind::Directional,
            LightVariant::Point { .. } => LightKind::Point,
            LightVariant::Spot { .. } => LightKind::Spot,
        }
    }

    pub fn common(&self) -> &CommonLightParams {
        match self {
            LightVariant::Ambient { common }
            | LightVariant::Directional { common, .. }
            | LightVariant::Point { common, .. }
            | LightVariant::Spot { common, .. } => common,
        }
    }

    pub fn common_mut(&mut self) -> &mut CommonLightParams {
        match self {
            LightVariant::Ambient { common }
            | LightVariant::Directional { common, .. }
            | LightVariant::Point { common, .. }
            | LightVariant::Spot { common, .. } => common,
        }
    }

    pub fn shadows(&self) -> Option<&ShadowFlags> {
        match self {
            LightVariant::Ambient { .. } => None,
            LightVariant::Directional { shadows, .. }
            | LightVariant::Point { shadows, .. }
            | LightVariant::Spot { shadows, .. } => Some(shadows),
        }
    }

    /// Clamps every field back into its panel range.
    pub fn normalize(&mut self) {
        let common = self.common_mut();
        common.intensity = INTENSITY_RANGE.clamp(common.intensity);
        for axis in &mut common.position {
            if !axis.is_finite() {
                *axis = 0.0;
            }
        }
        match self {
            LightVariant::Point { falloff, .. } => {
                falloff.distance = DISTANCE_RANGE.clamp(falloff.distance);
                falloff.decay = DECAY_RANGE.clamp(falloff.decay);
            }
            LightVariant::Spot { cone, .. } => {
                cone.angle = ANGLE_RANGE.clamp(cone.angle);
                cone.penumbra = PENUMBRA_RANGE.clamp(cone.penumbra);
            }
            LightVariant::Ambient { .. } | LightVariant::Directional { .. } => {}
        }
    }

    pub fn node(&self) -> LightNode {
        let common = *self.common();
        // Receiving is decided per mesh; the light only contributes its cast flag.
        let cast_shadow = self.shadows().is_some_and(|shadows| shadows.cast_shadow);
        let shape = match self {
            LightVariant::Ambient { .. } => LightShape::Ambient,
            LightVariant::Directional { .. } => LightShape::Directional,
            LightVariant::Point { falloff, .. } => LightShape::Point {
                distance: falloff.distance,
                decay: falloff.decay,
            },
            LightVariant::Spot { cone, .. } => LightShape::Spot {
                angle: cone.angle,
                penumbra: cone.penumbra,
                distance: SPOT_DISTANCE,
                decay: SPOT_DECAY,
            },
        };
        LightNode {
            color: common.color,
            intensity: common.intensity,
            position: common.position,
            target: LIGHT_TARGET,
            cast_shadow,
            shape,
        }
    }

    pub fn gizmo(&self) -> Option<LightGizmo> {
        let (shape, size) = match self {
            LightVariant::Ambient { .. } => return None,
            LightVariant::Directional { .. } => (GizmoShape::Directional, GIZMO_SIZE),
            LightVariant::Point { .. } => (GizmoShape::Point, POINT_GIZMO_SIZE),
            LightVariant::Spot { cone, .. } => (GizmoShape::Spot { angle: cone.angle }, GIZMO_SIZE),
        };
        Some(LightGizmo {
            shape,
            position: self.common().position,
            target: LIGHT_TARGET,
            size,
            color: Rgb::RED,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightShape {
    Ambient,
    Directional,
    Point {
        distance: f32,
        decay: f32,
    },
    Spot {
        angle: f32,
        penumbra: f32,
        distance: f32,
        decay: f32,
    },
}

/// Resolved light attributes handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightNode {
    pub color: Rgb,
    pub intensity: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub cast_shadow: bool,
    pub shape: LightShape,
}

impl LightNode {
    pub fn kind(&self) -> LightKind {
        match self.shape {
            LightShape::Ambient => LightKind::Ambient,
            LightShape::Directional => LightKind::Directional,
            LightShape::Point { .. } => LightKind::Point,
            LightShape::Spot { .. } => LightKind::Spot,
        }
    }

    /// Unit vector from the light towards its target; straight down when they coincide.
    pub fn direction(&self) -> glam::Vec3 {
        let delta = glam::Vec3::from_array(self.target) - glam::Vec3::from_array(self.position);
        if delta.length_squared() <= 1e-10 {
            glam::Vec3::NEG_Y
        } else {
            delta.normalize()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GizmoShape {
    Directional,
    Point,
    Spot { angle: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightGizmo {
    pub shape: GizmoShape,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub size: f32,
    pub color: Rgb,
}

/// Owns the mounted light variant. Remounting a different kind starts it from
/// its defaults; nothing carries over between kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightRig {
    active: LightVariant,
}

impl Default for LightVariant {
    fn default() -> Self {
        LightVariant::with_defaults(LightKind::default())
    }
}

impl LightRig {
    pub fn new(kind: LightKind) -> Self {
        Self {
            active: LightVariant::with_defaults(kind),
        }
    }

    /// Mounts `kind`, returning true when that replaced a different variant.
    pub fn mount(&mut self, kind: LightKind) -> bool {
        if self.active.kind() == kind {
            return false;
        }
        log::debug!("Light switched {} -> {}", self.active.kind().key(), kind.key());
        self.active = LightVariant::with_defaults(kind);
        true
    }

    pub fn kind(&self) -> LightKind {
        self.active.kind()
    }

    pub fn variant(&self) -> &LightVariant {
        &self.active
    }

    pub fn variant_mut(&mut self) -> &mut LightVariant {
        &mut self.active
    }

    pub fn node(&self) -> LightNode {
        self.active.node()
    }

    pub fn gizmo(&self) -> Option<LightGizmo> {
        self.active.gizmo()
    }
}
