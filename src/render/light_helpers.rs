//! Debug line geometry for light gizmos, the box outline and the axes.
//!
//! Everything is rebuilt on the CPU each frame as a single line list.

use super::gpu::LineVertex;
use crate::scene::{GizmoShape, HelperNode, LightGizmo, Rgb};
use glam::Vec3;
use std::f32::consts::{FRAC_PI_2, TAU};

const SPOT_CIRCLE_SEGMENTS: usize = 32;
/// Keeps `tan` finite when the cone is opened to a right angle.
const MAX_CONE_ANGLE: f32 = FRAC_PI_2 - 1e-3;

/// Flattens every helper into one line-list vertex stream.
pub fn helper_lines(helpers: &[HelperNode]) -> Vec<LineVertex> {
    let mut lines = LineBatch::default();
    for helper in helpers {
        match helper {
            HelperNode::Light(gizmo) => match gizmo.shape {
                GizmoShape::Directional => directional_lines(&mut lines, gizmo),
                GizmoShape::Point => point_lines(&mut lines, gizmo),
                GizmoShape::Spot { angle } => spot_lines(&mut lines, gizmo, angle),
            },
            HelperNode::BoundingBox { min, max, color } => {
                box_lines(&mut lines, Vec3::from_array(*min), Vec3::from_array(*max), *color)
            }
            HelperNode::Axes { size } => axes_lines(&mut lines, *size),
        }
    }
    lines.vertices
}

#[derive(Default)]
struct LineBatch {
    vertices: Vec<LineVertex>,
}

impl LineBatch {
    fn segment(&mut self, a: Vec3, b: Vec3, color: [f32; 3]) {
        self.gradient(a, color, b, color);
    }

    fn gradient(&mut self, a: Vec3, color_a: [f32; 3], b: Vec3, color_b: [f32; 3]) {
        self.vertices.push(LineVertex {
            position: a.to_array(),
            color: color_a,
        });
        self.vertices.push(LineVertex {
            position: b.to_array(),
            color: color_b,
        });
    }
}

/// Direction from gizmo to target plus two axes spanning the plane facing it.
fn gizmo_frame(gizmo: &LightGizmo) -> (Vec3, Vec3, Vec3) {
    let delta = Vec3::from_array(gizmo.target) - Vec3::from_array(gizmo.position);
    let forward = if delta.length_squared() > 1e-10 {
        delta.normalize()
    } else {
        Vec3::NEG_Y
    };
    let hint = if forward.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let right = hint.cross(forward).normalize();
    let up = forward.cross(right);
    (forward, right, up)
}

/// Square of half-width `size` facing the target, plus a line to the target.
fn directional_lines(lines: &mut LineBatch, gizmo: &LightGizmo) {
    let color = gizmo.color.to_linear();
    let origin = Vec3::from_array(gizmo.position);
    let (_, right, up) = gizmo_frame(gizmo);
    let corners = [(-1.0, 1.0), (1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)]
        .map(|(x, y)| origin + (right * x + up * y) * gizmo.size);
    for index in 0..corners.len() {
        lines.segment(corners[index], corners[(index + 1) % corners.len()], color);
    }
    lines.segment(origin, Vec3::from_array(gizmo.target), color);
}

/// Wire octahedron of radius `size`: four equator edges and eight to the poles.
fn point_lines(lines: &mut LineBatch, gizmo: &LightGizmo) {
    let color = gizmo.color.to_linear();
    let center = Vec3::from_array(gizmo.position);
    let radius = gizmo.size;
    let equator = [Vec3::X, Vec3::Z, Vec3::NEG_X, Vec3::NEG_Z].map(|axis| center + axis * radius);
    let poles = [center + Vec3::Y * radius, center - Vec3::Y * radius];
    for index in 0..equator.len() {
        lines.segment(equator[index], equator[(index + 1) % equator.len()], color);
        for pole in poles {
            lines.segment(pole, equator[index], color);
        }
    }
}

/// Cone reaching `size` times the distance to the target, opened to the spot angle.
fn spot_lines(lines: &mut LineBatch, gizmo: &LightGizmo, angle: f32) {
    let color = gizmo.color.to_linear();
    let apex = Vec3::from_array(gizmo.position);
    let (forward, right, up) = gizmo_frame(gizmo);
    let reach = Vec3::from_array(gizmo.target).distance(apex);
    let length = (if reach > 1e-5 { reach } else { 1.0 }) * gizmo.size;
    let width = length * angle.min(MAX_CONE_ANGLE).tan();
    let base = apex + forward * length;

    lines.segment(apex, base, color);
    for offset in [right, -right, up, -up] {
        lines.segment(apex, base + offset * width, color);
    }
    let rim = |step: usize| {
        let theta = step as f32 / SPOT_CIRCLE_SEGMENTS as f32 * TAU;
        base + (right * theta.cos() + up * theta.sin()) * width
    };
    for step in 0..SPOT_CIRCLE_SEGMENTS {
        lines.segment(rim(step), rim(step + 1), color);
    }
}

/// The twelve edges of an axis-aligned box.
fn box_lines(lines: &mut LineBatch, min: Vec3, max: Vec3, color: Rgb) {
    let color = color.to_linear();
    let corner = |index: usize| {
        Vec3::new(
            if index & 1 == 0 { min.x } else { max.x },
            if index & 2 == 0 { min.y } else { max.y },
            if index & 4 == 0 { min.z } else { max.z },
        )
    };
    for index in 0..8 {
        for bit in [1, 2, 4] {
            if index & bit == 0 {
                lines.segment(corner(index), corner(index | bit), color);
            }
        }
    }
}

/// X red, Y green, Z blue, each fading towards a lighter tint at the tip.
fn axes_lines(lines: &mut LineBatch, size: f32) {
    let axes = [
        (Vec3::X, [1.0, 0.0, 0.0], [1.0, 0.6, 0.0]),
        (Vec3::Y, [0.0, 1.0, 0.0], [0.6, 1.0, 0.0]),
        (Vec3::Z, [0.0, 0.0, 1.0], [0.0, 0.6, 1.0]),
    ];
    for (axis, base, tip) in axes {
        lines.gradient(Vec3::ZERO, base, axis * size, tip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::lights::ANGLE_RANGE;
    use crate::scene::{LightKind, LightRig, LightVariant};

    fn gizmo(kind: LightKind) -> LightGizmo {
        LightRig::new(kind).gizmo().expect("gizmo")
    }

    #[test]
    fn segment_counts_per_helper() {
        let count = |helper: HelperNode| helper_lines(&[helper]).len() / 2;
        assert_eq!(count(HelperNode::Light(gizmo(LightKind::Directional))), 5);
        assert_eq!(count(HelperNode::Light(gizmo(LightKind::Point))), 12);
        assert_eq!(
            count(HelperNode::Light(gizmo(LightKind::Spot))),
            5 + SPOT_CIRCLE_SEGMENTS
        );
        assert_eq!(
            count(HelperNode::BoundingBox {
                min: [0.0; 3],
                max: [1.0; 3],
                color: Rgb::RED
            }),
            12
        );
        assert_eq!(count(HelperNode::Axes { size: 1.0 }), 3);
    }

    #[test]
    fn directional_square_faces_the_target() {
        let gizmo = gizmo(LightKind::Directional);
        let vertices = helper_lines(&[HelperNode::Light(gizmo)]);
        // Light sits straight above the target, so the square is horizontal.
        for vertex in &vertices[..8] {
            assert!((vertex.position[1] - 3.0).abs() < 1e-5);
            assert!((vertex.position[0].abs() - 1.0).abs() < 1e-5);
        }
        assert_eq!(vertices[9].position, [0.0, 0.0, 0.0]);
        for vertex in &vertices {
            assert!((vertex.color[0] - 1.0).abs() < 1e-6);
            assert_eq!(&vertex.color[1..], &[0.0, 0.0]);
        }
    }

    #[test]
    fn point_octahedron_has_gizmo_radius() {
        let gizmo = gizmo(LightKind::Point);
        let center = Vec3::from_array(gizmo.position);
        for vertex in helper_lines(&[HelperNode::Light(gizmo)]) {
            let distance = Vec3::from_array(vertex.position).distance(center);
            assert!((distance - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn spot_rim_matches_cone_angle() {
        let gizmo = gizmo(LightKind::Spot);
        let vertices = helper_lines(&[HelperNode::Light(gizmo)]);
        let rim = &vertices[10..];
        let base = Vec3::new(0.0, 0.0, 0.0);
        let expected = 3.0 * 0.3f32.tan();
        for vertex in rim {
            let point = Vec3::from_array(vertex.position);
            assert!(point.y.abs() < 1e-5);
            assert!((point.distance(base) - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn widest_spot_rim_stays_finite_and_forward() {
        let mut rig = LightRig::new(LightKind::Spot);
        if let LightVariant::Spot { cone, .. } = rig.variant_mut() {
            cone.angle = ANGLE_RANGE.max;
        }
        let gizmo = rig.gizmo().expect("gizmo");
        let vertices = helper_lines(&[HelperNode::Light(gizmo)]);
        let expected = 3.0 * MAX_CONE_ANGLE.tan();
        for vertex in &vertices[10..] {
            let point = Vec3::from_array(vertex.position);
            assert!(point.is_finite());
            // The rim lies on the target plane, below the apex.
            assert!(point.y.abs() < 1e-3);
            assert!((point.length() - expected).abs() / expected < 1e-3);
        }
    }

    #[test]
    fn axes_start_at_origin_with_gradient() {
        let vertices = helper_lines(&[HelperNode::Axes { size: 2.0 }]);
        assert_eq!(vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[1].position, [2.0, 0.0, 0.0]);
        assert_eq!(vertices[1].color, [1.0, 0.6, 0.0]);
    }
}
