use crate::config::CameraConfig;
use glam::{Mat4, Vec3};
use std::f32::consts::{FRAC_PI_2, TAU};

const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;
const MIN_DISTANCE: f32 = 0.05;
const MAX_DISTANCE: f32 = 5000.0;
const ZOOM_STEP: f32 = 0.95;

/// Perspective orbit camera: yaw/pitch of the view direction around a target.
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub target: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraController {
    pub fn new(position: [f32; 3], target: [f32; 3], fov_y: f32, near: f32, far: f32) -> Self {
        let offset = Vec3::from_array(target) - Vec3::from_array(position);
        let (yaw, pitch) = forward_to_yaw_pitch(offset.to_array());
        Self {
            target,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            distance: offset.length().clamp(MIN_DISTANCE, MAX_DISTANCE),
            fov_y,
            near,
            far,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            config.position,
            config.target,
            config.fov_deg.to_radians(),
            config.near,
            config.far,
        )
    }

    pub fn position(&self) -> [f32; 3] {
        let (forward, _, _) = self.basis();
        (Vec3::from_array(self.target) - Vec3::from_array(forward) * self.distance).to_array()
    }

    pub fn basis(&self) -> ([f32; 3], [f32; 3], [f32; 3]) {
        camera_basis(self.yaw, self.pitch)
    }

    /// A drag across the full viewport height turns the camera once around.
    pub fn orbit(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.yaw += TAU * dx / height;
        self.pitch -= TAU * dy / height;
        wrap_angles(&mut self.yaw, &mut self.pitch);
    }

    /// Moves target and camera together so the point under the cursor follows it.
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        let world_per_pixel = 2.0 * self.distance * (self.fov_y * 0.5).tan() / height;
        let (_, right, up) = self.basis();
        let shift = Vec3::from_array(right) * (-dx * world_per_pixel)
            + Vec3::from_array(up) * (dy * world_per_pixel);
        self.target = (Vec3::from_array(self.target) + shift).to_array();
    }

    /// Positive `lines` moves towards the target.
    pub fn dolly(&mut self, lines: f32) {
        if !lines.is_finite() || lines == 0.0 {
            return;
        }
        self.distance = (self.distance * ZOOM_STEP.powf(lines)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn view_matrix(&self) -> Mat4 {
        let (_, _, up) = self.basis();
        Mat4::look_at_rh(
            Vec3::from_array(self.position()),
            Vec3::from_array(self.target),
            Vec3::from_array(up),
        )
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(1e-3), self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

fn forward_to_yaw_pitch(forward: [f32; 3]) -> (f32, f32) {
    let v = Vec3::from_array(forward);
    let n = if v.length_squared() > 1e-12 {
        v.normalize()
    } else {
        Vec3::NEG_Z
    };
    (n.z.atan2(n.x), n.y.clamp(-1.0, 1.0).asin())
}

fn camera_basis(yaw: f32, pitch: f32) -> ([f32; 3], [f32; 3], [f32; 3]) {
    let cos_pitch = pitch.cos();
    let forward = Vec3::new(yaw.cos() * cos_pitch, pitch.sin(), yaw.sin() * cos_pitch);
    let right = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
    let up = right.cross(forward).normalize_or_zero();
    (forward.to_array(), right.to_array(), up.to_array())
}

fn wrap_angles(yaw: &mut f32, pitch: &mut f32) {
    use std::f32::consts::PI;
    if yaw.is_finite() {
        *yaw = (*yaw + PI).rem_euclid(TAU) - PI;
    }
    if pitch.is_finite() {
        *pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn starts_where_configured() {
        let camera = CameraController::from_config(&CameraConfig::default());
        assert!(close(camera.position(), [3.0, 3.0, 3.0]));
        assert!((camera.distance - 27f32.sqrt()).abs() < 1e-4);
        assert!((camera.fov_y - 75f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn orbit_keeps_distance_to_target() {
        let mut camera = CameraController::from_config(&CameraConfig::default());
        camera.orbit(120.0, -40.0, 720.0);
        let position = Vec3::from_array(camera.position());
        assert!((position.length() - camera.distance).abs() < 1e-4);
        assert!(camera.yaw.is_finite() && camera.pitch.is_finite());
    }

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let mut camera = CameraController::from_config(&CameraConfig::default());
        camera.orbit(0.0, -10_000.0, 720.0);
        assert!(camera.pitch <= PITCH_LIMIT);
        camera.orbit(0.0, 10_000.0, 720.0);
        assert!(camera.pitch >= -PITCH_LIMIT);
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn pan_moves_camera_and_target_together() {
        let mut camera = CameraController::from_config(&CameraConfig::default());
        let before = Vec3::from_array(camera.position()) - Vec3::from_array(camera.target);
        camera.pan(50.0, 20.0, 720.0);
        let after = Vec3::from_array(camera.position()) - Vec3::from_array(camera.target);
        assert!((before - after).length() < 1e-4);
        assert!(Vec3::from_array(camera.target).length() > 0.0);
    }

    #[test]
    fn dolly_in_and_out_is_symmetric() {
        let mut camera = CameraController::from_config(&CameraConfig::default());
        let start = camera.distance;
        camera.dolly(3.0);
        assert!(camera.distance < start);
        camera.dolly(-3.0);
        assert!((camera.distance - start).abs() < 1e-4);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let camera = CameraController::from_config(&CameraConfig::default());
        let clip = camera.view_proj(16.0 / 9.0) * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
