use super::Rgb;

/// Infinite ground grid, drawn procedurally around the camera.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub cell_size: f32,
    pub cell_color: Rgb,
    pub cell_thickness: f32,
    pub section_size: f32,
    pub section_color: Rgb,
    pub section_thickness: f32,
    pub fade_distance: f32,
    pub fade_strength: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            cell_color: Rgb::from_hex(0x6f6f6f),
            cell_thickness: 0.6,
            section_size: 3.0,
            section_color: Rgb::from_hex(0x800080),
            section_thickness: 1.0,
            fade_distance: 50.0,
            fade_strength: 5.0,
        }
    }
}

/// Soft shadow catcher: an upward orthographic depth capture shown on a
/// `scale` x `scale` plane at y = `elevation`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContactShadowSettings {
    pub elevation: f32,
    pub scale: f32,
    pub opacity: f32,
    pub blur: f32,
    pub color: Rgb,
    pub far: f32,
    pub resolution: u32,
}

impl Default for ContactShadowSettings {
    fn default() -> Self {
        Self {
            elevation: 2.0,
            scale: 10.0,
            opacity: 1.0,
            blur: 2.0,
            color: Rgb::from_hex(0xffc0cb),
            far: 10.0,
            resolution: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Environment {
    pub grid: GridSettings,
    pub contact_shadows: ContactShadowSettings,
    pub axes_size: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            grid: GridSettings::default(),
            contact_shadows: ContactShadowSettings::default(),
            axes_size: 1.0,
        }
    }
}

impl Environment {
    /// Pulls hand-edited values back into something the shaders can divide by.
    pub fn sanitize(&mut self) {
        let grid = &mut self.grid;
        grid.cell_size = grid.cell_size.max(0.01);
        grid.section_size = grid.section_size.max(0.01);
        grid.fade_distance = grid.fade_distance.max(1.0);
        grid.fade_strength = grid.fade_strength.max(0.0);

        let contact = &mut self.contact_shadows;
        contact.scale = contact.scale.max(0.1);
        contact.far = contact.far.max(0.1);
        contact.opacity = contact.opacity.clamp(0.0, 1.0);
        contact.blur = contact.blur.max(0.0);
        contact.resolution = contact.resolution.clamp(64, 2048);

        self.axes_size = self.axes_size.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_degenerate_sizes() {
        let mut environment = Environment::default();
        environment.grid.cell_size = 0.0;
        environment.grid.fade_distance = -3.0;
        environment.contact_shadows.resolution = 100_000;
        environment.contact_shadows.opacity = 2.0;
        environment.sanitize();
        assert!(environment.grid.cell_size > 0.0);
        assert_eq!(environment.grid.fade_distance, 1.0);
        assert_eq!(environment.contact_shadows.resolution, 2048);
        assert_eq!(environment.contact_shadows.opacity, 1.0);
    }

    #[test]
    fn defaults_survive_sanitize() {
        let mut environment = Environment::default();
        environment.sanitize();
        assert_eq!(environment, Environment::default());
    }
}
