use crate::scene::LightKind;

/// Toolbar-owned state: which overlays are up and which light kind is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    panel_visible: bool,
    overlay_visible: bool,
    selected_light: LightKind,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            panel_visible: true,
            overlay_visible: true,
            selected_light: LightKind::Point,
        }
    }
}

impl ViewState {
    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn selected_light(&self) -> LightKind {
        self.selected_light
    }

    pub fn toggle_panel(&mut self) {
        self.panel_visible = !self.panel_visible;
        log::debug!("Panel visible: {}", self.panel_visible);
    }

    pub fn toggle_overlay(&mut self) {
        self.overlay_visible = !self.overlay_visible;
        log::debug!("Stats overlay visible: {}", self.overlay_visible);
    }

    /// Returns true when the selection actually changed.
    pub fn select_light(&mut self, kind: LightKind) -> bool {
        if self.selected_light == kind {
            return false;
        }
        self.selected_light = kind;
        true
    }

    /// Selection by key (`"spot"`); unknown names leave the selection alone.
    pub fn select_light_named(&mut self, name: &str) -> bool {
        match name.parse::<LightKind>() {
            Ok(kind) => self.select_light(kind),
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }

    pub fn panel_button_label(&self) -> &'static str {
        if self.panel_visible {
            "Hide Panel"
        } else {
            "Show Panel"
        }
    }

    pub fn overlay_button_label(&self) -> &'static str {
        if self.overlay_visible {
            "Hide Stats"
        } else {
            "Show Stats"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{compose_scene, BoxParams, Environment, HelperNode, LightRig, Rgb};

    #[test]
    fn defaults_show_everything_with_a_point_light() {
        let view = ViewState::default();
        assert!(view.panel_visible());
        assert!(view.overlay_visible());
        assert_eq!(view.selected_light(), LightKind::Point);
        assert_eq!(view.panel_button_label(), "Hide Panel");
        assert_eq!(view.overlay_button_label(), "Hide Stats");
    }

    #[test]
    fn toggling_twice_restores_visibility() {
        let mut view = ViewState::default();
        view.toggle_panel();
        assert!(!view.panel_visible());
        assert_eq!(view.panel_button_label(), "Show Panel");
        view.toggle_panel();
        assert!(view.panel_visible());

        view.toggle_overlay();
        assert_eq!(view.overlay_button_label(), "Show Stats");
        view.toggle_overlay();
        assert!(view.overlay_visible());
    }

    #[test]
    fn unknown_names_keep_the_current_selection() {
        let mut view = ViewState::default();
        assert!(!view.select_light_named("rect-area"));
        assert_eq!(view.selected_light(), LightKind::Point);
        assert!(view.select_light_named("directional"));
        assert_eq!(view.selected_light(), LightKind::Directional);
        assert!(!view.select_light(LightKind::Directional));
    }

    #[test]
    fn hiding_the_panel_then_picking_ambient() {
        let mut view = ViewState::default();
        let mut rig = LightRig::default();

        view.toggle_panel();
        assert!(view.select_light(LightKind::Ambient));
        rig.mount(view.selected_light());

        let scene = compose_scene(&rig, &BoxParams::default(), &Environment::default());
        assert!(!view.panel_visible());
        assert_eq!(scene.light.kind(), LightKind::Ambient);
        assert!(!scene
            .helpers
            .iter()
            .any(|helper| matches!(helper, HelperNode::Light(_))));
        assert_eq!(scene.light.color, Rgb::from_hex(0xff5151));
        assert_eq!(scene.light.intensity, 6.0);
    }
}
