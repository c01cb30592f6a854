//! egui widgets: the toolbar, the "Controls" panel and the stats overlay.
//!
//! Widgets edit the state they are handed in place; the app recomposes the
//! scene from that state right after the UI pass.

use crate::app::{FrameStats, ViewState};
use crate::scene::lights::{
    ANGLE_RANGE, DECAY_RANGE, DISTANCE_RANGE, INTENSITY_RANGE, PENUMBRA_RANGE,
};
use crate::scene::primitives::OPACITY_RANGE;
use crate::scene::{
    BoxParams, CommonLightParams, LightKind, LightRig, LightVariant, ParamRange, Rgb, ShadowFlags,
};
use egui::{Align2, Color32, Pos2, Rect, Sense, Stroke, Vec2};

const EDGE_MARGIN: f32 = 10.0;
const PANEL_WIDTH: f32 = 280.0;
const SPARKLINE_SIZE: Vec2 = Vec2::new(140.0, 32.0);
const POSITION_DRAG_SPEED: f64 = 0.05;

/// Mutable view of everything the UI may edit during one frame.
pub struct UiModel<'a> {
    pub view: &'a mut ViewState,
    pub lights: &'a mut LightRig,
    pub box_params: &'a mut BoxParams,
    pub stats: &'a FrameStats,
}

pub fn draw(ctx: &egui::Context, model: UiModel<'_>) {
    let UiModel {
        view,
        lights,
        box_params,
        stats,
    } = model;

    toolbar(ctx, view);
    if view.panel_visible() {
        controls_window(ctx, lights, box_params);
    }
    if view.overlay_visible() {
        stats_overlay(ctx, stats);
    }
}

fn toolbar(ctx: &egui::Context, view: &mut ViewState) {
    egui::Area::new(egui::Id::new("toolbar"))
        .anchor(Align2::CENTER_TOP, [0.0, EDGE_MARGIN])
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    if ui.button(view.panel_button_label()).clicked() {
                        view.toggle_panel();
                    }
                    if ui.button(view.overlay_button_label()).clicked() {
                        view.toggle_overlay();
                    }
                    let mut selected = view.selected_light();
                    egui::ComboBox::from_id_salt("light_kind")
                        .selected_text(selected.label())
                        .show_ui(ui, |ui| {
                            for kind in LightKind::ALL {
                                ui.selectable_value(&mut selected, kind, kind.label());
                            }
                        });
                    view.select_light(selected);
                });
            });
        });
}

fn controls_window(ctx: &egui::Context, lights: &mut LightRig, box_params: &mut BoxParams) {
    egui::Window::new("Controls")
        .anchor(Align2::RIGHT_TOP, [-EDGE_MARGIN, EDGE_MARGIN])
        .default_width(PANEL_WIDTH)
        .resizable(false)
        .show(ctx, |ui| {
            egui::CollapsingHeader::new("Light Controls")
                .default_open(true)
                .show(ui, |ui| light_controls(ui, lights.variant_mut()));
            egui::CollapsingHeader::new("Box Control")
                .default_open(true)
                .show(ui, |ui| box_controls(ui, box_params));
        });
}

/// Shows only the fields the mounted variant carries.
fn light_controls(ui: &mut egui::Ui, variant: &mut LightVariant) {
    ui.label(egui::RichText::new(variant.kind().label()).strong());
    let mut changed = common_controls(ui, variant.common_mut());
    match variant {
        LightVariant::Ambient { .. } => {}
        LightVariant::Directional { shadows, .. } => {
            changed |= shadow_controls(ui, shadows);
        }
        LightVariant::Point {
            shadows, falloff, ..
        } => {
            changed |= shadow_controls(ui, shadows);
            changed |= range_slider(ui, "distance", &mut falloff.distance, DISTANCE_RANGE);
            changed |= range_slider(ui, "decay", &mut falloff.decay, DECAY_RANGE);
        }
        LightVariant::Spot { shadows, cone, .. } => {
            changed |= shadow_controls(ui, shadows);
            changed |= range_slider(ui, "angle", &mut cone.angle, ANGLE_RANGE);
            changed |= range_slider(ui, "penumbra", &mut cone.penumbra, PENUMBRA_RANGE);
        }
    }
    if changed {
        variant.normalize();
    }
}

fn common_controls(ui: &mut egui::Ui, common: &mut CommonLightParams) -> bool {
    let mut changed = color_row(ui, "color", &mut common.color);
    changed |= range_slider(ui, "intensity", &mut common.intensity, INTENSITY_RANGE);
    changed |= position_row(ui, "position", &mut common.position);
    changed
}

fn shadow_controls(ui: &mut egui::Ui, shadows: &mut ShadowFlags) -> bool {
    let mut changed = ui.checkbox(&mut shadows.cast_shadow, "castShadow").changed();
    changed |= ui
        .checkbox(&mut shadows.receive_shadow, "receiveShadow")
        .changed();
    changed
}

fn box_controls(ui: &mut egui::Ui, params: &mut BoxParams) {
    let mut changed = position_row(ui, "position", &mut params.position);
    changed |= color_row(ui, "color", &mut params.color);
    changed |= range_slider(ui, "opacity", &mut params.opacity, OPACITY_RANGE);
    changed |= ui.checkbox(&mut params.transparent, "transparent").changed();
    if changed {
        params.normalize();
    }
}

fn range_slider(ui: &mut egui::Ui, label: &str, value: &mut f32, range: ParamRange) -> bool {
    let mut slider = egui::Slider::new(value, range.min..=range.max).text(label);
    if let Some(step) = range.step {
        slider = slider.step_by(step as f64);
    }
    ui.add(slider).changed()
}

fn position_row(ui: &mut egui::Ui, label: &str, position: &mut [f32; 3]) -> bool {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut changed = false;
        for (axis, value) in ["x", "y", "z"].into_iter().zip(position.iter_mut()) {
            changed |= ui
                .add(
                    egui::DragValue::new(value)
                        .speed(POSITION_DRAG_SPEED)
                        .prefix(format!("{axis} ")),
                )
                .changed();
        }
        changed
    })
    .inner
}

/// Color picker plus a `#rrggbb` text field. The text draft lives in egui
/// memory while focused so partial input is not overwritten every frame.
fn color_row(ui: &mut egui::Ui, label: &str, color: &mut Rgb) -> bool {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut changed = ui.color_edit_button_srgb(&mut color.0).changed();

        let draft_id = ui.id().with(("hex", label));
        let mut draft = ui
            .data_mut(|data| data.get_temp::<String>(draft_id))
            .unwrap_or_else(|| color.to_hex());
        let response = ui.add(egui::TextEdit::singleline(&mut draft).desired_width(72.0));
        if response.changed() {
            if let Ok(parsed) = draft.parse::<Rgb>() {
                changed |= parsed != *color;
                *color = parsed;
            }
        }
        if response.has_focus() {
            ui.data_mut(|data| data.insert_temp(draft_id, draft));
        } else {
            ui.data_mut(|data| data.remove::<String>(draft_id));
        }
        changed
    })
    .inner
}

fn stats_overlay(ctx: &egui::Context, stats: &FrameStats) {
    egui::Area::new(egui::Id::new("stats_overlay"))
        .anchor(Align2::LEFT_TOP, [EDGE_MARGIN, EDGE_MARGIN])
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.monospace(format!("{:5.1} FPS", stats.fps));
                ui.monospace(format!("{:5.2} ms frame", stats.frame_ms));
                ui.monospace(format!("{:5.2} ms render", stats.render_ms));
                let (rect, _) = ui.allocate_exact_size(SPARKLINE_SIZE, Sense::hover());
                ui.painter()
                    .rect_filled(rect, 2.0, Color32::from_black_alpha(96));
                let points = sparkline_points(&stats.history, rect);
                if points.len() > 1 {
                    ui.painter()
                        .add(egui::Shape::line(points, Stroke::new(1.0, Color32::LIGHT_GREEN)));
                }
            });
        });
}

/// Maps the history onto `rect`, oldest sample on the left, scaled to the peak.
fn sparkline_points(history: &[f32], rect: Rect) -> Vec<Pos2> {
    let peak = history.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let last = history.len().saturating_sub(1).max(1) as f32;
    history
        .iter()
        .enumerate()
        .map(|(index, &sample)| {
            Pos2::new(
                rect.left() + rect.width() * index as f32 / last,
                rect.bottom() - rect.height() * (sample / peak).clamp(0.0, 1.0),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> FrameStats {
        FrameStats {
            fps: 60.0,
            frame_ms: 16.6,
            render_ms: 1.2,
            history: vec![30.0, 60.0],
        }
    }

    fn run_frame(view: &mut ViewState, lights: &mut LightRig, box_params: &mut BoxParams) {
        let ctx = egui::Context::default();
        let stats = stats();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            draw(
                ctx,
                UiModel {
                    view: &mut *view,
                    lights: &mut *lights,
                    box_params: &mut *box_params,
                    stats: &stats,
                },
            )
        });
    }

    #[test]
    fn idle_frame_leaves_state_untouched() {
        let mut view = ViewState::default();
        let mut lights = LightRig::new(LightKind::Spot);
        let mut box_params = BoxParams::default();
        run_frame(&mut view, &mut lights, &mut box_params);

        assert_eq!(view, ViewState::default());
        assert_eq!(lights, LightRig::new(LightKind::Spot));
        assert_eq!(box_params, BoxParams::default());
    }

    #[test]
    fn hidden_panel_and_overlay_still_draw_toolbar() {
        let mut view = ViewState::default();
        view.toggle_panel();
        view.toggle_overlay();
        let mut lights = LightRig::default();
        let mut box_params = BoxParams::default();
        run_frame(&mut view, &mut lights, &mut box_params);

        assert!(!view.panel_visible());
        assert!(!view.overlay_visible());
    }

    #[test]
    fn sparkline_spans_rect_and_peaks_at_top() {
        let rect = Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(100.0, 20.0));
        let points = sparkline_points(&[30.0, 60.0, 15.0], rect);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Pos2::new(0.0, 10.0));
        assert_eq!(points[1], Pos2::new(50.0, 0.0));
        assert_eq!(points[2], Pos2::new(100.0, 15.0));
    }

    #[test]
    fn sparkline_empty_without_samples() {
        let rect = Rect::from_min_size(Pos2::ZERO, SPARKLINE_SIZE);
        assert!(sparkline_points(&[], rect).is_empty());
        assert!(sparkline_points(&[0.0, 0.0], rect).is_empty());
    }
}
