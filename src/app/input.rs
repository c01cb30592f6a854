use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pixels of trackpad scroll that count as one wheel notch.
const PIXELS_PER_LINE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitGesture {
    None,
    Rotate { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
}

/// Mouse state for the orbit controls.
#[derive(Default, Debug, Clone, Copy)]
pub struct OrbitInput {
    rotating: bool,
    panning: bool,
    cursor: Option<(f32, f32)>,
}

impl OrbitInput {
    pub fn handle_button(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.rotating = pressed,
            MouseButton::Right | MouseButton::Middle => self.panning = pressed,
            _ => {}
        }
    }

    /// Records the new cursor position and reports the drag it produced, if any.
    pub fn handle_cursor(&mut self, x: f32, y: f32) -> OrbitGesture {
        let previous = self.cursor.replace((x, y));
        let Some((last_x, last_y)) = previous else {
            return OrbitGesture::None;
        };
        let (dx, dy) = (x - last_x, y - last_y);
        if self.rotating {
            OrbitGesture::Rotate { dx, dy }
        } else if self.panning {
            OrbitGesture::Pan { dx, dy }
        } else {
            OrbitGesture::None
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }

    /// Drops drags in flight, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.rotating = false;
        self.panning = false;
        self.cursor = None;
    }
}

/// Wheel delta in notches; positive scrolls away from the user (zoom in).
pub fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
    }
}

/// Escape quits, unless egui took the key (e.g. to leave a focused text field).
pub fn requests_exit(state: ElementState, key: PhysicalKey, consumed_by_ui: bool) -> bool {
    !consumed_by_ui && state == ElementState::Pressed && key == PhysicalKey::Code(KeyCode::Escape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cursor_sample_produces_no_motion() {
        let mut input = OrbitInput::default();
        input.handle_button(MouseButton::Left, ElementState::Pressed);
        assert_eq!(input.handle_cursor(10.0, 10.0), OrbitGesture::None);
        assert_eq!(
            input.handle_cursor(14.0, 7.0),
            OrbitGesture::Rotate { dx: 4.0, dy: -3.0 }
        );
    }

    #[test]
    fn right_drag_pans_and_release_stops() {
        let mut input = OrbitInput::default();
        input.handle_cursor(0.0, 0.0);
        input.handle_button(MouseButton::Right, ElementState::Pressed);
        assert_eq!(
            input.handle_cursor(2.0, 1.0),
            OrbitGesture::Pan { dx: 2.0, dy: 1.0 }
        );
        input.handle_button(MouseButton::Right, ElementState::Released);
        assert_eq!(input.handle_cursor(5.0, 5.0), OrbitGesture::None);
    }

    #[test]
    fn pixel_scroll_is_scaled_to_lines() {
        let pixels = MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 100.0));
        assert_eq!(scroll_lines(pixels), 2.0);
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, -1.0)), -1.0);
    }

    #[test]
    fn escape_exits_only_when_the_ui_left_it_alone() {
        let escape = PhysicalKey::Code(KeyCode::Escape);
        assert!(requests_exit(ElementState::Pressed, escape, false));
        assert!(!requests_exit(ElementState::Pressed, escape, true));
        assert!(!requests_exit(ElementState::Released, escape, false));
        assert!(!requests_exit(
            ElementState::Pressed,
            PhysicalKey::Code(KeyCode::KeyQ),
            false
        ));
    }
}
