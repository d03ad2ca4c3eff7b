use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::ui::PanelInput;

/// Keyboard and mouse state for the current frame.
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    buttons_pressed: HashSet<MouseButton>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
    scroll_delta: Vec2,
    window_size: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-frame state. Call after the frame has consumed it.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.buttons_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.key(key, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => self.button(*button, *state),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll_delta += match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y),
                    MouseScrollDelta::PixelDelta(pos) => {
                        Vec2::new(pos.x as f32, pos.y as f32) / 120.0
                    }
                };
            }
            WindowEvent::Resized(size) => {
                self.window_size = Vec2::new(size.width as f32, size.height as f32);
            }
            _ => {}
        }
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_size = Vec2::new(width as f32, height as f32);
    }

    fn key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.keys_down.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&key);
            }
        }
    }

    fn button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.buttons_down.insert(button) {
                    self.buttons_pressed.insert(button);
                }
            }
            ElementState::Released => {
                self.buttons_down.remove(&button);
            }
        }
    }

    fn cursor(&mut self, position: Vec2) {
        self.mouse_delta += position - self.mouse_position;
        self.mouse_position = position;
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// True only on the frame the key went down (auto-repeat ignored).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    /// Cursor position in window pixels.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Cursor position in normalized device coordinates, `[-1, 1]` with +y up.
    pub fn mouse_ndc(&self) -> Vec2 {
        if self.window_size.x <= 0.0 || self.window_size.y <= 0.0 {
            return Vec2::ZERO;
        }
        Vec2::new(
            self.mouse_position.x / self.window_size.x * 2.0 - 1.0,
            -(self.mouse_position.y / self.window_size.y) * 2.0 + 1.0,
        )
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll wheel delta this frame, in lines.
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }

    /// Pointer snapshot for the control panel.
    pub fn panel_input(&self) -> PanelInput {
        PanelInput {
            mouse: self.mouse_position,
            down: self.mouse_down(MouseButton::Left),
            pressed: self.mouse_pressed(MouseButton::Left),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_press_lasts_one_frame() {
        let mut input = Input::new();
        input.key(KeyCode::KeyH, ElementState::Pressed);
        assert!(input.key_pressed(KeyCode::KeyH));

        input.end_frame();
        input.key(KeyCode::KeyH, ElementState::Pressed); // auto-repeat
        assert!(!input.key_pressed(KeyCode::KeyH));
        assert!(input.key_down(KeyCode::KeyH));
    }

    #[test]
    fn mouse_ndc_spans_the_window() {
        let mut input = Input::new();
        input.set_window_size(800, 600);

        input.cursor(Vec2::new(0.0, 0.0));
        assert_eq!(input.mouse_ndc(), Vec2::new(-1.0, 1.0));

        input.cursor(Vec2::new(800.0, 600.0));
        assert_eq!(input.mouse_ndc(), Vec2::new(1.0, -1.0));

        input.cursor(Vec2::new(400.0, 300.0));
        assert_eq!(input.mouse_ndc(), Vec2::ZERO);
    }

    #[test]
    fn delta_accumulates_until_frame_end() {
        let mut input = Input::new();
        input.cursor(Vec2::new(10.0, 0.0));
        input.cursor(Vec2::new(15.0, 5.0));
        assert_eq!(input.mouse_delta(), Vec2::new(15.0, 5.0));
        input.end_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn panel_input_reflects_left_button() {
        let mut input = Input::new();
        input.button(MouseButton::Left, ElementState::Pressed);
        let p = input.panel_input();
        assert!(p.down && p.pressed);
        input.end_frame();
        assert!(!input.panel_input().pressed);
    }
}
