//! Keyboard and mouse input state.
//!
//! The host (window layer, test harness, replay tool) feeds events into an
//! [`InputState`] and hands it to the frame loop by shared reference. Scripts
//! only ever read it.
//!
//! [`Input`] tracks which keys/buttons are held, were pressed this frame, or
//! were released this frame.

use std::collections::HashSet;
use std::hash::Hash;

use crate::math::Vec2;

/// Keys the engine and its built-in scripts know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    R,
    Space,
    LeftShift,
    LeftControl,
    Escape,
    Tab,
    Enter,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Tracks the state of a set of inputs (keys or mouse buttons).
///
/// - `pressed`: currently held down
/// - `just_pressed`: went down this frame
/// - `just_released`: went up this frame
#[derive(Debug, Clone)]
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    /// Record a press. Repeats while held don't count as a new press.
    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Clear per-frame state.
    pub fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mouse cursor position in window coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorPosition {
    pub x: f32,
    pub y: f32,
}

/// Everything the scripts can see of the user's input for one frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub keys: Input<Key>,
    pub mouse_buttons: Input<MouseButton>,
    pub cursor: CursorPosition,
    /// Cursor movement since the previous frame, in pixels.
    pub mouse_delta: Vec2,
    pub scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys.pressed(key)
    }

    pub fn key_just_pressed(&self, key: Key) -> bool {
        self.keys.just_pressed(key)
    }

    /// Move the cursor, accumulating the delta for this frame.
    pub fn move_cursor(&mut self, x: f32, y: f32) {
        self.mouse_delta += Vec2::new(x - self.cursor.x, y - self.cursor.y);
        self.cursor = CursorPosition { x, y };
    }

    /// Reset the per-frame parts: edge-triggered keys, mouse delta and scroll.
    pub fn end_frame(&mut self) {
        self.keys.clear_just();
        self.mouse_buttons.clear_just();
        self.mouse_delta = Vec2::ZERO;
        self.scroll = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_edges() {
        let mut input = Input::new();
        input.press(Key::W);
        input.press(Key::W);
        assert!(input.pressed(Key::W));
        assert!(input.just_pressed(Key::W));
        input.clear_just();
        assert!(!input.just_pressed(Key::W));
        input.release(Key::W);
        assert!(input.just_released(Key::W));
        assert!(!input.pressed(Key::W));
    }

    #[test]
    fn cursor_delta_accumulates_until_end_of_frame() {
        let mut state = InputState::new();
        state.move_cursor(10.0, 5.0);
        state.move_cursor(12.0, 4.0);
        assert_eq!(state.mouse_delta, Vec2::new(12.0, 4.0));
        state.end_frame();
        assert_eq!(state.mouse_delta, Vec2::ZERO);
        state.move_cursor(13.0, 4.0);
        assert_eq!(state.mouse_delta, Vec2::new(1.0, 0.0));
    }
}
