use std::collections::HashSet;

use crate::coords::Vec2;

use super::types::{InputEvent, Key, KeyState, Modifiers};

/// Input state for a single window.
///
/// Holds "is down" information, the pointer position and the key transitions
/// seen since the last [`end_tick`](Self::end_tick).
#[derive(Debug, Default)]
pub struct InputState {
    /// Current modifier state.
    pub modifiers: Modifiers,

    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in physical pixels, top-left origin.
    pub pointer_pos: Option<(f32, f32)>,

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,

    /// Keys that went down this tick.
    pub keys_pressed: HashSet<Key>,

    /// Keys that went up this tick.
    pub keys_released: HashSet<Key>,
}

impl InputState {
    /// Applies a platform-agnostic input event.
    pub fn apply_event(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::ModifiersChanged(m) => {
                self.modifiers = m;
            }

            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // On focus loss, clear held keys to avoid stuck keys.
                    self.keys_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                self.pointer_pos = Some((x, y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key { key, state, modifiers, .. } => {
                self.modifiers = modifiers;

                match state {
                    KeyState::Pressed => {
                        if self.keys_down.insert(key) {
                            self.keys_pressed.insert(key);
                        }
                    }
                    KeyState::Released => {
                        if self.keys_down.remove(&key) {
                            self.keys_released.insert(key);
                        }
                    }
                }
            }
        }
    }

    /// Forgets this tick's transitions. Called by the runtime after each frame.
    pub fn end_tick(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn key_up(&self, key: Key) -> bool {
        !self.key_down(key)
    }

    /// True only on the tick the key went down.
    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// True only on the tick the key went up.
    pub fn key_released(&self, key: Key) -> bool {
        self.keys_released.contains(&key)
    }

    /// Cursor position, top-left origin.
    pub fn cursor_position(&self) -> Option<Vec2> {
        self.pointer_pos.map(|(x, y)| Vec2::new(x, y))
    }

    /// Cursor position with `y` measured up from the bottom of a window
    /// `height` pixels tall, matching the pixel camera.
    pub fn cursor_position_bottom_up(&self, height: f32) -> Option<Vec2> {
        self.pointer_pos.map(|(x, y)| Vec2::new(x, height - y))
    }
}
