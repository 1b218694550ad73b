use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use crate::input::{InputEvent, InputState, Key, KeyState, Modifiers};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Returns `None` for events the input state does not track.
pub fn translate_window_event(state: &InputState, event: &WindowEvent) -> Option<InputEvent> {
    let ev = match event {
        WindowEvent::ModifiersChanged(m) => InputEvent::ModifiersChanged(map_modifiers(m.state())),
        WindowEvent::Focused(f) => InputEvent::Focused(*f),
        WindowEvent::CursorLeft { .. } => InputEvent::PointerLeft,
        WindowEvent::CursorMoved { position, .. } => InputEvent::PointerMoved {
            x: position.x as f32,
            y: position.y as f32,
        },
        WindowEvent::KeyboardInput { event, .. } => {
            let (key, code) = map_key(event.physical_key);
            InputEvent::Key {
                key,
                state: match event.state {
                    ElementState::Pressed => KeyState::Pressed,
                    ElementState::Released => KeyState::Released,
                },
                modifiers: state.modifiers,
                code,
                repeat: event.repeat,
            }
        }
        _ => return None,
    };
    Some(ev)
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

#[rustfmt::skip]
const KEY_TABLE: &[(KeyCode, Key)] = &[
    (KeyCode::Escape, Key::Escape), (KeyCode::Enter, Key::Enter), (KeyCode::Tab, Key::Tab),
    (KeyCode::Backspace, Key::Backspace), (KeyCode::Space, Key::Space),
    (KeyCode::Insert, Key::Insert), (KeyCode::Delete, Key::Delete),
    (KeyCode::Home, Key::Home), (KeyCode::End, Key::End),
    (KeyCode::PageUp, Key::PageUp), (KeyCode::PageDown, Key::PageDown),
    (KeyCode::ArrowUp, Key::ArrowUp), (KeyCode::ArrowDown, Key::ArrowDown),
    (KeyCode::ArrowLeft, Key::ArrowLeft), (KeyCode::ArrowRight, Key::ArrowRight),
    (KeyCode::ShiftLeft, Key::Shift), (KeyCode::ShiftRight, Key::Shift),
    (KeyCode::ControlLeft, Key::Control), (KeyCode::ControlRight, Key::Control),
    (KeyCode::AltLeft, Key::Alt), (KeyCode::AltRight, Key::Alt),
    (KeyCode::SuperLeft, Key::Meta), (KeyCode::SuperRight, Key::Meta),
    (KeyCode::KeyA, Key::A), (KeyCode::KeyB, Key::B), (KeyCode::KeyC, Key::C),
    (KeyCode::KeyD, Key::D), (KeyCode::KeyE, Key::E), (KeyCode::KeyF, Key::F),
    (KeyCode::KeyG, Key::G), (KeyCode::KeyH, Key::H), (KeyCode::KeyI, Key::I),
    (KeyCode::KeyJ, Key::J), (KeyCode::KeyK, Key::K), (KeyCode::KeyL, Key::L),
    (KeyCode::KeyM, Key::M), (KeyCode::KeyN, Key::N), (KeyCode::KeyO, Key::O),
    (KeyCode::KeyP, Key::P), (KeyCode::KeyQ, Key::Q), (KeyCode::KeyR, Key::R),
    (KeyCode::KeyS, Key::S), (KeyCode::KeyT, Key::T), (KeyCode::KeyU, Key::U),
    (KeyCode::KeyV, Key::V), (KeyCode::KeyW, Key::W), (KeyCode::KeyX, Key::X),
    (KeyCode::KeyY, Key::Y), (KeyCode::KeyZ, Key::Z),
    (KeyCode::Digit0, Key::Digit0), (KeyCode::Digit1, Key::Digit1),
    (KeyCode::Digit2, Key::Digit2), (KeyCode::Digit3, Key::Digit3),
    (KeyCode::Digit4, Key::Digit4), (KeyCode::Digit5, Key::Digit5),
    (KeyCode::Digit6, Key::Digit6), (KeyCode::Digit7, Key::Digit7),
    (KeyCode::Digit8, Key::Digit8), (KeyCode::Digit9, Key::Digit9),
    (KeyCode::F1, Key::F1), (KeyCode::F2, Key::F2), (KeyCode::F3, Key::F3),
    (KeyCode::F4, Key::F4), (KeyCode::F5, Key::F5), (KeyCode::F6, Key::F6),
    (KeyCode::F7, Key::F7), (KeyCode::F8, Key::F8), (KeyCode::F9, Key::F9),
    (KeyCode::F10, Key::F10), (KeyCode::F11, Key::F11), (KeyCode::F12, Key::F12),
];

fn map_key(pk: PhysicalKey) -> (Key, u32) {
    match pk {
        PhysicalKey::Code(code) => {
            let raw = code as u32;
            let key = KEY_TABLE
                .iter()
                .find(|(c, _)| *c == code)
                .map_or(Key::Unknown(raw), |(_, k)| *k);
            (key, raw)
        }
        // NativeKeyCode carries no portable number.
        PhysicalKey::Unidentified(_) => (Key::Unknown(0), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_letters_and_arrows() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyW)).0, Key::W);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::ArrowLeft)).0, Key::ArrowLeft);
    }

    #[test]
    fn both_sides_map_to_one_modifier_key() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::ShiftLeft)).0, Key::Shift);
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::ShiftRight)).0, Key::Shift);
    }

    #[test]
    fn unmapped_codes_become_unknown() {
        let (key, code) = map_key(PhysicalKey::Code(KeyCode::NumpadAdd));
        assert_eq!(key, Key::Unknown(code));
    }
}
