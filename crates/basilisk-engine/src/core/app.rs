use winit::event::WindowEvent;

use crate::input::InputState;
use crate::scene::Scene;

use super::ctx::SetupCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by binaries.
///
/// Drawing happens in the [`crate::framebuffer::Renderable`]s registered on
/// the scene during [`setup`](Self::setup); the runtime drives them every tick.
pub trait App {
    /// Called once, after the window and GPU backend exist.
    fn setup(&mut self, ctx: &mut SetupCtx<'_>) -> anyhow::Result<()>;

    /// Called for window events.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per tick after the frame has been presented.
    fn update(&mut self, input: &InputState, scene: &mut Scene) -> AppControl {
        let _ = (input, scene);
        AppControl::Continue
    }
}
