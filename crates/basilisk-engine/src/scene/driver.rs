use crate::backend::{BackendError, ClearFlags, FrameStatus, GpuBackend, RenderTarget};
use crate::input::InputState;
use crate::time::{FpsCounter, FrameClock, FrameTime};

use super::registry::Scene;

/// What a tick did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TickOutcome {
    Presented,
    /// The surface was not ready; nothing was drawn.
    Skipped,
}

/// Runs one frame of a [`Scene`] per tick.
///
/// Order within a tick:
/// 1. advance the clock, log the frame rate once per second
/// 2. begin the frame (transient surface problems skip the tick)
/// 3. enable depth testing, bind and clear the main target
/// 4. `start_render` then `end_render` for each framebuffer, in order
/// 5. log backend errors reported since the last tick
/// 6. present
#[derive(Debug)]
pub struct FrameDriver {
    clock: FrameClock,
    fps: Option<FpsCounter>,
    last: Option<FrameTime>,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(FrameClock::new())
    }
}

impl FrameDriver {
    pub fn new(clock: FrameClock) -> Self {
        Self { clock, fps: None, last: None }
    }

    /// Timing of the most recent tick.
    pub fn last_frame(&self) -> Option<FrameTime> {
        self.last
    }

    /// Errors are returned only for failures that make the surface unusable;
    /// per-framebuffer failures are logged and the frame carries on.
    pub fn tick(
        &mut self,
        gpu: &mut dyn GpuBackend,
        scene: &mut Scene,
        input: &InputState,
    ) -> Result<TickOutcome, BackendError> {
        let ft = self.clock.tick();
        self.last = Some(ft);

        let fps = self.fps.get_or_insert_with(|| FpsCounter::new(ft.now));
        if let Some(n) = fps.frame(ft.now) {
            log::info!("{n} fps");
        }

        if gpu.begin_frame()? == FrameStatus::Skipped {
            log::warn!("frame {} skipped: surface not ready", ft.frame_index);
            return Ok(TickOutcome::Skipped);
        }

        gpu.set_depth_test(true);
        gpu.bind_target(RenderTarget::Main)?;
        gpu.clear(ClearFlags::ALL, scene.clear_color())?;

        let time = ft.shader_time;
        let (framebuffers, textures) = scene.render_parts();
        for (i, fb) in framebuffers.iter_mut().enumerate() {
            if let Err(err) = fb.start_render(gpu, time, input, textures) {
                log::error!("framebuffer {i}: render failed: {err}");
            }
            if let Err(err) = fb.end_render(gpu, time) {
                log::error!("framebuffer {i}: composite failed: {err}");
            }
        }

        for err in gpu.take_errors() {
            log::error!("gpu: {err}");
        }

        gpu.present()?;
        Ok(TickOutcome::Presented)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::{Command, RecordingBackend, ShaderId};
    use crate::coords::{ClearColor, Viewport};
    use crate::core::RenderCtx;
    use crate::error::RenderError;
    use crate::framebuffer::Renderable;

    fn tagged(log: &Rc<RefCell<Vec<&'static str>>>, tag: &'static str) -> Box<dyn Renderable> {
        let log = Rc::clone(log);
        Box::new(move |_: &mut RenderCtx<'_>| -> Result<(), RenderError> {
            log.borrow_mut().push(tag);
            Ok(())
        })
    }

    fn scene() -> Scene {
        Scene::new(Viewport::new(800, 600))
    }

    #[test]
    fn framebuffers_run_in_registration_order() {
        let mut gpu = RecordingBackend::default();
        let mut scene = scene();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            scene
                .create_framebuffer(&mut gpu, 8, 8, tagged(&order, tag), ShaderId::COMPOSITE)
                .unwrap();
        }

        let mut driver = FrameDriver::default();
        let out = driver.tick(&mut gpu, &mut scene, &InputState::default()).unwrap();

        assert_eq!(out, TickOutcome::Presented);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn tick_clears_main_then_presents() {
        let mut gpu = RecordingBackend::default();
        let mut scene = scene();
        scene.set_clear_color(ClearColor::new(0.1, 0.2, 0.3, 1.0));
        let order = Rc::new(RefCell::new(Vec::new()));
        scene.create_framebuffer(&mut gpu, 8, 8, tagged(&order, "a"), ShaderId::COMPOSITE).unwrap();
        gpu.take_commands();

        FrameDriver::default().tick(&mut gpu, &mut scene, &InputState::default()).unwrap();

        let cmds = gpu.commands();
        assert_eq!(cmds[0], Command::BeginFrame);
        assert_eq!(cmds[1], Command::SetDepthTest(true));
        assert_eq!(cmds[2], Command::BindTarget(RenderTarget::Main));
        assert_eq!(
            cmds[3],
            Command::Clear { flags: ClearFlags::ALL, color: ClearColor::new(0.1, 0.2, 0.3, 1.0) }
        );
        assert!(cmds.iter().any(|c| matches!(c, Command::DrawComposite(_))));
        assert_eq!(cmds.last(), Some(&Command::Present));
    }

    #[test]
    fn skipped_frame_draws_nothing() {
        let mut gpu = RecordingBackend::default();
        let mut scene = scene();
        let order = Rc::new(RefCell::new(Vec::new()));
        scene.create_framebuffer(&mut gpu, 8, 8, tagged(&order, "a"), ShaderId::COMPOSITE).unwrap();
        gpu.skip_frames(1);
        gpu.take_commands();

        let mut driver = FrameDriver::default();
        let out = driver.tick(&mut gpu, &mut scene, &InputState::default()).unwrap();
        assert_eq!(out, TickOutcome::Skipped);
        assert!(gpu.commands().is_empty());
        assert!(order.borrow().is_empty());

        driver.tick(&mut gpu, &mut scene, &InputState::default()).unwrap();
        assert_eq!(*order.borrow(), vec!["a"]);
    }

    #[test]
    fn backend_errors_are_drained_each_tick() {
        let mut gpu = RecordingBackend::default();
        let mut scene = scene();
        gpu.inject_error(BackendError::Validation("bad bind group".into()));

        FrameDriver::default().tick(&mut gpu, &mut scene, &InputState::default()).unwrap();
        assert!(gpu.take_errors().is_empty());
    }

    #[test]
    fn failing_renderable_does_not_stop_the_frame() {
        let mut gpu = RecordingBackend::default();
        let mut scene = scene();
        let order = Rc::new(RefCell::new(Vec::new()));
        scene
            .create_framebuffer(
                &mut gpu,
                8,
                8,
                Box::new(|_: &mut RenderCtx<'_>| -> Result<(), RenderError> {
                    Err(RenderError::FramebufferNotBound)
                }),
                ShaderId::COMPOSITE,
            )
            .unwrap();
        scene.create_framebuffer(&mut gpu, 8, 8, tagged(&order, "after"), ShaderId::COMPOSITE).unwrap();

        let out = FrameDriver::default().tick(&mut gpu, &mut scene, &InputState::default()).unwrap();
        assert_eq!(out, TickOutcome::Presented);
        assert_eq!(*order.borrow(), vec!["after"]);

        let composites = gpu
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::DrawComposite(_)))
            .count();
        assert_eq!(composites, 2);
    }

    #[test]
    fn shader_time_advances_per_tick() {
        let mut gpu = RecordingBackend::default();
        let mut scene = scene();
        let mut driver = FrameDriver::default();
        driver.tick(&mut gpu, &mut scene, &InputState::default()).unwrap();
        driver.tick(&mut gpu, &mut scene, &InputState::default()).unwrap();
        let t = driver.last_frame().unwrap().shader_time;
        assert!((t - 0.02).abs() < 1e-6);
    }
}
