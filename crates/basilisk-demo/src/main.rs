use anyhow::Result;

use basilisk_engine::backend::{GpuBackend, ShaderId};
use basilisk_engine::batch::{Batch, BatchDesc};
use basilisk_engine::camera::Camera;
use basilisk_engine::coords::{Rgba8, Vec2};
use basilisk_engine::core::{App, AppControl, RenderCtx, SetupCtx};
use basilisk_engine::device::GpuInit;
use basilisk_engine::framebuffer::Renderable;
use basilisk_engine::input::{InputState, Key};
use basilisk_engine::logging::{init_logging, LoggingConfig};
use basilisk_engine::scene::Scene;
use basilisk_engine::window::{Runtime, RuntimeConfig};
use basilisk_engine::RenderError;

/// Pixels per tick the player quad moves while an arrow key is held.
const SPEED: f32 = 4.0;

const PLAYER_SIZE: f32 = 48.0;

/// A few static shapes plus a quad steered with the arrow keys.
struct Playfield {
    batch: Option<Batch>,
    player: Vec2,
}

impl Playfield {
    fn steer(&mut self, input: &InputState) {
        // Pixel camera: +Y is up.
        if input.key_down(Key::ArrowLeft) {
            self.player.x -= SPEED;
        }
        if input.key_down(Key::ArrowRight) {
            self.player.x += SPEED;
        }
        if input.key_down(Key::ArrowUp) {
            self.player.y += SPEED;
        }
        if input.key_down(Key::ArrowDown) {
            self.player.y -= SPEED;
        }
    }
}

impl Renderable for Playfield {
    fn render(&mut self, ctx: &mut RenderCtx<'_>) -> Result<(), RenderError> {
        self.steer(ctx.input);

        let Some(batch) = self.batch.as_mut() else { return Ok(()) };
        let pulse = (ctx.time * 2.0).sin() * 0.5 + 0.5;
        let w = ctx.target_size.width as f32;

        let mut b = ctx.select(batch);
        b.push_quad(Vec2::new(20.0, 20.0), Vec2::new(120.0, 80.0), Rgba8::new(220, 80, 60, 255))?;
        b.push_quad(
            Vec2::new(w - 140.0, 20.0),
            Vec2::new(120.0, 80.0),
            Rgba8::new(60, 120, 220, (128.0 + pulse * 127.0) as u8),
        )?;
        b.push_triangle(
            Vec2::new(200.0, 150.0),
            Vec2::new(300.0, 150.0),
            Vec2::new(250.0, 240.0),
            Rgba8::new(240, 200, 40, 255),
        )?;
        b.push_quad(self.player, Vec2::new(PLAYER_SIZE, PLAYER_SIZE), Rgba8::WHITE)?;
        b.upload()?;
        b.render_all()
    }

    fn release(&mut self, gpu: &mut dyn GpuBackend) {
        if let Some(batch) = self.batch.take() {
            batch.free(gpu);
        }
    }
}

struct Demo;

impl App for Demo {
    fn setup(&mut self, ctx: &mut SetupCtx<'_>) -> Result<()> {
        let size = ctx.scene.size();
        ctx.scene.set_background_color(24.0, 26.0, 33.0, 255.0);

        let desc = BatchDesc {
            capacity: 64,
            camera: Camera::pixels(size),
            ..BatchDesc::default()
        };
        let batch = Batch::new(&mut *ctx.gpu, &desc)?;

        let playfield = Playfield {
            batch: Some(batch),
            player: Vec2::new(
                (size.width as f32 - PLAYER_SIZE) * 0.5,
                (size.height as f32 - PLAYER_SIZE) * 0.5,
            ),
        };

        let id = ctx.scene.create_framebuffer(
            &mut *ctx.gpu,
            size.width,
            size.height,
            Box::new(playfield),
            ShaderId::COMPOSITE,
        )?;
        log::info!("framebuffer {id:?} ready ({}x{})", size.width, size.height);
        Ok(())
    }

    fn update(&mut self, input: &InputState, _scene: &mut Scene) -> AppControl {
        if input.key_pressed(Key::Escape) {
            AppControl::Exit
        } else {
            AppControl::Continue
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "basilisk demo".to_string(),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), Demo)
}
