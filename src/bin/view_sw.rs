//! view_sw.rs - walk around a small scene drawn by the fixed-point viewport.
//!
//! USAGE:
//! ```bash
//! cargo run --release --bin view_sw -- --width 640 --height 400 --fov 90
//! ```
//!
//! Arrows move/turn, A/D strafe, PageUp/PageDown look up/down, Esc quits.

use clap::Parser;
use glam::{IVec2, IVec3, ivec2, ivec3};
use minifb::{Key, Window, WindowOptions};
use std::time::{Duration, Instant};

use fixraster::{
    math::{ANGLE_2PI, TrigTable},
    renderer::{
        DrawCall, RendererExt, WallTexture,
        software::{Viewport, ViewportConfig},
    },
    world::{Bitmap, Camera, Facing, Panorama, PatchGrid, PositionMatrix, WallSurface},
};

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    /// Horizontal resolution
    #[arg(long, default_value_t = 640)]
    width: usize,

    /// Vertical resolution
    #[arg(long, default_value_t = 400)]
    height: usize,

    /// Horizontal field of view in degrees
    #[arg(long, default_value_t = 90)]
    fov: u32,

    /// Quit after this many frames (0 = run until the window closes)
    #[arg(long, default_value_t = 0)]
    frames: usize,
}

const EYE_HEIGHT: i32 = 1_700;
const ROOM: i32 = 8_000;
const WALL_H: i32 = 3_000;

/*──────────────────────────── scene ───────────────────────────────────*/

struct Scene {
    floor_bmp: Bitmap,
    wall_bmp: Bitmap,
    wall_alt_bmp: Bitmap,
    pillar_bmp: Bitmap,
    canopy_bmp: Bitmap,
    hill_bmp: Bitmap,
    sky: Panorama,
    walls: Vec<WallSurface>,
    pillar: Vec<WallSurface>,
    floor: [IVec2; 4],
    canopy: [IVec2; 4],
    hill: PatchGrid,
}

/// Clockwise-from-above rectangle.
fn rect(min: IVec2, max: IVec2) -> [IVec2; 4] {
    [
        ivec2(max.x, max.y),
        ivec2(max.x, min.y),
        ivec2(min.x, min.y),
        ivec2(min.x, max.y),
    ]
}

/// Walls of a box, facing inward (`inside`) or outward.
fn box_walls(min: IVec2, max: IVec2, height: i32, inside: bool) -> Vec<WallSurface> {
    let r = rect(min, max);
    (0..4)
        .map(|i| {
            let (a, b) = (r[i], r[(i + 1) % 4]);
            let (from, to) = if inside { (a, b) } else { (b, a) };
            WallSurface::new(from.extend(height), to.extend(0))
        })
        .collect()
}

impl Scene {
    fn build() -> anyhow::Result<Self> {
        let hill = PatchGrid::from_fn(
            9,
            9,
            ivec3(-6_500, 1_500, 0),
            ivec2(0, 600),
            ivec2(600, 0),
            |u, v| {
                let (du, dv) = (u as i32 - 4, v as i32 - 4);
                (1_200 - 70 * (du * du + dv * dv)).max(0)
            },
        );
        let sky = Panorama::from_fn(512, 180, |c, r| {
            let phase = c as f64 / 512.0 * std::f64::consts::TAU * 5.0;
            let ridge = (30.0 + phase.sin() * 8.0) as usize;
            if r < ridge {
                140 + (r / 4) as u8
            } else {
                192 + (r * 63 / 180) as u8
            }
        })?;

        Ok(Self {
            floor_bmp: Bitmap::checker(2_000, 2_000, 64, 8, 40, 52)?,
            wall_bmp: Bitmap::checker(2_000, WALL_H, 64, 4, 80, 100)?,
            wall_alt_bmp: Bitmap::checker(2_000, WALL_H, 64, 2, 90, 110)?,
            pillar_bmp: Bitmap::checker(1_000, 1_000, 32, 4, 150, 170)?,
            canopy_bmp: Bitmap::checker(1_000, 1_000, 32, 2, 20, 30)?,
            hill_bmp: Bitmap::checker(1_000, 1_000, 32, 4, 145, 160)?,
            sky,
            walls: box_walls(ivec2(-ROOM, -ROOM), ivec2(ROOM, ROOM), WALL_H, true),
            pillar: box_walls(ivec2(3_000, 2_000), ivec2(4_000, 3_000), 2_500, false),
            floor: rect(ivec2(-ROOM, -ROOM), ivec2(ROOM, ROOM)),
            canopy: rect(ivec2(1_000, -4_000), ivec2(5_000, -1_000)),
            hill,
        })
    }

    fn draw_calls(&self) -> Vec<DrawCall<'_>> {
        let mut calls = vec![DrawCall::Background(&self.sky)];
        for &wall in &self.walls {
            calls.push(DrawCall::Wall {
                wall,
                texture: WallTexture::serial(&self.wall_bmp, &self.wall_alt_bmp, 3, 2),
            });
        }
        for &wall in &self.pillar {
            calls.push(DrawCall::Wall {
                wall,
                texture: WallTexture::single(&self.pillar_bmp),
            });
        }
        calls.push(DrawCall::HorizontalSurface {
            ring: &self.floor,
            level: 0,
            facing: Facing::Up,
            bitmap: &self.floor_bmp,
        });
        calls.push(DrawCall::HorizontalSurface {
            ring: &self.canopy,
            level: 2_600,
            facing: Facing::Down,
            bitmap: &self.canopy_bmp,
        });
        calls.push(DrawCall::Patch {
            patch: &self.hill,
            matrix: PositionMatrix::default(),
            bitmap: &self.hill_bmp,
        });
        calls
    }
}

/*──────────────────────────── presentation ────────────────────────────*/

/// 4 ramps of 64 shades: gray, warm, green, sky blue (0x00RRGGBB).
fn palette() -> [u32; 256] {
    let mut pal = [0u32; 256];
    for (i, p) in pal.iter_mut().enumerate() {
        let s = ((i & 63) * 4 + 3) as u32;
        let (r, g, b) = match i >> 6 {
            0 => (s, s, s),
            1 => (s, s * 3 / 4, s / 2),
            2 => (s / 2, s, s / 3),
            _ => (s / 2, s * 3 / 4, s.max(160)),
        };
        *p = (r << 16) | (g << 8) | b;
    }
    pal
}

fn steer(win: &Window, camera: &mut Camera, trig: &TrigTable) {
    let run = win.is_key_down(Key::LeftShift) || win.is_key_down(Key::RightShift);
    let speed = if run { 240 } else { 120 };
    let (mut forward, mut side) = (0, 0);
    if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
        forward += speed;
    }
    if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
        forward -= speed;
    }
    if win.is_key_down(Key::A) {
        side -= speed;
    }
    if win.is_key_down(Key::D) {
        side += speed;
    }
    if win.is_key_down(Key::Left) {
        camera.turn(24);
    }
    if win.is_key_down(Key::Right) {
        camera.turn(-24);
    }
    if win.is_key_down(Key::PageUp) {
        camera.scroll += 4;
    }
    if win.is_key_down(Key::PageDown) {
        camera.scroll -= 4;
    }
    camera.step(trig, forward, side);
    let limit = ROOM - 500;
    camera.pos.x = camera.pos.x.clamp(-limit, limit);
    camera.pos.y = camera.pos.y.clamp(-limit, limit);
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let fov = opts.fov.clamp(10, 170) as i32 * ANGLE_2PI / 360;
    let mut viewport = Viewport::new(ViewportConfig::with_fov(opts.width, opts.height, fov, 500))?;
    let scene = Scene::build()?;
    let pal = palette();
    let mut rgb = vec![0u32; opts.width * opts.height];

    let mut camera = Camera::new(IVec3::new(-5_000, 0, EYE_HEIGHT), 0);

    let mut win = Window::new(
        "fixraster software viewport",
        opts.width,
        opts.height,
        WindowOptions::default(),
    )?;
    win.set_target_fps(35);

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO;
    let mut acc_frames = 0usize;
    let mut last_print = Instant::now();
    let mut frame_no = 0usize;

    while win.is_open() && !win.is_key_down(Key::Escape) {
        if opts.frames != 0 && frame_no >= opts.frames {
            break;
        }
        frame_no += 1;
        let t0 = Instant::now();

        steer(&win, &mut camera, viewport.trig());
        viewport.set_camera(camera);

        let calls = scene.draw_calls();
        let mut shown = Ok(());
        viewport.draw_frame(&calls, |color, _depth, w, h| {
            acc_time += t0.elapsed();
            acc_frames += 1;
            for (dst, &src) in rgb.iter_mut().zip(color) {
                *dst = pal[src as usize];
            }
            shown = win.update_with_buffer(&rgb, w, h);
        });
        shown?;

        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames.max(1) as f64;
            let fps = 1000.0 / avg_ms;
            println!("avg render: {:.2} ms  ({:.1} FPS)", avg_ms, fps);
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}
