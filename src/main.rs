//! Headless demo: builds a small arrange view, drives it with synthetic input
//! and an animated playhead, then writes the last frame to a PNG.
//!
//! Usage: `agl [--gpu] [output.png]`. `--gpu` renders through wgpu when an
//! adapter is available. Settings come from `agl.toml` and `AGL_*`
//! environment variables.

use std::time::Duration;

use agl_config::AglConfig;
use agl_core::{
    Color, Rect, SoftwareContext, SoftwareHandle, TargetAllocator, WgpuContext, WgpuHandle,
};
use agl_scene::behaviour::{Follow, Hover, Key, KeyBinding, Selectable};
use agl_scene::{Actor, Animatable, FnDelegate, InputEvent, ManualClock, Observable, Scene};
use anyhow::{Context, Result};
use winit::keyboard::{KeyCode, ModifiersState};

const RULER_HEIGHT: f32 = 20.0;
const TRACK_HEIGHT: f32 = 48.0;
const TRACK_GAP: f32 = 4.0;
const LANE: u32 = 0x1c1f24ff;
const RULER: u32 = 0x3a3d42ff;
const PLAYHEAD: u32 = 0xe8e8e8ff;
const HIGHLIGHT: u32 = 0xffffff30;
const TRACK_COLOURS: [u32; 3] = [0x3a6ea5ff, 0x5a9e6fff, 0xa5673aff];
const SELECTED_COLOUR: u32 = 0xf0c040ff;

/// Where the finished frame is read back from.
enum Frames {
    Software(SoftwareHandle),
    Gpu(WgpuHandle),
}

impl Frames {
    fn save_png(&self, path: &str) -> agl_core::Result<()> {
        match self {
            Frames::Software(h) => h.save_png(path),
            Frames::Gpu(h) => h.save_png(path),
        }
    }

    fn presented(&self) -> usize {
        match self {
            Frames::Software(h) => h.frames_presented(),
            Frames::Gpu(h) => h.frames_presented(),
        }
    }
}

/// Paints a synthetic waveform in the actor's colour over a dark lane.
fn waveform() -> FnDelegate {
    FnDelegate::new().on_paint(|cx, painter| {
        let r = cx.region();
        painter.fill_rect(Rect::new(0.0, 0.0, r.width(), r.height()), Color::from_rgba_u32(LANE));
        let colour = Color::from_rgba_u32(cx.colour());
        let mid = r.height() / 2.0;
        let mut x = 0.0f32;
        while x < r.width() {
            let amp = ((x * 0.07).sin() * (x * 0.013).cos()).abs() * (mid - 2.0);
            painter.fill_rect(Rect::new(x, mid - amp, 2.0, (amp * 2.0).max(1.0)), colour);
            x += 3.0;
        }
    })
}

fn main() -> Result<()> {
    let _ = env_logger::try_init();
    let use_gpu = std::env::args().any(|a| a == "--gpu");
    let output = std::env::args()
        .skip(1)
        .find(|a| !a.starts_with("--"))
        .unwrap_or_else(|| "agl-demo.png".to_string());

    let config = AglConfig::load();
    let clock = ManualClock::new();
    let gpu = if use_gpu {
        WgpuContext::headless()
            .map_err(|e| log::warn!("falling back to software rendering: {e}"))
            .ok()
    } else {
        None
    };
    let (mut scene, frames) = match gpu {
        Some(context) => {
            let frames = Frames::Gpu(context.handle());
            (Scene::with_config(context, &config, clock.clone()), frames)
        }
        None => {
            let context = SoftwareContext::new();
            let frames = Frames::Software(context.handle());
            (Scene::with_config(context, &config, clock.clone()), frames)
        }
    };
    let root = scene.root();
    let width = config.window.width as f32;

    scene.add(root, Actor::fill(RULER).name("ruler").at(0.0, 0.0, width, RULER_HEIGHT))?;

    let selection = Observable::new(0, 0, TRACK_COLOURS.len() as i32 - 1);
    let mut tracks = Vec::new();
    for (i, &base) in TRACK_COLOURS.iter().enumerate() {
        let y = RULER_HEIGHT + TRACK_GAP + i as f32 * (TRACK_HEIGHT + TRACK_GAP);
        let select = Selectable::new(selection.clone(), i as i32).on_select(move |cx, _, is_self| {
            let id = cx.id();
            cx.scene.set_colour(id, if is_self { SELECTED_COLOUR } else { base });
        });
        let track = Actor::new(waveform())
            .name(format!("track{i}"))
            .colour(base)
            .at(0.0, y, width, y + TRACK_HEIGHT)
            .cache(true)
            .behaviour(Hover::new())
            .behaviour(select);
        tracks.push(scene.add(root, track)?);
    }

    // Marker over the second track. Disabled, so the pointer passes through.
    let marker = Actor::fill(HIGHLIGHT)
        .name("marker")
        .z(10)
        .disabled(true)
        .behaviour(Follow::new(tracks[1]).mirror_size(true));
    scene.add(root, marker)?;

    let playhead = scene.add(
        root,
        Actor::fill(PLAYHEAD)
            .name("playhead")
            .at(0.0, 0.0, 2.0, config.window.height as f32)
            .z(20),
    )?;

    let sel = selection.clone();
    scene.add_behaviour(
        root,
        Key::new([KeyBinding::new(KeyCode::ArrowDown, move |_, _, _| {
            sel.set(sel.get() + 1);
        })]),
    );

    scene.draw()?;

    // Click the second track, then move the selection down with the keyboard.
    let y = RULER_HEIGHT + TRACK_GAP + TRACK_HEIGHT + TRACK_GAP + TRACK_HEIGHT / 2.0;
    scene.dispatch(&InputEvent::motion(40.0, y));
    scene.dispatch(&InputEvent::press(40.0, y));
    scene.dispatch(&InputEvent::release(40.0, y));
    scene.run_idle();
    scene.dispatch(&InputEvent::key(KeyCode::ArrowDown, ModifiersState::empty()));
    scene.run_idle();
    log::info!("selected track {}", selection.get());

    let x = Animatable::new(0.0f32);
    x.set_target(width * 0.6);
    scene.animate(playhead, &[x.clone()], || log::info!("playhead arrived"));

    let step = scene.animations().frame_interval();
    let mut elapsed = Duration::ZERO;
    while !scene.animations().is_empty() {
        clock.advance(step);
        elapsed += step;
        scene.tick();
        let at = x.get_f32();
        if let Some(region) = scene.region(playhead) {
            scene.set_region(playhead, region.moved_to(at, 0.0));
        }
        scene.run_idle();
        if scene.needs_redraw() {
            scene.draw()?;
        }
    }
    // With animations disabled the playhead jumped straight to its target.
    if let Some(region) = scene.region(playhead) {
        scene.set_region(playhead, region.moved_to(x.get_f32(), 0.0));
    }
    if scene.needs_redraw() {
        scene.draw()?;
    }

    log::debug!("scene:\n{}", scene.tree_string());
    frames
        .save_png(&output)
        .with_context(|| format!("writing {output}"))?;
    log::info!(
        "wrote {output}: {} frames over {:?}, {} cache targets",
        frames.presented(),
        elapsed,
        scene.context().live_targets()
    );
    Ok(())
}
