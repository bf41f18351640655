//! Frame Loop: drive a runtime with scripted input.
//!
//! There is no window: a fake input sequence holds W, taps R to lock the
//! camera, then moves the mouse. A sink prints what a renderer would get.
//! With the `diagnostics` feature the last frame is dumped as JSON.
//!
//! Run with: `cargo run -p mundos --example frame_loop`

use std::time::Duration;

use mundos::prelude::*;

struct PrintSink {
    draws: usize,
}

impl RenderSink for PrintSink {
    fn begin_frame(&mut self, camera: Option<&CameraView>) {
        self.draws = 0;
        if let Some(camera) = camera {
            log::debug!("eye at {:?}", camera.position);
        }
    }

    fn submit(&mut self, draw: DrawCall) {
        self.draws += 1;
        log::trace!("mesh {} with shader {}", draw.mesh_index, draw.shader_index);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "diagnostics")]
    mundos::diag::init_logger();
    #[cfg(not(feature = "diagnostics"))]
    env_logger::init();

    let mut rt = Runtime::new(EngineConfig {
        worker_threads: Some(2),
        ..EngineConfig::default()
    })?;

    for i in 0..8 {
        let cube = rt.world.create(ArchetypeSpec::Model, &format!("Cube {i}"), None)?;
        rt.world.set(cube, Position::new(i as f32 * 2.0, 0.0, -5.0))?;
    }
    let camera = rt.world.create(ArchetypeSpec::Camera, "Camera", None)?;
    rt.scripts.attach(&mut rt.world, camera, FlyCamera::KEY)?;
    rt.world.set_active_camera(Some(camera))?;

    let mut input = InputState::new();
    let mut sink = PrintSink { draws: 0 };
    let mut last = FrameReport::default();
    for frame in 0..120 {
        match frame {
            0 => input.keys.press(Key::W),
            40 => input.keys.press(Key::R),
            60 => input.keys.release(Key::W),
            _ => {}
        }
        if frame >= 60 {
            input.move_cursor(frame as f32, 0.0);
        }
        last = rt.frame(&input, Duration::from_millis(16), &mut sink)?;
        input.end_frame();
    }

    let position = rt.world.get::<Position>(camera)?.value;
    let rotation = rt.world.get::<Rotation>(camera)?.euler;
    println!(
        "camera at {position:?}, yaw {:.1}°, locked {}",
        rotation.y.to_degrees(),
        rt.world.get::<Camera>(camera)?.locked
    );
    println!("last frame: {} draws, scripts took {:.1} µs", sink.draws, last.script_us);

    #[cfg(feature = "diagnostics")]
    println!("{}", mundos::diag::snapshot_json(&mut rt.world, &rt.time, Some(&last), &[])?);
    Ok(())
}
