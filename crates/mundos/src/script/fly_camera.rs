use super::behavior::{Behavior, ScriptContext};
use crate::camera::PITCH_LIMIT;
use crate::input::Key;
use crate::math::Vec3;

/// Free-fly editor camera.
///
/// WASD moves along the camera's front/right, Space/LeftControl along world
/// Y, LeftShift speeds up. R toggles the camera lock; while locked the mouse
/// turns the entity.
#[derive(Debug, Clone, Copy)]
pub struct FlyCamera {
    /// Units per second.
    pub move_speed: f32,
    pub fast_multiplier: f32,
    /// Degrees per second per unit of mouse delta.
    pub mouse_sensitivity: f32,
}

impl FlyCamera {
    pub const KEY: &'static str = "fly_camera";
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            move_speed: 1.0,
            fast_multiplier: 4.0,
            mouse_sensitivity: 45.0,
        }
    }
}

impl Behavior for FlyCamera {
    fn on_update(&mut self, ctx: &mut ScriptContext<'_>) {
        let Some(camera) = ctx.camera() else {
            return;
        };
        let camera = camera.oriented_by(ctx.transform.rotation);
        let dt = ctx.delta_secs();
        let input = ctx.input;

        let mut speed = self.move_speed * dt;
        if input.key_pressed(Key::LeftShift) {
            speed *= self.fast_multiplier;
        }

        let mut step = Vec3::ZERO;
        if input.key_pressed(Key::W) {
            step += camera.front();
        }
        if input.key_pressed(Key::S) {
            step -= camera.front();
        }
        if input.key_pressed(Key::D) {
            step += camera.right();
        }
        if input.key_pressed(Key::A) {
            step -= camera.right();
        }
        if input.key_pressed(Key::Space) {
            step += Vec3::Y;
        }
        if input.key_pressed(Key::LeftControl) {
            step -= Vec3::Y;
        }
        ctx.transform.translation += step * speed;

        if input.key_just_pressed(Key::R) {
            ctx.commands.toggle_camera_lock(ctx.entity);
        }

        if camera.locked {
            let turn = (self.mouse_sensitivity * dt).to_radians();
            let limit = PITCH_LIMIT.to_radians();
            let rotation = &mut ctx.transform.rotation;
            rotation.x = (rotation.x + input.mouse_delta.y * turn).clamp(-limit, limit);
            rotation.y += input.mouse_delta.x * turn;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::components::{Position, Rotation};
    use crate::ecs::{ArchetypeSpec, World};
    use crate::input::InputState;
    use crate::script::ScriptHost;
    use crate::time::Time;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn setup() -> (World, ScriptHost, crate::ecs::Entity) {
        let mut world = World::new();
        let mut host = ScriptHost::default();
        let cam = world.create(ArchetypeSpec::Camera, "Camera", None).unwrap();
        host.attach(&mut world, cam, FlyCamera::KEY).unwrap();
        (world, host, cam)
    }

    fn one_second() -> Time {
        let mut time = Time::new();
        time.advance(Duration::from_secs(1));
        time
    }

    #[test]
    fn w_moves_forward_and_shift_speeds_up() {
        let (mut world, mut host, cam) = setup();
        let mut input = InputState::new();
        input.keys.press(Key::W);
        host.update(&mut world, &input, &one_second()).unwrap();
        let p = world.get::<Position>(cam).unwrap().value;
        assert_relative_eq!(p.z, -1.0, epsilon = 1e-5);

        input.keys.press(Key::LeftShift);
        host.update(&mut world, &input, &one_second()).unwrap();
        let p = world.get::<Position>(cam).unwrap().value;
        assert_relative_eq!(p.z, -5.0, epsilon = 1e-5);
    }

    #[test]
    fn r_toggles_lock_after_the_join() {
        let (mut world, mut host, cam) = setup();
        let mut input = InputState::new();
        input.keys.press(Key::R);
        host.update(&mut world, &input, &one_second()).unwrap();
        assert!(world.get::<Camera>(cam).unwrap().locked);

        // Held, not just pressed: no second toggle.
        input.end_frame();
        host.update(&mut world, &input, &one_second()).unwrap();
        assert!(world.get::<Camera>(cam).unwrap().locked);
    }

    #[test]
    fn mouse_turns_only_while_locked() {
        let (mut world, mut host, cam) = setup();
        let mut input = InputState::new();
        input.mouse_delta.x = 1.0;
        input.mouse_delta.y = 10.0;
        host.update(&mut world, &input, &one_second()).unwrap();
        assert_eq!(world.get::<Rotation>(cam).unwrap().euler, Vec3::ZERO);

        world.get_mut::<Camera>(cam).unwrap().locked = true;
        host.update(&mut world, &input, &one_second()).unwrap();
        let euler = world.get::<Rotation>(cam).unwrap().euler;
        assert_relative_eq!(euler.y, 45f32.to_radians(), epsilon = 1e-5);
        assert_relative_eq!(euler.x, PITCH_LIMIT.to_radians(), epsilon = 1e-5);
    }
}
