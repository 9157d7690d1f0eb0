//! Host controls to engine controller state

use sm64_common::{space, CameraState, HostInput};
use sm64_engine::MarioInputs;

/// Input translation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputMapping {
    /// Negate the stick once more (wing-cap flight)
    pub invert_stick: bool,
}

/// Build the engine inputs for one host frame
pub fn translate_input(input: &HostInput, camera: &CameraState, mapping: InputMapping) -> MarioInputs {
    let mut stick = space::to_engine_stick(input.stick);
    if mapping.invert_stick {
        stick.x = -stick.x;
        stick.y = -stick.y;
    }
    let look = space::camera_look(camera);

    MarioInputs {
        cam_look_x: look.x,
        cam_look_z: look.y,
        stick_x: stick.x,
        stick_y: stick.y,
        button_a: input.jump as u8,
        button_b: input.dash as u8,
        button_z: input.climb as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm64_common::{Vec2, Vec3};

    #[test]
    fn test_buttons_and_stick() {
        let input = HostInput {
            stick: Vec2::new(0.25, 1.0),
            jump: true,
            dash: false,
            climb: true,
        };
        let inputs = translate_input(&input, &CameraState::default(), InputMapping::default());
        assert_eq!((inputs.stick_x, inputs.stick_y), (-0.25, -1.0));
        assert_eq!((inputs.button_a, inputs.button_b, inputs.button_z), (1, 0, 1));
    }

    #[test]
    fn test_flight_inverts_stick() {
        let input = HostInput {
            stick: Vec2::new(0.25, 1.0),
            ..Default::default()
        };
        let mapping = InputMapping { invert_stick: true };
        let inputs = translate_input(&input, &CameraState::default(), mapping);
        assert_eq!((inputs.stick_x, inputs.stick_y), (0.25, 1.0));
    }

    #[test]
    fn test_camera_reduced_to_ground_plane() {
        let camera = CameraState::new(Vec3::new(0.0, -10.0, 30.0), Vec3::new(0.0, 0.0, 0.0));
        let inputs = translate_input(&HostInput::default(), &camera, InputMapping::default());
        // Camera behind the target along host -Y sits at engine +Z
        assert_eq!(inputs.cam_look_x, 0.0);
        assert_eq!(inputs.cam_look_z, 10.0);
    }
}
