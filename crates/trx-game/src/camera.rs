// camera.rs — Camera controller: chase camera, fixed overrides, look-at targets
//
// State handlers adjust the camera every frame (modifier, rotation around
// the avatar, distance); `update` consumes those requests and then resets
// them to the defaults, so a handler that says nothing gets a plain chase
// camera.

use rand::Rng;
use serde::{Deserialize, Serialize};
use trx_common::floordata::{CameraParameters, CommandOpcode, CommandSequence};
use trx_common::level::CameraSink;
use trx_common::units::*;

pub const DEFAULT_CAMERA_DISTANCE: Length = Length(1536);
pub const DEFAULT_CAMERA_ELEVATION: Angle = Angle::deg(-10);
const BOUNCE_RECOVERY: Length = Length(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraMode {
    #[default]
    Chase,
    Fixed,
    Look,
    Combat,
    Heavy,
    FreeLook,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraModifier {
    #[default]
    None,
    FollowCenter,
    AllowSteepSlants,
    Chase,
}

/// Per fixed camera: whether its oneshot switch has been used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedCameraFlags {
    pub oneshot_used: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraController {
    pub mode: CameraMode,
    pub modifier: CameraModifier,
    /// `x` is the elevation, `y` the angle around the avatar.
    pub rotation_around_lara: Rotation,
    pub distance: Length,
    /// Negative values shake, positive values jolt once.
    pub bounce: Length,
    pub fixed_camera: Option<usize>,
    pub last_fixed_camera: Option<usize>,
    pub fixed_timeout: RenderFrame,
    pub smoothness: u8,
    pub look_at: Option<u16>,
    pub position: Position,
    pub target: Position,
    /// Written to the savegame under its own key.
    #[serde(skip)]
    pub fixed_flags: Vec<FixedCameraFlags>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CameraController {
    pub fn new(fixed_camera_count: usize) -> Self {
        Self {
            mode: CameraMode::Chase,
            modifier: CameraModifier::None,
            rotation_around_lara: Rotation { x: DEFAULT_CAMERA_ELEVATION, ..Default::default() },
            distance: DEFAULT_CAMERA_DISTANCE,
            bounce: Length(0),
            fixed_camera: None,
            last_fixed_camera: None,
            fixed_timeout: RenderFrame(0),
            smoothness: 0,
            look_at: None,
            position: Position::ORIGIN,
            target: Position::ORIGIN,
            fixed_flags: vec![FixedCameraFlags::default(); fixed_camera_count],
        }
    }

    pub fn set_modifier(&mut self, modifier: CameraModifier) {
        self.modifier = modifier;
    }

    pub fn set_rotation_around_lara(&mut self, x: Angle, y: Angle) {
        self.rotation_around_lara.x = x;
        self.rotation_around_lara.y = y;
    }

    pub fn set_rotation_around_lara_x(&mut self, x: Angle) {
        self.rotation_around_lara.x = x;
    }

    pub fn set_rotation_around_lara_y(&mut self, y: Angle) {
        self.rotation_around_lara.y = y;
    }

    pub fn set_distance(&mut self, d: Length) {
        self.distance = d;
    }

    pub fn set_bounce(&mut self, b: Length) {
        self.bounce = b;
    }

    pub fn set_mode(&mut self, mode: CameraMode) {
        self.mode = mode;
    }

    pub fn set_look_at(&mut self, object_id: u16) {
        if matches!(self.mode, CameraMode::Look | CameraMode::Combat) {
            return;
        }
        self.look_at = Some(object_id);
    }

    /// First look at a command sequence before its condition is tested.
    /// A chase-camera look-at target that the sequence no longer names is
    /// dropped. Returns the usable fixed cameras it names.
    pub fn refresh_from_sequence(&mut self, seq: &CommandSequence) -> Vec<usize> {
        let mut names_target = false;
        let mut cameras = Vec::new();
        for cmd in &seq.commands {
            let c = cmd.command();
            match c.opcode {
                CommandOpcode::SwitchCamera => {
                    let idx = c.parameter as usize;
                    if self.fixed_flags.get(idx).is_some_and(|f| !f.oneshot_used) {
                        cameras.push(idx);
                    }
                }
                CommandOpcode::LookAt => names_target = true,
                _ => {}
            }
        }
        if !names_target && self.mode == CameraMode::Chase {
            self.look_at = None;
        }
        cameras
    }

    /// `SwitchCamera` command. `switch_is_off` suppresses timed cameras of
    /// a switch that has just been turned back.
    pub fn switch_camera(&mut self, idx: usize, params: &CameraParameters, from_heavy: bool, switch_is_off: bool) {
        let Some(flags) = self.fixed_flags.get_mut(idx) else {
            log::warn!("fixed camera {} out of range", idx);
            return;
        };
        if flags.oneshot_used {
            return;
        }
        if matches!(self.mode, CameraMode::Look | CameraMode::Combat) {
            return;
        }
        if switch_is_off && params.timeout > 0 {
            return;
        }
        if self.fixed_camera == Some(idx) && self.mode != CameraMode::Chase {
            return;
        }
        if params.oneshot {
            flags.oneshot_used = true;
        }
        self.fixed_camera = Some(idx);
        self.fixed_timeout = RenderFrame(params.timeout as i32 * RENDER_FRAME_RATE);
        self.smoothness = params.smoothness;
        self.mode = if from_heavy { CameraMode::Heavy } else { CameraMode::Fixed };
        log::debug!("switched to fixed camera {} for {}", idx, self.fixed_timeout);
    }

    /// Places the camera for this render frame and resets the per-frame
    /// requests of the state handlers.
    pub fn update<R: Rng>(&mut self, rng: &mut R, lara_position: Position, lara_yaw: Angle, sinks: &[CameraSink]) {
        self.target = match self.modifier {
            CameraModifier::FollowCenter => lara_position - Position::new(0, 384, 0),
            _ => lara_position - Position::new(0, 512, 0),
        };

        match (self.mode, self.fixed_camera.and_then(|i| sinks.get(i))) {
            (CameraMode::Fixed | CameraMode::Heavy, Some(sink)) => {
                self.position = sink.position;
                if self.fixed_timeout > RenderFrame(0) {
                    self.fixed_timeout -= RenderFrame(1);
                    if self.fixed_timeout == RenderFrame(0) {
                        self.last_fixed_camera = self.fixed_camera.take();
                        self.mode = CameraMode::Chase;
                    }
                }
            }
            _ => {
                let rot = Rotation {
                    x: self.rotation_around_lara.x,
                    y: lara_yaw + self.rotation_around_lara.y,
                    z: Angle::ZERO,
                };
                self.position = self.target - yaw_pitch(self.distance, &rot);
                if self.mode != CameraMode::Chase && self.mode != CameraMode::FreeLook {
                    self.mode = CameraMode::Chase;
                }
            }
        }

        if self.bounce < Length(0) {
            let shake = self.bounce.get().abs();
            self.position.y += Length(rng.gen_range(-shake..=shake));
            self.bounce += BOUNCE_RECOVERY;
            if self.bounce > Length(0) {
                self.bounce = Length(0);
            }
        } else if self.bounce > Length(0) {
            self.position.y += self.bounce;
            self.bounce = Length(0);
        }

        self.modifier = CameraModifier::None;
        self.rotation_around_lara = Rotation { x: DEFAULT_CAMERA_ELEVATION, ..Default::default() };
        self.distance = DEFAULT_CAMERA_DISTANCE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sinks() -> Vec<CameraSink> {
        vec![CameraSink { position: Position::new(100, -200, 300), ..Default::default() }]
    }

    #[test]
    fn test_fixed_camera_times_out() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cam = CameraController::new(1);
        let params = CameraParameters { timeout: 1, ..Default::default() };
        cam.switch_camera(0, &params, false, false);
        assert_eq!(cam.mode, CameraMode::Fixed);
        for _ in 0..59 {
            cam.update(&mut rng, Position::ORIGIN, Angle::ZERO, &sinks());
        }
        assert_eq!(cam.position, Position::new(100, -200, 300));
        assert_eq!(cam.mode, CameraMode::Fixed);
        cam.update(&mut rng, Position::ORIGIN, Angle::ZERO, &sinks());
        assert_eq!(cam.mode, CameraMode::Chase);
        assert_eq!(cam.last_fixed_camera, Some(0));
    }

    #[test]
    fn test_oneshot_camera_used_once() {
        let mut cam = CameraController::new(1);
        let params = CameraParameters { timeout: 0, oneshot: true, ..Default::default() };
        cam.switch_camera(0, &params, false, false);
        assert!(cam.fixed_flags[0].oneshot_used);
        cam.mode = CameraMode::Chase;
        cam.fixed_camera = None;
        cam.switch_camera(0, &params, false, false);
        assert_eq!(cam.fixed_camera, None);
    }

    #[test]
    fn test_handler_requests_reset_each_frame() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cam = CameraController::new(0);
        cam.set_distance(Length(1024));
        cam.set_rotation_around_lara(Angle::deg(-25), Angle::deg(35));
        cam.set_modifier(CameraModifier::FollowCenter);
        cam.update(&mut rng, Position::ORIGIN, Angle::ZERO, &[]);
        assert_eq!(cam.distance, DEFAULT_CAMERA_DISTANCE);
        assert_eq!(cam.modifier, CameraModifier::None);
        assert_eq!(cam.rotation_around_lara.y, Angle::ZERO);
    }

    #[test]
    fn test_bounce_recovers() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cam = CameraController::new(0);
        cam.set_bounce(Length(-10));
        cam.update(&mut rng, Position::ORIGIN, Angle::ZERO, &[]);
        assert_eq!(cam.bounce, Length(-5));
        cam.update(&mut rng, Position::ORIGIN, Angle::ZERO, &[]);
        assert_eq!(cam.bounce, Length(0));
    }
}
