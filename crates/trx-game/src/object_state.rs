// object_state.rs — State shared by every world object

use serde::{Deserialize, Serialize};
use trx_common::floordata::{ActivationState, SequenceCondition};
use trx_common::location::Location;
use trx_common::units::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerState {
    #[default]
    Inactive,
    Active,
    Deactivated,
    Invisible,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectState {
    pub type_id: u16,
    pub location: Location,
    pub rotation: Rotation,
    pub speed: Speed,
    pub fallspeed: Speed,
    pub current_anim_state: u16,
    pub goal_anim_state: u16,
    pub required_anim_state: Option<u16>,
    pub trigger_state: TriggerState,
    pub activation_state: ActivationState,
    /// Activation timeout; zero means none, negative means expired.
    pub timer: RenderFrame,
    /// Cached floor height under the object.
    pub floor: Length,
    /// Bones of this object that touched the avatar this frame.
    pub touch_bits: u32,
    pub is_hit: bool,
    pub falling: bool,
    pub health: Health,
    pub shade: i16,
    pub box_index: Option<usize>,
    /// Part of the per-frame update list.
    pub is_active: bool,
}

impl ObjectState {
    pub fn new(type_id: u16, location: Location, rotation: Rotation) -> Self {
        Self {
            type_id,
            location,
            rotation,
            health: Health(1),
            ..Default::default()
        }
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.location.position
    }

    /// Folds a trigger request into this object. Returns true when the
    /// object is fully activated afterwards.
    pub fn apply_activation(&mut self, request: &ActivationState, condition: SequenceCondition) -> bool {
        if self.activation_state.oneshot {
            return false;
        }
        self.timer = RenderFrame(request.timeout as i32 * RENDER_FRAME_RATE);
        self.activation_state.apply(request, condition);
        if !self.activation_state.is_fully_activated() {
            return false;
        }
        if request.oneshot {
            self.activation_state.oneshot = true;
        }
        true
    }

    /// Ticks the activation timeout by one render frame. Returns whether
    /// the object is still considered triggered.
    pub fn update_activation_timeout(&mut self) -> bool {
        if !self.activation_state.is_fully_activated() {
            return false;
        }
        if self.timer == RenderFrame(0) {
            return true;
        }
        if self.timer < RenderFrame(0) {
            return false;
        }
        self.timer -= RenderFrame(1);
        if self.timer <= RenderFrame(0) {
            self.timer = RenderFrame(-1);
        }
        true
    }

    /// The object has been triggered and is currently on.
    pub fn triggered(&self) -> bool {
        self.activation_state.is_fully_activated() && self.timer >= RenderFrame(0)
    }

    /// Yaw-relative offset in world space.
    pub fn local_to_world(&self, offset: &Position) -> Position {
        rotate_y(offset, self.rotation.y)
    }

    pub fn move_local(&mut self, offset: &Position) {
        let d = self.local_to_world(offset);
        self.location.move_by(d);
    }
}
