// pickup.rs — Items lying around: weapons, ammo, medipacks, keys and scion pieces

use trx_common::collision::CollisionInfo;
use trx_common::units::*;

use super::{animate_lara_until, lara_ready_to_interact, InteractionLimits};
use crate::lara::state::LaraStateId;
use crate::lara::HandStatus;
use crate::object_state::TriggerState;
use crate::world::World;

/// Frame of the pick-up animation at which the item is in the hand.
const PICKUP_FRAME: Frame = Frame(40);

const LIMITS: InteractionLimits = InteractionLimits::new(
    Position::new(-256, -100, -256),
    Position::new(256, 100, 100),
    Rotation { x: Angle::deg(10), y: Angle::ZERO, z: Angle::ZERO },
);

pub fn is_pickup_type(type_id: u16) -> bool {
    matches!(type_id, 84..=94 | 110..=113 | 129..=132)
}

fn take(w: &mut World, id: u16) -> bool {
    let Some(obj) = w.objects.get_mut(id) else {
        return false;
    };
    let type_id = obj.state.type_id;
    obj.state.trigger_state = TriggerState::Invisible;
    obj.collidable = false;
    if let Some(sk) = obj.skeleton.as_mut() {
        sk.visible = false;
    }
    w.player.add_item(type_id, 1);
    log::debug!("picked up item {} of type {}", id, type_id);
    true
}

fn pick_up(w: &mut World, id: u16) -> bool {
    if w.lara.current_state() == LaraStateId::PickUp {
        if w.lara.local_frame(&w.animations) == PICKUP_FRAME {
            return take(w, id);
        }
        return false;
    }

    let Some(obj) = w.objects.get(id) else {
        return false;
    };
    if !lara_ready_to_interact(w, LaraStateId::Stop) {
        return false;
    }
    // Items face wherever; only the avatar's relative position matters.
    let mut facing = obj.state.clone();
    facing.rotation.y = w.lara.yaw();
    if !LIMITS.can_interact(&w.lara.state, &facing) {
        return false;
    }
    animate_lara_until(w, LaraStateId::PickUp);
    w.lara.set_goal(LaraStateId::Stop);
    w.lara.hand_status = HandStatus::Grabbing;
    false
}

pub fn collide(w: &mut World, id: u16, _coll: &mut CollisionInfo) {
    pick_up(w, id);
}

/// Taking a scion piece ends the level.
pub fn scion_collide(w: &mut World, id: u16, _coll: &mut CollisionInfo) {
    if pick_up(w, id) {
        log::info!("scion piece taken, level finished");
        w.finished = true;
    }
}

/// Consumes a collected pickup for a pick-up trigger.
pub fn trigger_pickup(w: &mut World, id: u16) -> bool {
    let Some(obj) = w.objects.get_mut(id) else {
        return false;
    };
    if obj.state.trigger_state != TriggerState::Invisible {
        return false;
    }
    obj.state.trigger_state = TriggerState::Deactivated;
    true
}
