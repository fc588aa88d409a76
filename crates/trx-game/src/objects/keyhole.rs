// keyhole.rs — Keyholes and puzzle holes consuming inventory items

use trx_common::collision::CollisionInfo;
use trx_common::units::*;

use super::{animate_lara_until, lara_ready_to_interact, InteractionLimits, ObjectKind};
use crate::lara::state::LaraStateId;
use crate::lara::HandStatus;
use crate::object_state::TriggerState;
use crate::world::World;

const LIMITS: InteractionLimits = InteractionLimits::new(
    Position::new(-200, 0, 312),
    Position::new(200, 0, 512),
    Rotation { x: Angle::deg(10), y: Angle::deg(30), z: Angle::deg(10) },
);

/// Puzzle holes swap to their "done" model once filled.
const PUZZLE_DONE_OFFSET: u16 = 4;

fn use_item(w: &mut World, id: u16, needed: LaraStateId) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    if obj.state.trigger_state != TriggerState::Inactive
        || !lara_ready_to_interact(w, LaraStateId::Stop)
        || !LIMITS.can_interact(&w.lara.state, &obj.state)
    {
        return;
    }
    let item = match obj.kind {
        ObjectKind::Keyhole { item } | ObjectKind::PuzzleHole { item } => item,
        _ => return,
    };
    let yaw = obj.state.rotation.y;
    if !w.player.take_item(item) {
        log::debug!("avatar lacks item {} for object {}", item, id);
        return;
    }

    log::debug!("item {} used on object {}", item, id);
    w.lara.state.rotation.y = yaw;
    animate_lara_until(w, needed);
    w.lara.set_goal(LaraStateId::Stop);
    w.lara.hand_status = HandStatus::Grabbing;
    if let Some(obj) = w.objects.get_mut(id) {
        obj.state.trigger_state = TriggerState::Active;
        if needed == LaraStateId::InsertPuzzle {
            obj.state.type_id += PUZZLE_DONE_OFFSET;
        }
    }
}

pub fn keyhole_collide(w: &mut World, id: u16, _coll: &mut CollisionInfo) {
    use_item(w, id, LaraStateId::InsertKey);
}

pub fn puzzle_hole_collide(w: &mut World, id: u16, _coll: &mut CollisionInfo) {
    use_item(w, id, LaraStateId::InsertPuzzle);
}

/// Consumes a used keyhole for a key trigger. Returns false until an item
/// went in.
pub fn trigger_key(w: &mut World, id: u16) -> bool {
    let Some(obj) = w.objects.get_mut(id) else {
        return false;
    };
    if obj.state.trigger_state != TriggerState::Active {
        return false;
    }
    obj.state.trigger_state = TriggerState::Deactivated;
    true
}
