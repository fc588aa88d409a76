// block.rs — Pushable blocks
//
// A resting block raises the floor of its sector by its height. While it
// moves the sector is restored, and the floor is raised again wherever the
// block comes to rest.

use trx_common::collision::CollisionInfo;
use trx_common::location::Location;
use trx_common::units::*;

use super::{alter_floor_height, ceiling_at, floor_at, heavy_trigger, lara_ready_to_interact, push_lara, InteractionLimits, ObjectKind};
use crate::lara::handlers::common::{action, backward, forward};
use crate::lara::state::LaraStateId;
use crate::lara::HandStatus;
use crate::object_state::TriggerState;
use crate::world::World;

const BLOCK_HEIGHT: Length = Length(1024);
const TALL_BLOCK_HEIGHT: Length = Length(2048);
const MOVE_STEP: Length = Length(16);

const GRAB_LIMITS: InteractionLimits = InteractionLimits::new(
    Position::new(-300, 0, -692),
    Position::new(300, 0, -512),
    Rotation { x: Angle::deg(10), y: Angle::deg(30), z: Angle::deg(10) },
);

fn height(w: &World, id: u16) -> Length {
    match w.objects.get(id).map(|o| &o.kind) {
        Some(ObjectKind::Block { tall: true, .. }) => TALL_BLOCK_HEIGHT,
        _ => BLOCK_HEIGHT,
    }
}

fn block_box(h: Length) -> BoundingBox {
    BoundingBox::new(Position::new(-512, -h.get(), -512), Position::new(512, 0, 512))
}

/// Raises (`on`) or restores the floor under the block.
pub fn patch(w: &mut World, id: u16, on: bool) {
    let h = height(w, id);
    let Some(loc) = w.objects.get(id).map(|o| o.state.location) else {
        return;
    };
    alter_floor_height(&mut w.rooms, &loc, if on { -h } else { h });
}

pub fn init(w: &mut World, id: u16) {
    let visible = w.objects.get(id).is_some_and(|o| o.state.trigger_state != TriggerState::Invisible);
    if visible {
        patch(w, id, true);
    }
}

fn target_mut(w: &mut World, id: u16) -> Option<&mut Option<Position>> {
    match w.objects.get_mut(id).map(|o| &mut o.kind) {
        Some(ObjectKind::Block { target, .. }) => Some(target),
        _ => None,
    }
}

/// Block moving or resting.
fn is_moving(w: &World, id: u16) -> bool {
    matches!(w.objects.get(id).map(|o| &o.kind), Some(ObjectKind::Block { target: Some(_), .. }))
}

/// The sector `dir` sectors away from the block along its facing is free
/// for the block to slide into.
fn sector_free(w: &World, id: u16, dir: i32) -> bool {
    let Some(obj) = w.objects.get(id) else {
        return false;
    };
    let base = obj.state.location;
    let dest = base.moved(pitch(SECTOR_SIZE * dir, obj.state.rotation.y));
    let mut probe = dest;
    probe.update_room(&w.rooms);
    if floor_at(w, &probe) != base.position.y {
        return false;
    }
    let top = Location::new(probe.room, Position { y: base.position.y - height(w, id), ..dest.position });
    ceiling_at(w, &top) <= top.position.y
}

pub fn test_push(w: &World, id: u16) -> bool {
    sector_free(w, id, 1)
}

/// Pulling needs both the block's new sector and the one the avatar backs
/// into.
pub fn test_pull(w: &World, id: u16) -> bool {
    if !sector_free(w, id, -1) {
        return false;
    }
    let Some(obj) = w.objects.get(id) else {
        return false;
    };
    let behind = obj.state.location.moved(pitch(SECTOR_SIZE * -2, obj.state.rotation.y));
    let mut probe = behind;
    probe.update_room(&w.rooms);
    let standing = Location::new(probe.room, Position { y: obj.position().y - LARA_WALK_HEIGHT, ..behind.position });
    floor_at(w, &probe) == obj.position().y && ceiling_at(w, &standing) <= standing.position.y
}

fn start_move(w: &mut World, id: u16, dir: i32) {
    patch(w, id, false);
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let dest = obj.position() + pitch(SECTOR_SIZE * dir, obj.state.rotation.y);
    obj.state.trigger_state = TriggerState::Active;
    obj.state.is_active = true;
    log::debug!("block {} starts moving to {}", id, dest);
    if let Some(target) = target_mut(w, id) {
        *target = Some(dest);
    }
}

pub fn collide(w: &mut World, id: u16, coll: &mut CollisionInfo) {
    if is_moving(w, id) {
        return;
    }

    if w.lara.current_state() == LaraStateId::PushableGrab && w.lara.goal_state() == LaraStateId::PushableGrab {
        if !action(w) {
            return;
        }
        let facing = w.objects.get(id).is_some_and(|o| GRAB_LIMITS.can_interact(&w.lara.state, &o.state));
        if !facing {
            return;
        }
        if forward(w) && test_push(w, id) {
            w.lara.set_goal(LaraStateId::PushablePush);
            start_move(w, id, 1);
        } else if backward(w) && test_pull(w, id) {
            w.lara.set_goal(LaraStateId::PushablePull);
            start_move(w, id, -1);
        }
        return;
    }

    if lara_ready_to_interact(w, LaraStateId::Stop) {
        if let Some(axis) = axis_from_angle(w.lara.yaw(), Angle::deg(45)) {
            let yaw = snap_rotation(axis);
            let previous = w.objects.get(id).map(|o| o.state.rotation.y);
            if let Some(obj) = w.objects.get_mut(id) {
                obj.state.rotation.y = yaw;
            }
            let can_grab = w.objects.get(id).is_some_and(|o| GRAB_LIMITS.can_interact(&w.lara.state, &o.state));
            if can_grab {
                w.lara.state.rotation.y = yaw;
                w.lara.set_goal(LaraStateId::PushableGrab);
                w.lara.hand_status = HandStatus::Grabbing;
                return;
            }
            if let (Some(obj), Some(previous)) = (w.objects.get_mut(id), previous) {
                obj.state.rotation.y = previous;
            }
        }
    }

    let h = height(w, id);
    push_lara(w, id, &block_box(h), coll);
}

pub fn update(w: &mut World, id: u16) {
    let Some(target) = target_mut(w, id).and_then(|t| *t) else {
        return;
    };
    if !w.is_physics_frame() {
        return;
    }
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let pos = obj.position();
    let clamp = |d: Length| d.clamp(-MOVE_STEP, MOVE_STEP);
    let step = Position { x: clamp(target.x - pos.x), y: Length(0), z: clamp(target.z - pos.z) };
    obj.state.location.move_by(step);
    obj.state.location.update_room(&w.rooms);
    let arrived = obj.position() == target;

    if matches!(w.lara.current_state(), LaraStateId::PushablePush | LaraStateId::PushablePull) {
        w.lara.state.location.move_by(step);
        w.lara.state.location.update_room(&w.rooms);
    }

    if arrived {
        if let Some(t) = target_mut(w, id) {
            *t = None;
        }
        if let Some(obj) = w.objects.get_mut(id) {
            obj.state.trigger_state = TriggerState::Inactive;
            obj.state.is_active = false;
        }
        patch(w, id, true);
        log::debug!("block {} came to rest at {}", id, target);
        if matches!(w.lara.current_state(), LaraStateId::PushablePush | LaraStateId::PushablePull) {
            w.lara.set_goal(LaraStateId::PushableGrab);
        }
        heavy_trigger(w, id);
    }
}
