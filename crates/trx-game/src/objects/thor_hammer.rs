// thor_hammer.rs — Thor's hammer: a handle that swings down a separate head block

use trx_common::collision::{CollisionInfo, CollisionPolicies};
use trx_common::units::*;

use super::{alter_floor_height, animate, heavy_trigger, lara_touches, push_lara, type_ids, ObjectKind};
use crate::lara::anim_ids;
use crate::lara::state::LaraStateId;
use crate::object_state::{ObjectState, TriggerState};
use crate::skeleton::Skeleton;
use crate::world::World;

const IDLE: u16 = 0;
const RAISING: u16 = 1;
const FALLING: u16 = 2;
const SETTLE: u16 = 3;

/// Local frame of the fall after which the head is on the ground.
const IMPACT_FRAME: Frame = Frame(30);
const IMPACT_DISTANCE: Length = Length(3 * 1024);
const IMPACT_RADIUS: Length = Length(520);

fn block_of(w: &World, id: u16) -> Option<u16> {
    match w.objects.get(id).map(|o| &o.kind) {
        Some(ObjectKind::ThorHammerHandle { block }) => *block,
        _ => None,
    }
}

pub fn init(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    let mut state = ObjectState::new(type_ids::THOR_HAMMER_BLOCK, obj.state.location, obj.state.rotation);
    state.trigger_state = TriggerState::Active;
    state.is_active = true;
    let skeleton = w.models.get(&type_ids::THOR_HAMMER_BLOCK).map(|m| {
        let mut sk = Skeleton::new(m, &w.animations);
        sk.set_animation(&mut state, &w.animations, m.animation_index, None);
        sk
    });
    let block = w.objects.add_dynamic(ObjectKind::ThorHammerBlock, state, skeleton);
    if let Some(ObjectKind::ThorHammerHandle { block: slot }) = w.objects.get_mut(id).map(|o| &mut o.kind) {
        *slot = Some(block);
    }
}

/// Flattens the avatar if it stands where the head comes down.
fn smash(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    let pos = obj.position() + pitch(IMPACT_DISTANCE, obj.state.rotation.y);
    let y = obj.position().y;
    if w.lara.is_dead() {
        return;
    }
    let lara = w.lara.position();
    let hit = pos.x - IMPACT_RADIUS < lara.x
        && pos.x + IMPACT_RADIUS > lara.x
        && pos.z - IMPACT_RADIUS < lara.z
        && pos.z + IMPACT_RADIUS > lara.z;
    if !hit {
        return;
    }
    log::debug!("avatar crushed by hammer {}", id);
    w.lara.state.health = DEAD_HEALTH;
    w.lara.set_animation(&w.animations, anim_ids::BOULDER_DEATH, None);
    w.lara.set_current(LaraStateId::BoulderDeath);
    w.lara.set_goal(LaraStateId::BoulderDeath);
    w.lara.state.location.position.y = y;
    w.lara.state.falling = false;
}

/// Fires the triggers under the handle and raises the floor where the head
/// landed.
fn settle(w: &mut World, id: u16) {
    heavy_trigger(w, id);
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    let mut landed = obj.state.location;
    let yaw = obj.state.rotation.y;
    if yaw == Angle::ZERO {
        landed.position.z += IMPACT_DISTANCE;
    } else if yaw == Angle::deg(90) {
        landed.position.x += IMPACT_DISTANCE;
    } else if yaw == Angle::deg(180) {
        landed.position.z -= IMPACT_DISTANCE;
    } else if yaw == Angle::deg(-90) {
        landed.position.x -= IMPACT_DISTANCE;
    }
    if !w.lara.is_dead() {
        alter_floor_height(&mut w.rooms, &landed, Length(-2 * 1024));
    }
    if let Some(obj) = w.objects.get_mut(id) {
        obj.state.is_active = false;
        obj.state.trigger_state = TriggerState::Deactivated;
    }
}

pub fn handle_update(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let s = &mut obj.state;
    match s.current_anim_state {
        IDLE => {
            if s.update_activation_timeout() {
                s.goal_anim_state = RAISING;
            } else {
                s.is_active = false;
                s.trigger_state = TriggerState::Inactive;
            }
        }
        RAISING => {
            s.goal_anim_state = if s.update_activation_timeout() { FALLING } else { IDLE };
        }
        FALLING => {
            if obj.local_frame(&w.animations) > IMPACT_FRAME {
                smash(w, id);
            }
        }
        SETTLE => settle(w, id),
        _ => {}
    }
    animate(w, id);
    sync_block(w, id);
}

/// The head plays the handle's animation in its own model.
fn sync_block(w: &mut World, id: u16) {
    let Some(block) = block_of(w, id) else {
        return;
    };
    let Some(handle) = w.objects.get(id) else {
        return;
    };
    let Some(handle_sk) = handle.skeleton.as_ref() else {
        return;
    };
    let state = handle.state.current_anim_state;
    let local = handle_sk.local_frame(&w.animations);
    let offset = w.models.get(&type_ids::THOR_HAMMER_HANDLE).map_or(0, |m| handle_sk.anim.saturating_sub(m.animation_index));
    let Some(base) = w.models.get(&type_ids::THOR_HAMMER_BLOCK).map(|m| m.animation_index) else {
        return;
    };
    let Some(obj) = w.objects.objects.get_mut(&block) else {
        return;
    };
    if let Some(sk) = obj.skeleton.as_mut() {
        let anim = base + offset;
        let frame = w.animations.get(anim).map(|a| a.first_frame + local);
        sk.set_animation(&mut obj.state, &w.animations, anim, frame);
    }
    obj.state.current_anim_state = state;
}

pub fn collide(w: &mut World, id: u16, coll: &mut CollisionInfo) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    if obj.kind == ObjectKind::ThorHammerBlock && obj.state.current_anim_state == FALLING {
        return;
    }
    if !coll.policies.contains(CollisionPolicies::ENABLE_BADDIE_PUSH) || !lara_touches(w, id, coll.collision_radius) {
        return;
    }
    let bbox = obj.bounding_box(&w.animations);
    push_lara(w, id, &bbox, coll);
}
