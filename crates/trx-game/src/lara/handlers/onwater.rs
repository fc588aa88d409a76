// onwater.rs — Treading water on the surface, diving and climbing out

use trx_common::collision::{AxisColl, CollisionInfo};
use trx_common::input::AxisMovement;
use trx_common::units::*;

use super::common::{action, backward, forward, set_anim};
use crate::lara::state::LaraStateId;
use crate::lara::{anim_ids, update_floor_height, water_surface_height, HandStatus, UnderwaterState, DIVE_KEYPRESS_TIME};
use crate::world::World;

const STROKE_DECELERATION: Speed = ONWATER_DECELERATION;
const DIVE_DEPTH: Length = Length(-100);
const DIVE_PITCH: Angle = Angle::deg(-45);
const DIVE_SPEED: Speed = Speed(80);
const EXIT_AXIS_MARGIN: Angle = Angle::deg(35);
const EXIT_MIN: Length = Length(-512);
const EXIT_MAX: Length = Length(316);
const EXIT_OFFSET: Length = Length(100);

fn water_turn(w: &mut World) {
    match w.input_state.x_movement {
        AxisMovement::Left => w.lara.state.rotation.y -= ONWATER_TURN_SPEED.to_render_unit(),
        AxisMovement::Right => w.lara.state.rotation.y += ONWATER_TURN_SPEED.to_render_unit(),
        _ => {}
    }
}

fn dive(w: &mut World) {
    log::debug!("avatar dives from the surface");
    set_anim(w, anim_ids::FREE_FALL_TO_UNDERWATER_ALTERNATE);
    w.lara.set_goal(LaraStateId::UnderwaterForward);
    w.lara.set_current(LaraStateId::UnderwaterDiving);
    w.lara.state.rotation.x = DIVE_PITCH;
    w.lara.state.fallspeed = DIVE_SPEED;
    w.lara.underwater_state = UnderwaterState::Diving;
}

// ============================================================
// Treading water
// ============================================================

pub fn stop_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::WaterDeath);
        return;
    }
    if w.is_physics_frame() {
        w.lara.state.fallspeed = (w.lara.state.fallspeed - STROKE_DECELERATION).max(Speed(0));
    }
    water_turn(w);

    if forward(w) {
        w.lara.set_goal(LaraStateId::OnWaterForward);
    } else if backward(w) {
        w.lara.set_goal(LaraStateId::OnWaterBackward);
    }
    match w.input_state.step_movement {
        AxisMovement::Left => w.lara.set_goal(LaraStateId::OnWaterLeft),
        AxisMovement::Right => w.lara.set_goal(LaraStateId::OnWaterRight),
        _ => {}
    }

    if w.input_state.jump {
        w.lara.swim_to_dive_keypress_duration += RenderFrame(1);
        if w.lara.swim_to_dive_keypress_duration == DIVE_KEYPRESS_TIME {
            w.lara.set_goal(LaraStateId::UnderwaterForward);
        }
    } else {
        w.lara.swim_to_dive_keypress_duration = RenderFrame(0);
    }
}

pub fn stop_post(w: &mut World, coll: &mut CollisionInfo) {
    if w.lara.goal_state() == LaraStateId::UnderwaterForward {
        dive(w);
        return;
    }
    w.lara.movement_angle = w.lara.yaw();
    onwater_common(w, coll);
}

fn stroke_input(w: &mut World, held: fn(&World) -> bool) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::WaterDeath);
        return;
    }
    w.lara.swim_to_dive_keypress_duration = RenderFrame(0);
    water_turn(w);
    if !held(w) {
        w.lara.set_goal(LaraStateId::OnWaterStop);
    }
    if w.is_physics_frame() {
        w.lara.state.fallspeed = (w.lara.state.fallspeed + ONWATER_ACCELERATION).min(ONWATER_MAX_SPEED);
    }
}

pub fn forward_input(w: &mut World, _coll: &mut CollisionInfo) {
    stroke_input(w, forward);
}

pub fn backward_input(w: &mut World, _coll: &mut CollisionInfo) {
    stroke_input(w, backward);
}

pub fn left_input(w: &mut World, _coll: &mut CollisionInfo) {
    stroke_input(w, |w| w.input_state.step_movement == AxisMovement::Left);
}

pub fn right_input(w: &mut World, _coll: &mut CollisionInfo) {
    stroke_input(w, |w| w.input_state.step_movement == AxisMovement::Right);
}

pub fn forward_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw();
    onwater_common(w, coll);
    try_climb_out(w, coll);
}

pub fn backward_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw() + Angle::deg(180);
    onwater_common(w, coll);
}

pub fn left_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw() - Angle::deg(90);
    onwater_common(w, coll);
}

pub fn right_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw() + Angle::deg(90);
    onwater_common(w, coll);
}

fn onwater_common(w: &mut World, coll: &mut CollisionInfo) {
    coll.facing_angle = w.lara.movement_angle;
    let probe = w.lara.state.location.moved(Position::new(0, LARA_SWIM_HEIGHT.get(), 0));
    w.collision_probe(coll, &probe, LARA_SWIM_HEIGHT);
    w.lara.apply_shift(coll);

    let blocked = matches!(
        coll.collision_type,
        AxisColl::Front | AxisColl::Top | AxisColl::FrontTop | AxisColl::Jammed
    );
    if coll.mid.floor.y < Length(0) || blocked {
        w.lara.state.fallspeed = Speed(0);
        w.lara.state.location.position = coll.initial_position;
    } else if coll.collision_type == AxisColl::FrontLeft {
        w.lara.state.rotation.y += WATER_COLLISION_ROTATION_SPEED_Y.to_render_unit();
    } else if coll.collision_type == AxisColl::FrontRight {
        w.lara.state.rotation.y -= WATER_COLLISION_ROTATION_SPEED_Y.to_render_unit();
    }

    if let Some(surface) = water_surface_height(w) {
        if surface - w.lara.position().y <= DIVE_DEPTH {
            dive(w);
        }
    }
}

/// Pulls the avatar out of the water onto a ledge at arm's reach.
fn try_climb_out(w: &mut World, coll: &CollisionInfo) -> bool {
    if coll.collision_type != AxisColl::Front || !action(w) || w.lara.hand_status != HandStatus::None {
        return false;
    }
    if (coll.front_left.floor.y - coll.front_right.floor.y).abs() >= MAX_GRABBABLE_GRADIENT {
        return false;
    }
    if coll.front.ceiling.y > Length(0) {
        return false;
    }
    let hdif = coll.front.floor.y + LARA_SWIM_HEIGHT;
    if hdif <= EXIT_MIN || hdif > EXIT_MAX {
        return false;
    }
    let Some(axis) = axis_from_angle(w.lara.yaw(), EXIT_AXIS_MARGIN) else {
        return false;
    };

    let p = &mut w.lara.state.location.position;
    p.y += hdif - Length(5);
    let sector_mask = !(SECTOR_SIZE.get() - 1);
    match axis {
        Axis::Deg0 => p.z = Length((p.z.get() & sector_mask) + SECTOR_SIZE.get()) + EXIT_OFFSET,
        Axis::Deg180 => p.z = Length(p.z.get() & sector_mask) - EXIT_OFFSET,
        Axis::Right90 => p.x = Length((p.x.get() & sector_mask) + SECTOR_SIZE.get()) + EXIT_OFFSET,
        Axis::Left90 => p.x = Length(p.x.get() & sector_mask) - EXIT_OFFSET,
    }

    log::debug!("avatar climbs out of the water");
    set_anim(w, anim_ids::CLIMB_OUT_OF_WATER);
    w.lara.set_goal(LaraStateId::Stop);
    w.lara.set_current(LaraStateId::OnWaterExit);
    w.lara.state.rotation = Rotation::yaw(snap_rotation(axis));
    w.lara.state.speed = Speed(0);
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = false;
    w.lara.hand_status = HandStatus::Grabbing;
    w.lara.underwater_state = UnderwaterState::OnLand;
    update_floor_height(w, Length(-381));
    true
}
