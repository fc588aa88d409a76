// air.rs — Jumps, falls, reaching for ledges and swan dives

use trx_common::collision::{AxisColl, CollisionInfo, CollisionPolicies};
use trx_common::input::AxisMovement;
use trx_common::units::*;

use super::common::*;
use crate::audio_engine::sfx;
use crate::lara::state::LaraStateId;
use crate::lara::{anim_ids, update_impl, HandStatus};
use crate::world::World;

/// Fall speed at which the avatar starts screaming.
const SCREAM_FALL_SPEED: Speed = Speed(154);
const JUMP_TAKEOFF_CHECK: Length = QUARTER_SECTOR_SIZE;
const JUMP_PREPARE_HEADROOM: Length = Length(-100);

fn fast_fall_check(w: &mut World, goal: LaraStateId) {
    if w.lara.state.fallspeed > FREE_FALL_SPEED_THRESHOLD {
        w.lara.set_goal(goal);
    }
}

fn air_drag(w: &mut World) {
    if w.is_physics_frame() {
        w.lara.state.speed = w.lara.state.speed * 95 / 100;
    }
}

fn airborne_probe(w: &mut World, coll: &mut CollisionInfo, movement: Angle, height: Length) {
    w.lara.movement_angle = w.lara.yaw() + movement;
    coll.facing_angle = w.lara.movement_angle;
    coll.valid_floor_height = (-CLIMB_LIMIT_2_CLICK_MIN, HEIGHT_LIMIT);
    coll.valid_ceiling_height_min = BAD_JUMP_CEILING;
    probe(w, coll, height);
}

fn backwards_if_reversing(w: &World) -> Angle {
    if w.lara.state.speed < Speed(0) {
        Angle::deg(180)
    } else {
        Angle::ZERO
    }
}

// ============================================================
// Forward jump
// ============================================================

pub fn jump_forward_input(w: &mut World, _coll: &mut CollisionInfo) {
    if matches!(w.lara.goal_state(), LaraStateId::SwandiveBegin | LaraStateId::Reach) {
        w.lara.set_goal(LaraStateId::JumpForward);
    }
    if !matches!(w.lara.goal_state(), LaraStateId::Death | LaraStateId::Stop) {
        let free_hands = w.lara.hand_status == HandStatus::None;
        if action(w) && free_hands {
            w.lara.set_goal(LaraStateId::Reach);
        }
        if walking(w) && free_hands {
            w.lara.set_goal(LaraStateId::SwandiveBegin);
        }
        fast_fall_check(w, LaraStateId::FreeFall);
    }
    turn(w, JUMP_TURN_SPEED);
}

pub fn jump_forward_post(w: &mut World, coll: &mut CollisionInfo) {
    let movement = backwards_if_reversing(w);
    coll.policies |= CollisionPolicies::SLOPES_ARE_WALLS;
    airborne_probe(w, coll, movement, LARA_WALK_HEIGHT);
    check_jump_wall_smash(w, coll);

    if coll.mid.floor.y > Length(0) || w.lara.state.fallspeed <= Speed(0) {
        return;
    }
    let goal = if apply_landing_damage(w) {
        LaraStateId::Death
    } else if forward(w) && !walking(w) {
        LaraStateId::RunForward
    } else {
        LaraStateId::Stop
    };
    w.lara.set_goal(goal);
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = false;
    w.lara.place_on_floor(coll);
    w.lara.state.speed = Speed(0);
    update_impl(w);
}

// ============================================================
// Falling
// ============================================================

pub fn free_fall_input(w: &mut World, _coll: &mut CollisionInfo) {
    air_drag(w);
    if w.is_physics_frame() && w.lara.state.fallspeed == SCREAM_FALL_SPEED {
        w.play_lara_sound(sfx::LARA_SCREAM);
    }
}

pub fn free_fall_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.state.falling = true;
    airborne_probe(w, coll, Angle::ZERO, LARA_WALK_HEIGHT);
    jump_against_wall(w, coll);

    if coll.mid.floor.y > Length(0) {
        return;
    }
    if apply_landing_damage(w) {
        w.lara.set_goal(LaraStateId::Death);
    } else {
        set_anim(w, anim_ids::FREE_FALL_LAND);
        w.lara.set_goal(LaraStateId::Stop);
        w.lara.set_current(LaraStateId::Stop);
    }
    w.audio.stop_sound_effect(sfx::LARA_SCREAM, Some(w.lara.id));
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = false;
    w.lara.place_on_floor(coll);
}

pub fn fall_backward_input(w: &mut World, _coll: &mut CollisionInfo) {
    fast_fall_check(w, LaraStateId::FreeFall);
    if action(w) && w.lara.hand_status == HandStatus::None {
        w.lara.set_goal(LaraStateId::Reach);
    }
}

pub fn fall_backward_post(w: &mut World, coll: &mut CollisionInfo) {
    airborne_probe(w, coll, Angle::deg(180), LARA_WALK_HEIGHT);
    check_jump_wall_smash(w, coll);
    land_if_on_floor(w, coll);
}

// ============================================================
// Grabbing
// ============================================================

pub fn reach_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_rotation_around_lara_y(Angle::deg(85));
    fast_fall_check(w, LaraStateId::FreeFall);
}

pub fn reach_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw();
    coll.facing_angle = w.lara.movement_angle;
    coll.valid_floor_height = (Length(0), HEIGHT_LIMIT);
    coll.valid_ceiling_height_min = BAD_JUMP_CEILING;
    probe(w, coll, LARA_HANG_HEIGHT);

    if try_grab_edge(w, coll) {
        return;
    }
    jump_against_wall(w, coll);
    land_if_on_floor(w, coll);
}

pub fn jump_up_input(w: &mut World, _coll: &mut CollisionInfo) {
    fast_fall_check(w, LaraStateId::FreeFall);
}

pub fn jump_up_post(w: &mut World, coll: &mut CollisionInfo) {
    let movement = backwards_if_reversing(w);
    airborne_probe(w, coll, movement, LARA_HANG_HEIGHT);

    if try_grab_edge(w, coll) {
        return;
    }
    if matches!(coll.collision_type, AxisColl::Top | AxisColl::FrontTop | AxisColl::Jammed) {
        w.lara.state.location.position = coll.initial_position;
        if w.lara.state.fallspeed <= Speed(0) {
            w.lara.state.fallspeed = Speed(1);
        }
    } else {
        jump_against_wall(w, coll);
    }
    land_if_on_floor(w, coll);
}

// ============================================================
// Standing jumps
// ============================================================

pub fn jump_prepare_input(w: &mut World, _coll: &mut CollisionInfo) {
    let yaw = w.lara.yaw();
    let can_jump = |w: &World, offset: Angle| floor_ahead(w, yaw + offset, JUMP_TAKEOFF_CHECK) >= -CLIMB_LIMIT_2_CLICK_MIN;

    let choice = if forward(w) {
        Some((Angle::ZERO, LaraStateId::JumpForward))
    } else if w.input_state.x_movement == AxisMovement::Left {
        Some((Angle::deg(-90), LaraStateId::JumpLeft))
    } else if w.input_state.x_movement == AxisMovement::Right {
        Some((Angle::deg(90), LaraStateId::JumpRight))
    } else if backward(w) {
        Some((Angle::deg(180), LaraStateId::JumpBack))
    } else {
        None
    };
    if let Some((offset, goal)) = choice {
        if can_jump(w, offset) {
            w.lara.movement_angle = yaw + offset;
            w.lara.set_goal(goal);
        }
    }
    fast_fall_check(w, LaraStateId::FreeFall);
}

pub fn jump_prepare_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = false;
    coll.facing_angle = w.lara.yaw();
    coll.valid_floor_height = (-HEIGHT_LIMIT, HEIGHT_LIMIT);
    coll.valid_ceiling_height_min = Length(0);
    probe(w, coll, LARA_WALK_HEIGHT);

    if coll.mid.ceiling.y > JUMP_PREPARE_HEADROOM {
        set_anim(w, anim_ids::STAY_SOLID);
        w.lara.set_goal(LaraStateId::Stop);
        w.lara.set_current(LaraStateId::Stop);
        w.lara.state.speed = Speed(0);
        w.lara.state.fallspeed = Speed(0);
        w.lara.state.falling = false;
        w.lara.state.location.position = coll.initial_position;
    }
}

pub fn jump_back_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_rotation_around_lara_y(Angle::deg(135));
    fast_fall_check(w, LaraStateId::FreeFall);
}

pub fn jump_side_input(w: &mut World, _coll: &mut CollisionInfo) {
    fast_fall_check(w, LaraStateId::FreeFall);
}

pub fn jump_back_post(w: &mut World, coll: &mut CollisionInfo) {
    common_jump_post(w, coll, Angle::deg(180));
}

pub fn jump_right_post(w: &mut World, coll: &mut CollisionInfo) {
    common_jump_post(w, coll, Angle::deg(90));
}

pub fn jump_left_post(w: &mut World, coll: &mut CollisionInfo) {
    common_jump_post(w, coll, Angle::deg(-90));
}

// ============================================================
// Swan dive
// ============================================================

pub fn swandive_begin_input(w: &mut World, _coll: &mut CollisionInfo) {
    fast_fall_check(w, LaraStateId::SwandiveEnd);
}

pub fn swandive_begin_post(w: &mut World, coll: &mut CollisionInfo) {
    airborne_probe(w, coll, Angle::ZERO, LARA_WALK_HEIGHT);
    check_jump_wall_smash(w, coll);
    if w.lara.state.fallspeed > Speed(0) && coll.mid.floor.y <= Length(0) {
        w.lara.set_goal(LaraStateId::Stop);
        w.lara.state.fallspeed = Speed(0);
        w.lara.state.falling = false;
        w.lara.place_on_floor(coll);
    }
}

pub fn swandive_end_input(w: &mut World, _coll: &mut CollisionInfo) {
    air_drag(w);
}

pub fn swandive_end_post(w: &mut World, coll: &mut CollisionInfo) {
    airborne_probe(w, coll, Angle::ZERO, LARA_WALK_HEIGHT);
    jump_against_wall(w, coll);
    land_if_on_floor(w, coll);
}
