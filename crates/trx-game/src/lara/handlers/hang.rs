// hang.rs — Hanging from a ledge, shimmying and pulling up

use trx_common::collision::{AxisColl, CollisionInfo};
use trx_common::input::AxisMovement;
use trx_common::units::*;

use super::common::*;
use crate::lara::state::LaraStateId;
use crate::lara::{anim_ids, HandStatus};
use crate::world::World;

const MAX_LEDGE_DRIFT: Length = QUARTER_SECTOR_SIZE;
const PULL_UP_MIN: Length = Length(-850);
const PULL_UP_MAX: Length = Length(-650);

pub fn hang_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_rotation_around_lara_x(Angle::deg(-60));
    if w.input_state.x_movement == AxisMovement::Left || w.input_state.step_movement == AxisMovement::Left {
        w.lara.set_goal(LaraStateId::ShimmyLeft);
    } else if w.input_state.x_movement == AxisMovement::Right || w.input_state.step_movement == AxisMovement::Right {
        w.lara.set_goal(LaraStateId::ShimmyRight);
    }
}

fn drop_off(w: &mut World) {
    log::debug!("avatar let go of the ledge");
    set_anim(w, anim_ids::STOP_HANG);
    w.lara.set_goal(LaraStateId::JumpUp);
    w.lara.set_current(LaraStateId::JumpUp);
    w.lara.state.location.position.y += QUARTER_SECTOR_SIZE;
    w.lara.state.falling = true;
    w.lara.state.speed = Speed(2);
    w.lara.state.fallspeed = Speed(1);
    w.lara.hand_status = HandStatus::None;
}

/// Keeps the hands on the ledge while hanging. Returns false once the
/// avatar let go.
fn hang_test(w: &mut World, coll: &mut CollisionInfo) -> bool {
    coll.facing_angle = w.lara.movement_angle;
    coll.valid_floor_height = (-HEIGHT_LIMIT, HEIGHT_LIMIT);
    coll.valid_ceiling_height_min = Length(0);
    probe(w, coll, LARA_WALK_HEIGHT);

    if !action(w) || w.lara.is_dead() {
        drop_off(w);
        return false;
    }

    let hdif = coll.front.floor.y + hands_height(w);
    let sloped = (coll.front_left.floor.y - coll.front_right.floor.y).abs() >= MAX_GRABBABLE_GRADIENT;
    if sloped
        || coll.mid.ceiling.y >= Length(0)
        || hdif.abs() > MAX_LEDGE_DRIFT
        || coll.collision_type == AxisColl::Jammed
    {
        w.lara.state.location.position = coll.initial_position;
        if matches!(w.lara.current_state(), LaraStateId::ShimmyLeft | LaraStateId::ShimmyRight) {
            set_anim(w, anim_ids::HANG);
            w.lara.set_goal(LaraStateId::Hang);
            w.lara.set_current(LaraStateId::Hang);
        }
        return true;
    }
    w.lara.state.location.position.y += hdif;
    true
}

pub fn hang_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw();
    if !hang_test(w, coll) {
        return;
    }
    if w.lara.goal_state() != LaraStateId::Hang || !forward(w) {
        return;
    }
    let ledge = coll.front.floor.y;
    if ledge > PULL_UP_MIN && ledge < PULL_UP_MAX && ledge - coll.front.ceiling.y >= Length(0) {
        let goal = if walking(w) { LaraStateId::Handstand } else { LaraStateId::Climbing };
        log::debug!("avatar pulls up onto the ledge");
        w.lara.set_goal(goal);
    }
}

pub fn shimmy_left_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_rotation_around_lara_x(Angle::deg(-60));
    if w.input_state.x_movement != AxisMovement::Left && w.input_state.step_movement != AxisMovement::Left {
        w.lara.set_goal(LaraStateId::Hang);
    }
}

pub fn shimmy_left_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw() - Angle::deg(90);
    hang_test(w, coll);
    w.lara.movement_angle = w.lara.yaw() - Angle::deg(90);
}

pub fn shimmy_right_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_rotation_around_lara_x(Angle::deg(-60));
    if w.input_state.x_movement != AxisMovement::Right && w.input_state.step_movement != AxisMovement::Right {
        w.lara.set_goal(LaraStateId::Hang);
    }
}

pub fn shimmy_right_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw() + Angle::deg(90);
    hang_test(w, coll);
    w.lara.movement_angle = w.lara.yaw() + Angle::deg(90);
}
