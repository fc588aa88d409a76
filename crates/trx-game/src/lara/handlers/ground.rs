// ground.rs — Standing, walking, running, turning, stepping and rolling

use trx_common::collision::{CollisionInfo, CollisionPolicies};
use trx_common::input::AxisMovement;
use trx_common::units::*;

use super::common::*;
use crate::lara::anim_ids;
use crate::lara::state::LaraStateId;
use crate::world::World;

const LEAN_RATE: Angle = Angle::centideg(150);
const LEAN_MAX: Angle = Angle::deg(11);
const STEP_DOWN_HEIGHT: Length = Length(128);
const MAX_RUN_STEP_UP: Length = Length(50);
const TURN_FALL_HEIGHT: Length = Length(100);
const BACK_FALL_HEIGHT: Length = Length(200);

fn walk_or(w: &World, run: LaraStateId, walk: LaraStateId) -> LaraStateId {
    if walking(w) {
        walk
    } else {
        run
    }
}

fn setup_walk_probe(w: &mut World, coll: &mut CollisionInfo, movement: Angle, floor: (Length, Length)) {
    w.lara.movement_angle = w.lara.yaw() + movement;
    coll.facing_angle = w.lara.movement_angle;
    coll.valid_floor_height = floor;
    coll.valid_ceiling_height_min = Length(0);
    coll.policies |= CollisionPolicies::SLOPE_BLOCKING;
    probe(w, coll, LARA_WALK_HEIGHT);
}

fn fall_backward(w: &mut World) {
    set_anim(w, anim_ids::FREE_FALL_BACK);
    w.lara.set_goal(LaraStateId::FallBackward);
    w.lara.set_current(LaraStateId::FallBackward);
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = true;
}

fn place_unless_sliding(w: &mut World, coll: &CollisionInfo) {
    if !try_start_slide(w, coll) {
        w.lara.place_on_floor(coll);
    }
}

// ============================================================
// Walk / run
// ============================================================

pub fn walk_forward_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::Stop);
        return;
    }
    turn(w, SLOW_TURN_SPEED);
    let goal = if forward(w) {
        walk_or(w, LaraStateId::RunForward, LaraStateId::WalkForward)
    } else {
        LaraStateId::Stop
    };
    w.lara.set_goal(goal);
}

pub fn walk_forward_post(w: &mut World, coll: &mut CollisionInfo) {
    setup_walk_probe(w, coll, Angle::ZERO, (-CLIMB_LIMIT_2_CLICK_MIN, CLIMB_LIMIT_2_CLICK_MIN));

    if stop_if_ceiling_blocked(w, coll) || try_climb(w, coll) {
        return;
    }
    if check_wall_collision(w, coll) {
        collide_stop(w);
    }
    if try_start_falling(w, coll) {
        return;
    }

    let frame = local_frame(w);
    let right_foot = frame >= Frame(28) && frame <= Frame(45);
    if coll.mid.floor.y > STEP_DOWN_HEIGHT {
        set_anim(w, if right_foot { anim_ids::WALK_DOWN_RIGHT } else { anim_ids::WALK_DOWN_LEFT });
    }
    if coll.mid.floor.y >= -CLIMB_LIMIT_2_CLICK_MIN && coll.mid.floor.y < -STEP_DOWN_HEIGHT {
        set_anim(w, if right_foot { anim_ids::WALK_UP_STEP_RIGHT } else { anim_ids::WALK_UP_STEP_LEFT });
    }
    place_unless_sliding(w, coll);
}

pub fn run_forward_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::Death);
        return;
    }
    if w.input_state.roll {
        set_anim(w, anim_ids::ROLL_BEGIN);
        w.lara.set_goal(LaraStateId::Stop);
        return;
    }

    let lean = LEAN_RATE.to_render_unit();
    match w.input_state.x_movement {
        AxisMovement::Left => {
            w.lara.sub_y_rotation_speed(SLOW_TURN_SPEED_ACCELERATION, -FAST_TURN_SPEED);
            w.lara.state.rotation.z = (w.lara.state.rotation.z - lean).max(-LEAN_MAX);
        }
        AxisMovement::Right => {
            w.lara.add_y_rotation_speed(SLOW_TURN_SPEED_ACCELERATION, FAST_TURN_SPEED);
            w.lara.state.rotation.z = (w.lara.state.rotation.z + lean).min(LEAN_MAX);
        }
        _ => {}
    }

    let goal = if w.input_state.jump && !w.lara.state.falling {
        LaraStateId::JumpForward
    } else if forward(w) {
        walk_or(w, LaraStateId::RunForward, LaraStateId::WalkForward)
    } else {
        LaraStateId::Stop
    };
    w.lara.set_goal(goal);
}

pub fn run_forward_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw();
    coll.facing_angle = w.lara.movement_angle;
    coll.valid_floor_height = (-CLIMB_LIMIT_2_CLICK_MIN, HEIGHT_LIMIT);
    coll.valid_ceiling_height_min = Length(0);
    coll.policies |= CollisionPolicies::SLOPES_ARE_WALLS;
    probe(w, coll, LARA_WALK_HEIGHT);

    if stop_if_ceiling_blocked(w, coll) || try_climb(w, coll) {
        return;
    }

    if check_wall_collision(w, coll) {
        w.lara.state.rotation.z = Angle::ZERO;
        if coll.front.floor.y < -CLIMB_LIMIT_2_CLICK_MAX {
            let frame = local_frame(w);
            let anim = if frame < Frame(10) {
                anim_ids::WALL_SMASH_LEFT
            } else if frame < Frame(22) {
                anim_ids::WALL_SMASH_RIGHT
            } else {
                anim_ids::STAY_SOLID
            };
            log::debug!("avatar ran into a wall at {}", w.lara.position());
            set_anim(w, anim);
        } else {
            collide_stop(w);
        }
    }

    if try_start_falling(w, coll) {
        return;
    }

    if coll.mid.floor.y >= -CLIMB_LIMIT_2_CLICK_MIN && coll.mid.floor.y < -STEP_DOWN_HEIGHT {
        let frame = local_frame(w);
        let anim = if frame >= Frame(3) && frame <= Frame(14) {
            anim_ids::RUN_UP_STEP_LEFT
        } else {
            anim_ids::RUN_UP_STEP_RIGHT
        };
        set_anim(w, anim);
    }

    if !try_start_slide(w, coll) {
        w.lara.state.location.position.y += coll.mid.floor.y.min(MAX_RUN_STEP_UP);
    }
}

// ============================================================
// Standing
// ============================================================

pub fn stop_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::Death);
        return;
    }
    if w.input_state.roll {
        set_anim(w, anim_ids::ROLL_BEGIN);
        w.lara.set_goal(LaraStateId::Stop);
        return;
    }

    w.lara.set_goal(LaraStateId::Stop);
    match w.input_state.step_movement {
        AxisMovement::Left => w.lara.set_goal(LaraStateId::StepLeft),
        AxisMovement::Right => w.lara.set_goal(LaraStateId::StepRight),
        _ => {}
    }
    match w.input_state.x_movement {
        AxisMovement::Left => w.lara.set_goal(LaraStateId::TurnLeftSlow),
        AxisMovement::Right => w.lara.set_goal(LaraStateId::TurnRightSlow),
        _ => {}
    }

    if w.input_state.jump {
        w.lara.set_goal(LaraStateId::JumpPrepare);
    } else if forward(w) {
        let goal = walk_or(w, LaraStateId::RunForward, LaraStateId::WalkForward);
        w.lara.set_goal(goal);
    } else if backward(w) {
        let goal = walk_or(w, LaraStateId::RunBack, LaraStateId::WalkBackward);
        w.lara.set_goal(goal);
    }
}

pub fn pose_input(w: &mut World, coll: &mut CollisionInfo) {
    stop_input(w, coll);
}

pub fn stop_post(w: &mut World, coll: &mut CollisionInfo) {
    setup_walk_probe(w, coll, Angle::ZERO, (-CLIMB_LIMIT_2_CLICK_MIN, CLIMB_LIMIT_2_CLICK_MIN));

    if stop_if_ceiling_blocked(w, coll) || try_start_falling(w, coll) || try_start_slide(w, coll) {
        return;
    }
    w.lara.apply_shift(coll);
    w.lara.place_on_floor(coll);
}

// ============================================================
// Backwards
// ============================================================

pub fn run_back_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.lara.set_goal(LaraStateId::Stop);
    turn(w, RUN_BACK_TURN_SPEED);
}

pub fn run_back_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.state.speed = w.lara.state.speed.abs();
    setup_walk_probe(w, coll, Angle::deg(180), (-CLIMB_LIMIT_2_CLICK_MIN, HEIGHT_LIMIT));

    if stop_if_ceiling_blocked(w, coll) {
        return;
    }
    if coll.mid.floor.y > BACK_FALL_HEIGHT {
        fall_backward(w);
        return;
    }
    if check_wall_collision(w, coll) {
        collide_stop(w);
    }
    place_unless_sliding(w, coll);
}

pub fn walk_backward_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::Stop);
        return;
    }
    let goal = if backward(w) && walking(w) { LaraStateId::WalkBackward } else { LaraStateId::Stop };
    w.lara.set_goal(goal);
    turn(w, SLOW_TURN_SPEED);
}

pub fn walk_backward_post(w: &mut World, coll: &mut CollisionInfo) {
    setup_walk_probe(w, coll, Angle::deg(180), (-CLIMB_LIMIT_2_CLICK_MIN, CLIMB_LIMIT_2_CLICK_MIN));

    if stop_if_ceiling_blocked(w, coll) {
        return;
    }
    if check_wall_collision(w, coll) {
        collide_stop(w);
    }
    if try_start_falling(w, coll) {
        return;
    }
    if coll.mid.floor.y > STEP_DOWN_HEIGHT && coll.mid.floor.y < CLIMB_LIMIT_2_CLICK_MIN {
        let frame = local_frame(w);
        let anim = if frame <= Frame(29) { anim_ids::WALK_DOWN_BACK_RIGHT } else { anim_ids::WALK_DOWN_BACK_LEFT };
        set_anim(w, anim);
    }
    place_unless_sliding(w, coll);
}

// ============================================================
// Turning
// ============================================================

fn turn_slow_input(w: &mut World, dir: AxisMovement) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::Stop);
        return;
    }

    if dir == AxisMovement::Right {
        w.lara.add_y_rotation_speed(SLOW_TURN_SPEED_ACCELERATION, FAST_TURN_SPEED);
    } else {
        w.lara.sub_y_rotation_speed(SLOW_TURN_SPEED_ACCELERATION, -FAST_TURN_SPEED);
    }
    if w.lara.y_rotation_speed.abs() > SLOW_TURN_SPEED {
        if walking(w) {
            let s = SLOW_TURN_SPEED;
            w.lara.y_rotation_speed = if dir == AxisMovement::Right { s } else { -s };
        } else {
            w.lara.set_goal(LaraStateId::TurnFast);
        }
    }

    if forward(w) {
        let goal = walk_or(w, LaraStateId::RunForward, LaraStateId::WalkForward);
        w.lara.set_goal(goal);
    } else if w.input_state.x_movement != dir {
        w.lara.set_goal(LaraStateId::Stop);
    }
}

pub fn turn_right_slow_input(w: &mut World, _coll: &mut CollisionInfo) {
    turn_slow_input(w, AxisMovement::Right);
}

pub fn turn_left_slow_input(w: &mut World, _coll: &mut CollisionInfo) {
    turn_slow_input(w, AxisMovement::Left);
}

pub fn turn_fast_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::Stop);
        return;
    }
    if w.lara.y_rotation_speed >= Angle::ZERO {
        w.lara.y_rotation_speed = FAST_TURN_SPEED;
        if w.input_state.x_movement != AxisMovement::Right {
            w.lara.set_goal(LaraStateId::Stop);
        }
    } else {
        w.lara.y_rotation_speed = -FAST_TURN_SPEED;
        if w.input_state.x_movement != AxisMovement::Left {
            w.lara.set_goal(LaraStateId::Stop);
        }
    }
}

pub fn turn_slow_post(w: &mut World, coll: &mut CollisionInfo) {
    setup_walk_probe(w, coll, Angle::ZERO, (-CLIMB_LIMIT_2_CLICK_MIN, CLIMB_LIMIT_2_CLICK_MIN));

    if coll.mid.floor.y > TURN_FALL_HEIGHT {
        set_anim(w, anim_ids::FREE_FALL_FORWARD);
        w.lara.set_goal(LaraStateId::JumpForward);
        w.lara.set_current(LaraStateId::JumpForward);
        w.lara.state.fallspeed = Speed(0);
        w.lara.state.falling = true;
        return;
    }
    place_unless_sliding(w, coll);
}

// ============================================================
// Side steps
// ============================================================

fn step_input(w: &mut World, dir: AxisMovement) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::Stop);
        return;
    }
    if w.input_state.step_movement != dir {
        w.lara.set_goal(LaraStateId::Stop);
    }
    turn(w, SLOW_TURN_SPEED);
}

pub fn step_right_input(w: &mut World, _coll: &mut CollisionInfo) {
    step_input(w, AxisMovement::Right);
}

pub fn step_left_input(w: &mut World, _coll: &mut CollisionInfo) {
    step_input(w, AxisMovement::Left);
}

pub fn step_post(w: &mut World, coll: &mut CollisionInfo) {
    let side = if w.lara.current_state() == LaraStateId::StepRight { Angle::deg(90) } else { Angle::deg(-90) };
    setup_walk_probe(w, coll, side, (-STEPPABLE_HEIGHT, STEPPABLE_HEIGHT));

    if stop_if_ceiling_blocked(w, coll) {
        return;
    }
    if check_wall_collision(w, coll) {
        collide_stop(w);
    }
    if try_start_falling(w, coll) {
        return;
    }
    place_unless_sliding(w, coll);
}

// ============================================================
// Rolls
// ============================================================

fn roll_post(w: &mut World, coll: &mut CollisionInfo, backwards: bool) {
    w.lara.movement_angle = w.lara.yaw() + if backwards { Angle::deg(180) } else { Angle::ZERO };
    coll.facing_angle = w.lara.movement_angle;
    coll.valid_floor_height = (-CLIMB_LIMIT_2_CLICK_MIN, HEIGHT_LIMIT);
    coll.valid_ceiling_height_min = Length(0);
    coll.policies |= CollisionPolicies::SLOPES_ARE_WALLS;
    probe(w, coll, LARA_WALK_HEIGHT);

    if stop_if_ceiling_blocked(w, coll) || try_start_slide(w, coll) {
        return;
    }
    if coll.mid.floor.y > BACK_FALL_HEIGHT {
        if backwards {
            fall_backward(w);
        } else {
            try_start_falling(w, coll);
        }
        return;
    }
    w.lara.apply_shift(coll);
    w.lara.place_on_floor(coll);
}

pub fn roll_forward_post(w: &mut World, coll: &mut CollisionInfo) {
    roll_post(w, coll, false);
}

pub fn roll_backward_post(w: &mut World, coll: &mut CollisionInfo) {
    roll_post(w, coll, true);
}
