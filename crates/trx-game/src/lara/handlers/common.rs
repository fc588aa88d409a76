// common.rs — Collision responses shared by the avatar's state handlers

use trx_common::collision::{AxisColl, CollisionInfo, CollisionPolicies};
use trx_common::height::{Geometry, HeightInfo};
use trx_common::input::{Action, AxisMovement};
use trx_common::location::Location;
use trx_common::units::*;

use crate::lara::state::LaraStateId;
use crate::lara::{anim_ids, update_impl, HandStatus};
use crate::world::World;

/// Minimal headroom above the avatar while airborne.
pub const BAD_JUMP_CEILING: Length = Length(192);
const CLIMB_AXIS_MARGIN: Angle = Angle::deg(30);
const GRAB_AXIS_MARGIN: Angle = Angle::deg(35);
const EDGE_DEFLECTION: Angle = Angle::deg(5);
const LANDING_DAMAGE_START: Speed = Speed(132);
const LANDING_DEATH_SPEED: Speed = Speed(140);
const SLIDE_FALL_HEIGHT: Length = Length(200);

pub fn no_input(_w: &mut World, _coll: &mut CollisionInfo) {}

// ============================================================
// Input helpers
// ============================================================

pub fn forward(w: &World) -> bool {
    w.input_state.z_movement == AxisMovement::Forward
}

pub fn backward(w: &World) -> bool {
    w.input_state.z_movement == AxisMovement::Backward
}

pub fn walking(w: &World) -> bool {
    w.has_action(Action::Walk)
}

pub fn action(w: &World) -> bool {
    w.has_action(Action::Action)
}

/// Accelerates the turn rate toward `limit` on left/right input.
pub fn turn(w: &mut World, limit: Angle) {
    match w.input_state.x_movement {
        AxisMovement::Left => w.lara.sub_y_rotation_speed(SLOW_TURN_SPEED_ACCELERATION, -limit),
        AxisMovement::Right => w.lara.add_y_rotation_speed(SLOW_TURN_SPEED_ACCELERATION, limit),
        _ => {}
    }
}

pub fn set_anim(w: &mut World, anim: usize) {
    w.lara.set_animation(&w.animations, anim, None);
}

pub fn local_frame(w: &World) -> Frame {
    w.lara.local_frame(&w.animations)
}

/// Floor under a point `dist` ahead along `angle`, relative to the avatar.
pub fn floor_ahead(w: &World, angle: Angle, dist: Length) -> Length {
    let pos = w.lara.position() + pitch(dist, angle);
    let mut loc = Location::new(w.lara.state.location.room, Position { y: pos.y - LARA_WALK_HEIGHT, ..pos });
    let geo = Geometry { rooms: &w.rooms, floor_data: &w.floor_data };
    let sector = loc.update_room(&w.rooms);
    let floor = HeightInfo::from_floor(&geo, sector, &pos, &w.objects).y;
    if floor == INVALID_HEIGHT {
        return floor;
    }
    floor - w.lara.position().y
}

/// Distance from the avatar's origin up to its hands in the current pose.
pub fn hands_height(w: &World) -> Length {
    let bbox = w.lara.skeleton.bounding_box(&w.animations);
    if bbox.min.y < Length(0) {
        -bbox.min.y
    } else {
        LARA_WALK_HEIGHT
    }
}

// ============================================================
// Probe setup
// ============================================================

/// Probes around the avatar at its origin.
pub fn probe(w: &World, coll: &mut CollisionInfo, height: Length) {
    w.collision_probe(coll, &w.lara.state.location, height);
}

/// The collision response of states with no motion of their own.
pub fn default_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw();
    coll.facing_angle = w.lara.movement_angle;
    coll.valid_floor_height = (-CLIMB_LIMIT_2_CLICK_MIN, CLIMB_LIMIT_2_CLICK_MIN);
    coll.valid_ceiling_height_min = Length(0);
    coll.policies |= CollisionPolicies::SLOPE_BLOCKING;
    probe(w, coll, LARA_WALK_HEIGHT);
}

// ============================================================
// Responses
// ============================================================

/// Puts the avatar back where it stood when the ceiling is in the way.
pub fn stop_if_ceiling_blocked(w: &mut World, coll: &CollisionInfo) -> bool {
    if !matches!(coll.collision_type, AxisColl::Top | AxisColl::Jammed) {
        return false;
    }
    w.lara.state.location.position = coll.initial_position;
    set_anim(w, anim_ids::STAY_SOLID);
    w.lara.set_goal(LaraStateId::Stop);
    w.lara.set_current(LaraStateId::Stop);
    w.lara.state.speed = Speed(0);
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = false;
    true
}

/// Vaults onto a block of two or three clicks, or jumps up to a higher
/// ledge, when action is held against a wall.
pub fn try_climb(w: &mut World, coll: &mut CollisionInfo) -> bool {
    if coll.collision_type != AxisColl::Front || !action(w) || w.lara.hand_status != HandStatus::None {
        return false;
    }
    let Some(axis) = axis_from_angle(w.lara.yaw(), CLIMB_AXIS_MARGIN) else {
        return false;
    };

    let hdif = coll.front.floor.y;
    let sloped = (coll.front_left.floor.y - coll.front_right.floor.y).abs() >= MAX_GRABBABLE_GRADIENT;
    let no_room = coll.front.floor.y - coll.front.ceiling.y < Length(0)
        || coll.front_left.floor.y - coll.front_left.ceiling.y < Length(0)
        || coll.front_right.floor.y - coll.front_right.ceiling.y < Length(0);

    if hdif >= -CLIMB_LIMIT_2_CLICK_MAX && hdif <= -CLIMB_LIMIT_2_CLICK_MIN {
        if sloped || no_room {
            return false;
        }
        set_anim(w, anim_ids::VAULT12);
        w.lara.set_current(LaraStateId::Climbing);
        w.lara.set_goal(LaraStateId::Stop);
        w.lara.state.location.position.y += QUARTER_SECTOR_SIZE * 2 + hdif;
    } else if hdif >= -CLIMB_LIMIT_3_CLICK_MAX && hdif <= -CLIMB_LIMIT_2_CLICK_MAX {
        if sloped || no_room {
            return false;
        }
        set_anim(w, anim_ids::VAULT34);
        w.lara.set_current(LaraStateId::Climbing);
        w.lara.set_goal(LaraStateId::Stop);
        w.lara.state.location.position.y += QUARTER_SECTOR_SIZE * 3 + hdif;
    } else if !sloped && hdif >= -JUMP_REACHABLE_HEIGHT && hdif <= -CLIMB_LIMIT_3_CLICK_MAX {
        set_anim(w, anim_ids::STAY_SOLID);
        w.lara.set_goal(LaraStateId::JumpUp);
        w.lara.set_current(LaraStateId::Stop);
        let v = (-2 * GRAVITY.get() * (hdif.get() + 800)) as f32;
        w.lara.fall_speed_override = Speed(-(v.sqrt() as i32 + 3));
        update_impl(w);
    } else {
        return false;
    }

    w.lara.state.rotation.y = snap_rotation(axis);
    w.lara.apply_shift(coll);
    w.lara.hand_status = HandStatus::Grabbing;
    log::debug!("avatar climbs a ledge {} above", -hdif);
    true
}

/// Stops at walls straight ahead and slides along walls hit at an angle.
/// Returns true when the avatar was stopped.
pub fn check_wall_collision(w: &mut World, coll: &CollisionInfo) -> bool {
    match coll.collision_type {
        AxisColl::Front | AxisColl::FrontTop => {
            w.lara.apply_shift(coll);
            w.lara.set_goal(LaraStateId::Stop);
            w.lara.state.falling = false;
            w.lara.state.speed = Speed(0);
            true
        }
        AxisColl::FrontLeft => {
            w.lara.apply_shift(coll);
            w.lara.state.rotation.y += EDGE_DEFLECTION;
            false
        }
        AxisColl::FrontRight => {
            w.lara.apply_shift(coll);
            w.lara.state.rotation.y -= EDGE_DEFLECTION;
            false
        }
        _ => false,
    }
}

/// Returns to the standing animation after bumping into something.
pub fn collide_stop(w: &mut World) {
    set_anim(w, anim_ids::STAY_SOLID);
    w.lara.set_goal(LaraStateId::Stop);
    w.lara.set_current(LaraStateId::Stop);
}

/// Starts a fall when the floor drops away more than two clicks.
pub fn try_start_falling(w: &mut World, coll: &CollisionInfo) -> bool {
    if coll.mid.floor.y <= CLIMB_LIMIT_2_CLICK_MIN {
        return false;
    }
    set_anim(w, anim_ids::FREE_FALL_FORWARD);
    w.lara.set_goal(LaraStateId::JumpForward);
    w.lara.set_current(LaraStateId::JumpForward);
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = true;
    true
}

/// Starts sliding down a steep floor, facing down the slope or away from it.
pub fn try_start_slide(w: &mut World, coll: &CollisionInfo) -> bool {
    let (sx, sz) = (coll.floor_slant_x as i32, coll.floor_slant_z as i32);
    if sx.abs() <= 2 && sz.abs() <= 2 {
        return false;
    }

    let mut angle = Angle::ZERO;
    if sx > 2 {
        angle = Angle::deg(-90);
    } else if sx < -2 {
        angle = Angle::deg(90);
    }
    if sz > 2 && sz > sx.abs() {
        angle = Angle::deg(180);
    } else if sz < -2 && -sz > sx.abs() {
        angle = Angle::ZERO;
    }

    let dy = angle - w.lara.yaw();
    w.lara.apply_shift(coll);
    if dy >= Angle::deg(-90) && dy <= Angle::deg(90) {
        if w.lara.current_state() != LaraStateId::SlideForward || w.lara.current_slide_angle != angle {
            set_anim(w, anim_ids::SLIDE);
            w.lara.set_goal(LaraStateId::SlideForward);
            w.lara.set_current(LaraStateId::SlideForward);
            w.lara.state.rotation.y = angle;
        }
    } else if w.lara.current_state() != LaraStateId::SlideBackward || w.lara.current_slide_angle != angle {
        set_anim(w, anim_ids::SLIDE_BACK);
        w.lara.set_goal(LaraStateId::SlideBackward);
        w.lara.set_current(LaraStateId::SlideBackward);
        w.lara.state.rotation.y = angle + Angle::deg(180);
    }
    w.lara.movement_angle = angle;
    w.lara.current_slide_angle = angle;
    true
}

/// Airborne response for states that can smash into a wall.
pub fn check_jump_wall_smash(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.apply_shift(coll);
    match coll.collision_type {
        AxisColl::Front | AxisColl::FrontTop => {
            set_anim(w, anim_ids::SMASH_JUMP);
            w.lara.set_goal(LaraStateId::FreeFall);
            w.lara.set_current(LaraStateId::FreeFall);
            w.lara.state.speed /= 4;
            w.lara.movement_angle -= Angle::deg(180);
            if w.lara.state.fallspeed <= Speed(0) {
                w.lara.state.fallspeed = Speed(1);
            }
        }
        AxisColl::Top => {
            if w.lara.state.fallspeed <= Speed(0) {
                w.lara.state.fallspeed = Speed(1);
            }
        }
        AxisColl::Jammed => jammed_in_air(w, coll),
        AxisColl::FrontLeft => w.lara.state.rotation.y += EDGE_DEFLECTION,
        AxisColl::FrontRight => w.lara.state.rotation.y -= EDGE_DEFLECTION,
        _ => {}
    }
}

/// Airborne response for states that brush along walls.
pub fn jump_against_wall(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.apply_shift(coll);
    match coll.collision_type {
        AxisColl::FrontLeft => w.lara.state.rotation.y += EDGE_DEFLECTION,
        AxisColl::FrontRight => w.lara.state.rotation.y -= EDGE_DEFLECTION,
        AxisColl::Top | AxisColl::FrontTop => {
            if w.lara.state.fallspeed <= Speed(0) {
                w.lara.state.fallspeed = Speed(1);
            }
        }
        AxisColl::Jammed => jammed_in_air(w, coll),
        _ => {}
    }
}

fn jammed_in_air(w: &mut World, coll: &mut CollisionInfo) {
    let back = pitch(Length(100), coll.facing_angle);
    w.lara.state.location.position -= back;
    w.lara.state.speed = Speed(0);
    coll.mid.floor.y = Length(0);
    if w.lara.state.fallspeed <= Speed(0) {
        w.lara.state.fallspeed = Speed(16);
    }
}

/// Damage from hitting the ground at the current fall speed. Returns true
/// when the landing was fatal.
pub fn apply_landing_damage(w: &mut World) -> bool {
    let fs = w.lara.state.fallspeed;
    if w.god_mode() {
        return false;
    }
    if fs >= LANDING_DEATH_SPEED {
        w.lara.state.health = Health(0);
    } else if fs > LANDING_DAMAGE_START {
        w.lara.state.health -= Health(LARA_HEALTH.get() * (fs - LANDING_DAMAGE_START).get() / 8);
    }
    w.lara.is_dead()
}

/// Lands an airborne avatar once the floor is reached. Returns true when
/// it touched down.
pub fn land_if_on_floor(w: &mut World, coll: &CollisionInfo) -> bool {
    if w.lara.state.fallspeed <= Speed(0) || coll.mid.floor.y > Length(0) {
        return false;
    }
    let goal = if apply_landing_damage(w) { LaraStateId::Death } else { LaraStateId::Stop };
    w.lara.set_goal(goal);
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = false;
    w.lara.place_on_floor(coll);
    true
}

/// Catches a ledge the hands passed this frame.
pub fn try_grab_edge(w: &mut World, coll: &mut CollisionInfo) -> bool {
    if !action(w) || w.lara.hand_status != HandStatus::None || coll.has_static_mesh_collision {
        return false;
    }
    if coll.collision_type != AxisColl::Front {
        return false;
    }
    let Some(axis) = axis_from_angle(w.lara.yaw(), GRAB_AXIS_MARGIN) else {
        return false;
    };

    let hdif = coll.front.floor.y + hands_height(w);
    let fs = w.lara.state.fallspeed.per_frame();
    if (hdif < Length(0) && hdif + fs < Length(0)) || (hdif > Length(0) && hdif + fs > Length(0)) {
        return false;
    }
    if (coll.front_left.floor.y - coll.front_right.floor.y).abs() >= MAX_GRABBABLE_GRADIENT {
        return false;
    }

    set_anim(w, anim_ids::HANG);
    w.lara.set_goal(LaraStateId::Hang);
    w.lara.set_current(LaraStateId::Hang);
    w.lara.apply_shift(coll);
    w.lara.state.location.position.y += hdif;
    w.lara.state.rotation.y = snap_rotation(axis);
    w.lara.state.speed = Speed(0);
    w.lara.state.fallspeed = Speed(0);
    w.lara.state.falling = false;
    w.lara.hand_status = HandStatus::Grabbing;
    log::debug!("avatar grabbed a ledge");
    true
}

/// Collision response of the back, left and right jumps.
pub fn common_jump_post(w: &mut World, coll: &mut CollisionInfo, movement: Angle) {
    w.lara.movement_angle = w.lara.yaw() + movement;
    coll.facing_angle = w.lara.movement_angle;
    coll.valid_floor_height = (-CLIMB_LIMIT_2_CLICK_MIN, HEIGHT_LIMIT);
    coll.valid_ceiling_height_min = BAD_JUMP_CEILING;
    probe(w, coll, LARA_WALK_HEIGHT);
    check_jump_wall_smash(w, coll);
    land_if_on_floor(w, coll);
}

/// Collision response of both slide states.
pub fn common_slide_post(w: &mut World, coll: &mut CollisionInfo) {
    coll.valid_floor_height = (Length(-512), HEIGHT_LIMIT);
    coll.valid_ceiling_height_min = Length(0);
    probe(w, coll, LARA_WALK_HEIGHT);

    if stop_if_ceiling_blocked(w, coll) {
        return;
    }
    check_wall_collision(w, coll);

    if coll.mid.floor.y > SLIDE_FALL_HEIGHT {
        if w.lara.current_state() == LaraStateId::SlideForward {
            set_anim(w, anim_ids::FREE_FALL_FORWARD);
            w.lara.set_goal(LaraStateId::JumpForward);
            w.lara.set_current(LaraStateId::JumpForward);
        } else {
            set_anim(w, anim_ids::FREE_FALL_BACK);
            w.lara.set_goal(LaraStateId::FallBackward);
            w.lara.set_current(LaraStateId::FallBackward);
        }
        w.lara.state.fallspeed = Speed(0);
        w.lara.state.falling = true;
        return;
    }

    try_start_slide(w, coll);
    w.lara.place_on_floor(coll);
    if coll.floor_slant_x.abs() <= 2 && coll.floor_slant_z.abs() <= 2 {
        w.lara.set_goal(LaraStateId::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlevel::TestWorld;

    #[test]
    fn test_landing_damage_curve() {
        let mut t = TestWorld::new();
        t.world.lara.state.fallspeed = Speed(130);
        assert!(!apply_landing_damage(&mut t.world));
        assert_eq!(t.world.lara.state.health, LARA_HEALTH);

        t.world.lara.state.fallspeed = Speed(136);
        assert!(!apply_landing_damage(&mut t.world));
        assert_eq!(t.world.lara.state.health, Health(500));

        t.world.lara.state.fallspeed = Speed(140);
        assert!(apply_landing_damage(&mut t.world));
        assert_eq!(t.world.lara.state.health, Health(0));
    }

    #[test]
    fn test_god_mode_skips_landing_damage() {
        let mut t = TestWorld::new();
        t.world.cvars.cheats_allowed = true;
        t.world.cvars.set("g_god", "1");
        t.world.lara.state.fallspeed = Speed(200);
        assert!(!apply_landing_damage(&mut t.world));
        assert_eq!(t.world.lara.state.health, LARA_HEALTH);
    }

    #[test]
    fn test_ceiling_block_restores_position() {
        let mut t = TestWorld::new();
        let coll = CollisionInfo {
            collision_type: AxisColl::Top,
            initial_position: Position::new(1000, 0, 1000),
            ..Default::default()
        };
        t.world.lara.state.speed = Speed(40);
        assert!(stop_if_ceiling_blocked(&mut t.world, &coll));
        assert_eq!(t.world.lara.position(), Position::new(1000, 0, 1000));
        assert_eq!(t.world.lara.current_state(), LaraStateId::Stop);
        assert_eq!(t.world.lara.state.speed, Speed(0));
        assert_eq!(t.world.lara.skeleton.anim, anim_ids::STAY_SOLID);
    }

    #[test]
    fn test_wall_deflects_on_side_hit() {
        let mut t = TestWorld::new();
        let yaw = t.world.lara.yaw();
        let coll = CollisionInfo { collision_type: AxisColl::FrontLeft, ..Default::default() };
        assert!(!check_wall_collision(&mut t.world, &coll));
        assert_eq!(t.world.lara.yaw(), yaw + EDGE_DEFLECTION);

        let coll = CollisionInfo { collision_type: AxisColl::Front, ..Default::default() };
        t.world.lara.state.speed = Speed(20);
        assert!(check_wall_collision(&mut t.world, &coll));
        assert_eq!(t.world.lara.state.speed, Speed(0));
        assert_eq!(t.world.lara.goal_state(), LaraStateId::Stop);
    }

    #[test]
    fn test_steep_slant_starts_slide_down_the_slope() {
        let mut t = TestWorld::new();
        let coll = CollisionInfo { floor_slant_z: -4, ..Default::default() };
        assert!(try_start_slide(&mut t.world, &coll));
        assert_eq!(t.world.lara.current_state(), LaraStateId::SlideForward);
        assert_eq!(t.world.lara.yaw(), Angle::ZERO);

        let coll = CollisionInfo { floor_slant_z: 4, ..Default::default() };
        assert!(try_start_slide(&mut t.world, &coll));
        assert_eq!(t.world.lara.current_state(), LaraStateId::SlideBackward);
        assert_eq!(t.world.lara.yaw(), Angle::ZERO);
        assert_eq!(t.world.lara.movement_angle, Angle::deg(180));
    }

    #[test]
    fn test_gentle_slant_does_not_slide() {
        let mut t = TestWorld::new();
        let coll = CollisionInfo { floor_slant_x: 2, floor_slant_z: -2, ..Default::default() };
        assert!(!try_start_slide(&mut t.world, &coll));
    }

    #[test]
    fn test_jump_smash_turns_movement_around() {
        let mut t = TestWorld::new();
        let mut coll = CollisionInfo { collision_type: AxisColl::Front, ..Default::default() };
        t.world.lara.state.speed = Speed(40);
        t.world.lara.state.fallspeed = Speed(-10);
        t.world.lara.movement_angle = Angle::ZERO;
        check_jump_wall_smash(&mut t.world, &mut coll);
        assert_eq!(t.world.lara.current_state(), LaraStateId::FreeFall);
        assert_eq!(t.world.lara.state.speed, Speed(10));
        assert_eq!(t.world.lara.state.fallspeed, Speed(1));
        assert_eq!(t.world.lara.movement_angle, Angle::deg(180));
    }
}
