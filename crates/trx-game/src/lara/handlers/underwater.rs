// underwater.rs — Diving: swim strokes, gliding and bumping into geometry

use trx_common::collision::{AxisColl, CollisionInfo};
use trx_common::input::AxisMovement;
use trx_common::units::*;

use crate::lara::state::LaraStateId;
use crate::world::World;

const STROKE_ACCELERATION: Speed = Speed(8);
const GLIDE_DECELERATION: Speed = Speed(6);
const GLIDE_STOP_SPEED: Speed = Speed(133);
const PITCH_RATE: Angle = Angle::deg(2);
const YAW_RATE: Angle = Angle::deg(6);
const ROLL_RATE: Angle = Angle::deg(3);
const STEEP_PITCH: Angle = Angle::deg(35);
const WALL_TURN: Angle = Angle::deg(5);

/// Pitch, yaw and roll from the movement axes.
fn swim_turn(w: &mut World) {
    let r = &mut w.lara.state.rotation;
    match w.input_state.z_movement {
        AxisMovement::Forward => r.x -= PITCH_RATE.to_render_unit(),
        AxisMovement::Backward => r.x += PITCH_RATE.to_render_unit(),
        _ => {}
    }
    match w.input_state.x_movement {
        AxisMovement::Left => {
            r.y -= YAW_RATE.to_render_unit();
            r.z -= ROLL_RATE.to_render_unit();
        }
        AxisMovement::Right => {
            r.y += YAW_RATE.to_render_unit();
            r.z += ROLL_RATE.to_render_unit();
        }
        _ => {}
    }
}

fn glide(w: &mut World) {
    if w.is_physics_frame() {
        w.lara.state.fallspeed = (w.lara.state.fallspeed - GLIDE_DECELERATION).max(Speed(0));
    }
}

pub fn stop_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::WaterDeath);
        return;
    }
    swim_turn(w);
    if w.input_state.jump {
        w.lara.set_goal(LaraStateId::UnderwaterForward);
    }
    glide(w);
}

pub fn forward_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::WaterDeath);
        return;
    }
    swim_turn(w);
    if w.is_physics_frame() {
        w.lara.state.fallspeed = (w.lara.state.fallspeed + STROKE_ACCELERATION).min(UNDERWATER_MAX_SPEED);
    }
    if !w.input_state.jump {
        w.lara.set_goal(LaraStateId::UnderwaterInertia);
    }
}

pub fn inertia_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.lara.is_dead() {
        w.lara.set_goal(LaraStateId::WaterDeath);
        return;
    }
    swim_turn(w);
    if w.input_state.jump {
        w.lara.set_goal(LaraStateId::UnderwaterForward);
    }
    glide(w);
    if w.lara.state.fallspeed <= GLIDE_STOP_SPEED {
        w.lara.set_goal(LaraStateId::UnderwaterStop);
    }
}

pub fn diving_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.input_state.z_movement == AxisMovement::Forward {
        w.lara.state.rotation.x -= Angle::deg(1).to_render_unit();
    }
}

pub fn common_post(w: &mut World, coll: &mut CollisionInfo) {
    let pitch = w.lara.state.rotation.x;
    w.lara.movement_angle = if pitch.abs() > Angle::deg(90) { w.lara.yaw() + Angle::deg(180) } else { w.lara.yaw() };
    coll.facing_angle = w.lara.movement_angle;
    let probe = w.lara.state.location.moved(Position::new(0, LARA_DIVE_GROUND_ELEVATION.get(), 0));
    w.collision_probe(coll, &probe, LARA_DIVE_HEIGHT);
    react_to_collision(w, coll);
}

/// Steers away from walls, floors and ceilings the diver ran into.
pub fn react_to_collision(w: &mut World, coll: &CollisionInfo) {
    w.lara.apply_shift(coll);
    let s = &mut w.lara.state;
    match coll.collision_type {
        AxisColl::Front => {
            if s.rotation.x > STEEP_PITCH {
                s.rotation.x += PITCH_RATE;
            } else if s.rotation.x < -STEEP_PITCH {
                s.rotation.x -= PITCH_RATE;
            } else {
                s.fallspeed = Speed(0);
            }
        }
        AxisColl::Top => s.rotation.x -= PITCH_RATE,
        AxisColl::FrontTop => s.fallspeed = Speed(0),
        AxisColl::FrontLeft => s.rotation.y += WALL_TURN,
        AxisColl::FrontRight => s.rotation.y -= WALL_TURN,
        AxisColl::Jammed => {
            s.location.position = coll.initial_position;
            s.fallspeed = Speed(0);
            return;
        }
        _ => {}
    }
    if coll.mid.floor.y < Length(0) {
        s.location.position.y += coll.mid.floor.y;
        s.rotation.x += PITCH_RATE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlevel::{self, TestWorld};
    use trx_common::input::InputState;

    fn dive(t: &mut TestWorld) {
        testlevel::place_lara(&mut t.world, testlevel::WATER_ROOM, Position::new(1536, 2048, 1536));
        t.world.lara.underwater_state = crate::lara::UnderwaterState::Diving;
    }

    #[test]
    fn test_stroke_accelerates_to_cap() {
        let mut t = TestWorld::new();
        dive(&mut t);
        let mut coll = CollisionInfo::default();
        t.world.input_state = InputState { jump: true, ..Default::default() };
        t.world.lara.state.fallspeed = Speed(196);
        forward_input(&mut t.world, &mut coll);
        assert_eq!(t.world.lara.state.fallspeed, UNDERWATER_MAX_SPEED);
    }

    #[test]
    fn test_glide_slows_to_stop() {
        let mut t = TestWorld::new();
        dive(&mut t);
        let mut coll = CollisionInfo::default();
        t.world.lara.set_goal(LaraStateId::UnderwaterInertia);
        t.world.lara.state.fallspeed = Speed(138);
        inertia_input(&mut t.world, &mut coll);
        assert_eq!(t.world.lara.state.fallspeed, Speed(132));
        assert_eq!(t.world.lara.goal_state(), LaraStateId::UnderwaterStop);
    }

    #[test]
    fn test_head_on_wall_stops_diver() {
        let mut t = TestWorld::new();
        dive(&mut t);
        t.world.lara.state.fallspeed = Speed(100);
        let coll = CollisionInfo { collision_type: AxisColl::Front, ..Default::default() };
        react_to_collision(&mut t.world, &coll);
        assert_eq!(t.world.lara.state.fallspeed, Speed(0));

        t.world.lara.state.fallspeed = Speed(100);
        t.world.lara.state.rotation.x = Angle::deg(40);
        react_to_collision(&mut t.world, &coll);
        assert_eq!(t.world.lara.state.fallspeed, Speed(100));
        assert_eq!(t.world.lara.state.rotation.x, Angle::deg(42));
    }

    #[test]
    fn test_dead_diver_sinks() {
        let mut t = TestWorld::new();
        dive(&mut t);
        let mut coll = CollisionInfo::default();
        t.world.lara.state.health = Health(0);
        stop_input(&mut t.world, &mut coll);
        assert_eq!(t.world.lara.goal_state(), LaraStateId::WaterDeath);
    }
}
