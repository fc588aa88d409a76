// interact.rs — Pushing blocks, switches, keyholes, pickups and the Midas hand

use trx_common::collision::{CollisionInfo, CollisionPolicies};
use trx_common::units::*;

use super::common::{action, default_post};
use crate::camera::CameraModifier;
use crate::lara::state::LaraStateId;
use crate::world::World;

const CLOSE_UP: Length = SECTOR_SIZE;

/// Interactions pin the avatar in place; nothing may shove it around.
fn hold_still(coll: &mut CollisionInfo) {
    coll.policies.remove(CollisionPolicies::SPAZ_PUSH);
}

fn look_at(w: &mut World, x: Angle, y: Angle, distance: Option<Length>) {
    w.camera.set_rotation_around_lara_x(x);
    w.camera.set_rotation_around_lara_y(y);
    if let Some(d) = distance {
        w.camera.set_distance(d);
    }
}

pub fn pushable_input(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    w.camera.set_modifier(CameraModifier::FollowCenter);
    look_at(w, Angle::deg(-25), Angle::deg(35), None);
}

pub fn pushable_post(w: &mut World, coll: &mut CollisionInfo) {
    default_post(w, coll);
}

pub fn pushable_grab_input(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    w.camera.set_rotation_around_lara_y(Angle::deg(75));
    if !action(w) {
        w.lara.set_goal(LaraStateId::Stop);
    }
}

pub fn pushable_grab_post(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    default_post(w, coll);
}

pub fn pick_up_input(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    look_at(w, Angle::deg(-15), Angle::deg(-130), Some(CLOSE_UP));
}

pub fn switch_input(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    look_at(w, Angle::deg(-25), Angle::deg(80), Some(CLOSE_UP));
}

pub fn insert_input(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    look_at(w, Angle::deg(-25), Angle::deg(-80), Some(CLOSE_UP));
}

pub fn use_midas_input(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    look_at(w, Angle::deg(-15), Angle::deg(-130), Some(CLOSE_UP));
}

pub fn water_exit_input(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    w.camera.set_modifier(CameraModifier::FollowCenter);
}

pub fn interaction_post(w: &mut World, coll: &mut CollisionInfo) {
    hold_still(coll);
    default_post(w, coll);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlevel::TestWorld;

    #[test]
    fn test_interactions_disable_pushing() {
        let mut t = TestWorld::new();
        let mut coll = CollisionInfo { policies: CollisionPolicies::SPAZ_PUSH, ..Default::default() };
        switch_input(&mut t.world, &mut coll);
        assert!(!coll.policies.intersects(CollisionPolicies::SPAZ_PUSH));
    }

    #[test]
    fn test_releasing_action_lets_go_of_block() {
        let mut t = TestWorld::new();
        let mut coll = CollisionInfo::default();
        t.world.lara.set_current(LaraStateId::PushableGrab);
        t.world.lara.set_goal(LaraStateId::PushableGrab);
        pushable_grab_input(&mut t.world, &mut coll);
        assert_eq!(t.world.lara.goal_state(), LaraStateId::Stop);
    }
}
