// slide.rs — Sliding down steep slopes, facing down or up the slope

use trx_common::collision::CollisionInfo;
use trx_common::units::*;

use super::common::*;
use crate::lara::state::LaraStateId;
use crate::world::World;

fn jump_pressed(w: &World) -> bool {
    w.input_state.jump
}

pub fn slide_forward_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_rotation_around_lara_x(Angle::deg(-45));
    if jump_pressed(w) {
        w.lara.set_goal(LaraStateId::JumpForward);
    }
}

pub fn slide_forward_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw();
    coll.facing_angle = w.lara.movement_angle;
    common_slide_post(w, coll);
}

pub fn slide_backward_input(w: &mut World, _coll: &mut CollisionInfo) {
    if jump_pressed(w) {
        w.lara.set_goal(LaraStateId::JumpBack);
    }
}

pub fn slide_backward_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.movement_angle = w.lara.yaw() + Angle::deg(180);
    coll.facing_angle = w.lara.movement_angle;
    common_slide_post(w, coll);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlevel::TestWorld;
    use trx_common::input::InputState;

    #[test]
    fn test_jump_off_slide() {
        let mut t = TestWorld::new();
        let mut coll = CollisionInfo::default();
        t.world.lara.set_current(LaraStateId::SlideBackward);
        t.world.input_state = InputState { jump: true, ..Default::default() };
        slide_backward_input(&mut t.world, &mut coll);
        assert_eq!(t.world.lara.goal_state(), LaraStateId::JumpBack);
    }

    #[test]
    fn test_slide_ends_on_flat_floor() {
        let mut t = TestWorld::new();
        t.world.lara.set_current(LaraStateId::SlideForward);
        t.world.lara.set_goal(LaraStateId::SlideForward);
        let mut coll = CollisionInfo { initial_position: t.world.lara.position(), ..Default::default() };
        slide_forward_post(&mut t.world, &mut coll);
        assert_eq!(t.world.lara.goal_state(), LaraStateId::Stop);
        assert_eq!(t.world.lara.position().y, Length(0));
    }
}
