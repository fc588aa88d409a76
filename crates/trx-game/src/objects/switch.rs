// switch.rs — Wall and underwater switches

use trx_common::collision::CollisionInfo;
use trx_common::input::Action;
use trx_common::units::*;

use super::{animate, animate_lara_until, InteractionLimits, ObjectKind};
use crate::lara::state::LaraStateId;
use crate::lara::HandStatus;
use crate::object_state::TriggerState;
use crate::world::World;

const SWITCH_OFF: u16 = 0;
const SWITCH_ON: u16 = 1;

const WALL_LIMITS: InteractionLimits = InteractionLimits::new(
    Position::new(-200, 0, 312),
    Position::new(200, 0, 512),
    Rotation { x: Angle::deg(10), y: Angle::deg(30), z: Angle::deg(10) },
);

const UNDERWATER_LIMITS: InteractionLimits = InteractionLimits::new(
    Position::new(-1024, -1024, -1024),
    Position::new(1024, 1024, 512),
    Rotation { x: Angle::deg(80), y: Angle::deg(80), z: Angle::deg(80) },
);

pub fn collide(w: &mut World, id: u16, _coll: &mut CollisionInfo) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    let underwater = matches!(obj.kind, ObjectKind::Switch { underwater: true });
    let (resting, limits) = if underwater {
        (LaraStateId::UnderwaterStop, &UNDERWATER_LIMITS)
    } else {
        (LaraStateId::Stop, &WALL_LIMITS)
    };

    if !w.has_action(Action::Action)
        || obj.state.trigger_state != TriggerState::Inactive
        || w.lara.hand_status != HandStatus::None
        || (!underwater && w.lara.state.falling)
        || w.lara.current_state() != resting
        || !limits.can_interact(&w.lara.state, &obj.state)
    {
        return;
    }

    let flip_on = match obj.state.current_anim_state {
        SWITCH_ON => false,
        SWITCH_OFF => true,
        _ => return,
    };
    let yaw = obj.state.rotation.y;
    w.lara.state.rotation.y = yaw;
    if underwater {
        w.lara.state.fallspeed = Speed(0);
    }
    log::debug!("avatar operates switch {}", id);

    if let Some(obj) = w.objects.get_mut(id) {
        obj.state.goal_anim_state = if flip_on { SWITCH_ON } else { SWITCH_OFF };
        obj.state.trigger_state = TriggerState::Active;
        obj.state.is_active = true;
    }
    animate_lara_until(w, if flip_on { LaraStateId::SwitchUp } else { LaraStateId::SwitchDown });
    w.lara.set_goal(resting);
    w.lara.hand_status = HandStatus::Grabbing;
    animate(w, id);
}

pub fn update(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    obj.state.activation_state.fully_activate();
    if !obj.state.update_activation_timeout() {
        obj.state.goal_anim_state = SWITCH_ON;
        obj.state.timer = RenderFrame(0);
    }
    animate(w, id);
}

/// Consumes a switch that finished its animation. Returns false while
/// the switch has not been operated. A switch left off with a timeout
/// stays active to flip back when the time runs out.
pub fn trigger_switch(w: &mut World, id: u16, timeout: u8) -> bool {
    let Some(obj) = w.objects.get_mut(id) else {
        return false;
    };
    let s = &mut obj.state;
    if s.trigger_state != TriggerState::Deactivated {
        return false;
    }
    if s.current_anim_state == SWITCH_OFF && timeout > 0 {
        s.timer = if timeout == 1 { RenderFrame(1) } else { RenderFrame(timeout as i32 * RENDER_FRAME_RATE) };
        s.trigger_state = TriggerState::Active;
        s.is_active = true;
    } else {
        s.trigger_state = TriggerState::Inactive;
        s.is_active = false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::type_ids;
    use crate::testlevel::{self, TestWorld};
    use trx_common::input::ActionSet;

    fn switch_world() -> (TestWorld, u16) {
        let mut t = TestWorld::new();
        let id = testlevel::spawn_object(&mut t.world, type_ids::SWITCH, Position::new(512, 0, 512), Angle::ZERO);
        testlevel::place_lara(&mut t.world, 0, Position::new(512, 0, 512 + 400));
        (t, id)
    }

    #[test]
    fn test_switch_needs_action_and_position() {
        let (mut t, id) = switch_world();
        let mut coll = CollisionInfo::default();
        collide(&mut t.world, id, &mut coll);
        assert_eq!(t.world.objects.get(id).map(|o| o.state.trigger_state), Some(TriggerState::Inactive));

        t.world.actions = ActionSet::ACTION;
        t.world.lara.state.rotation.y = Angle::deg(90);
        collide(&mut t.world, id, &mut coll);
        assert_eq!(t.world.objects.get(id).map(|o| o.state.trigger_state), Some(TriggerState::Inactive));
    }

    #[test]
    fn test_pulling_switch_activates_it() {
        let (mut t, id) = switch_world();
        t.world.actions = ActionSet::ACTION;
        let mut coll = CollisionInfo::default();
        collide(&mut t.world, id, &mut coll);
        let obj = t.world.objects.get(id).expect("switch");
        assert_eq!(obj.state.trigger_state, TriggerState::Active);
        assert_eq!(obj.state.goal_anim_state, SWITCH_ON);
        assert_eq!(t.world.lara.current_state(), LaraStateId::SwitchUp);
        assert_eq!(t.world.lara.hand_status, HandStatus::Grabbing);
    }

    #[test]
    fn test_trigger_switch_consumes_finished_switch() {
        let (mut t, id) = switch_world();
        assert!(!trigger_switch(&mut t.world, id, 0));

        let obj = t.world.objects.get_mut(id).expect("switch");
        obj.state.trigger_state = TriggerState::Deactivated;
        obj.state.current_anim_state = SWITCH_OFF;
        assert!(trigger_switch(&mut t.world, id, 5));
        let obj = t.world.objects.get(id).expect("switch");
        assert_eq!(obj.state.trigger_state, TriggerState::Active);
        assert_eq!(obj.state.timer, RenderFrame(5 * RENDER_FRAME_RATE));

        let obj = t.world.objects.get_mut(id).expect("switch");
        obj.state.trigger_state = TriggerState::Deactivated;
        obj.state.current_anim_state = SWITCH_ON;
        assert!(trigger_switch(&mut t.world, id, 5));
        assert_eq!(t.world.objects.get(id).map(|o| o.state.trigger_state), Some(TriggerState::Inactive));
    }

    #[test]
    fn test_timed_out_switch_flips_back() {
        let (mut t, id) = switch_world();
        let obj = t.world.objects.get_mut(id).expect("switch");
        obj.state.timer = RenderFrame(1);
        obj.state.goal_anim_state = SWITCH_OFF;
        update(&mut t.world, id);
        update(&mut t.world, id);
        let obj = t.world.objects.get(id).expect("switch");
        assert_eq!(obj.state.goal_anim_state, SWITCH_ON);
        assert_eq!(obj.state.timer, RenderFrame(0));
    }
}
