// mod.rs — Dispatch table of the avatar's motion states
//
// Every state id maps to a pair of plain functions: `input` runs every
// render frame before the animation advances and may change the goal
// state; `postprocess` runs on physics frames after the animation has
// advanced, probes the surroundings and reacts to them.

pub mod air;
pub mod common;
pub mod death;
pub mod ground;
pub mod hang;
pub mod interact;
pub mod onwater;
pub mod slide;
pub mod underwater;

use trx_common::collision::CollisionInfo;

use crate::lara::state::{LaraStateId, LARA_STATE_COUNT};
use crate::world::World;

pub type HandlerFn = fn(&mut World, &mut CollisionInfo);

#[derive(Clone, Copy)]
pub struct StateHandler {
    pub input: HandlerFn,
    pub postprocess: HandlerFn,
}

const fn h(input: HandlerFn, postprocess: HandlerFn) -> StateHandler {
    StateHandler { input, postprocess }
}

static HANDLERS: [StateHandler; LARA_STATE_COUNT] = [
    h(ground::walk_forward_input, ground::walk_forward_post),       // 0 WalkForward
    h(ground::run_forward_input, ground::run_forward_post),         // 1 RunForward
    h(ground::stop_input, ground::stop_post),                       // 2 Stop
    h(air::jump_forward_input, air::jump_forward_post),             // 3 JumpForward
    h(ground::pose_input, ground::stop_post),                       // 4 Pose
    h(ground::run_back_input, ground::run_back_post),               // 5 RunBack
    h(ground::turn_right_slow_input, ground::turn_slow_post),       // 6 TurnRightSlow
    h(ground::turn_left_slow_input, ground::turn_slow_post),        // 7 TurnLeftSlow
    h(death::death_input, death::death_post),                       // 8 Death
    h(air::free_fall_input, air::free_fall_post),                   // 9 FreeFall
    h(hang::hang_input, hang::hang_post),                           // 10 Hang
    h(air::reach_input, air::reach_post),                           // 11 Reach
    h(common::no_input, ground::stop_post),                         // 12 Unknown12
    h(underwater::stop_input, underwater::common_post),             // 13 UnderwaterStop
    h(common::no_input, ground::stop_post),                         // 14 GrabToFall
    h(air::jump_prepare_input, air::jump_prepare_post),             // 15 JumpPrepare
    h(ground::walk_backward_input, ground::walk_backward_post),     // 16 WalkBackward
    h(underwater::forward_input, underwater::common_post),          // 17 UnderwaterForward
    h(underwater::inertia_input, underwater::common_post),          // 18 UnderwaterInertia
    h(common::no_input, common::default_post),                     // 19 Climbing
    h(ground::turn_fast_input, ground::turn_slow_post),             // 20 TurnFast
    h(ground::step_right_input, ground::step_post),                 // 21 StepRight
    h(ground::step_left_input, ground::step_post),                  // 22 StepLeft
    h(common::no_input, ground::roll_backward_post),                // 23 RollBackward
    h(slide::slide_forward_input, slide::slide_forward_post),       // 24 SlideForward
    h(air::jump_back_input, air::jump_back_post),                   // 25 JumpBack
    h(air::jump_side_input, air::jump_right_post),                  // 26 JumpRight
    h(air::jump_side_input, air::jump_left_post),                   // 27 JumpLeft
    h(air::jump_up_input, air::jump_up_post),                       // 28 JumpUp
    h(air::fall_backward_input, air::fall_backward_post),           // 29 FallBackward
    h(hang::shimmy_left_input, hang::shimmy_left_post),             // 30 ShimmyLeft
    h(hang::shimmy_right_input, hang::shimmy_right_post),           // 31 ShimmyRight
    h(slide::slide_backward_input, slide::slide_backward_post),     // 32 SlideBackward
    h(onwater::stop_input, onwater::stop_post),                     // 33 OnWaterStop
    h(onwater::forward_input, onwater::forward_post),               // 34 OnWaterForward
    h(underwater::diving_input, underwater::common_post),           // 35 UnderwaterDiving
    h(interact::pushable_input, interact::pushable_post),           // 36 PushablePush
    h(interact::pushable_input, interact::pushable_post),           // 37 PushablePull
    h(interact::pushable_grab_input, interact::pushable_grab_post), // 38 PushableGrab
    h(interact::pick_up_input, interact::interaction_post),         // 39 PickUp
    h(interact::switch_input, interact::interaction_post),          // 40 SwitchDown
    h(interact::switch_input, interact::interaction_post),          // 41 SwitchUp
    h(interact::insert_input, interact::interaction_post),          // 42 InsertKey
    h(interact::insert_input, interact::interaction_post),          // 43 InsertPuzzle
    h(death::water_death_input, death::water_death_post),           // 44 WaterDeath
    h(common::no_input, ground::roll_forward_post),                 // 45 RollForward
    h(death::boulder_death_input, death::death_post),               // 46 BoulderDeath
    h(onwater::backward_input, onwater::backward_post),             // 47 OnWaterBackward
    h(onwater::left_input, onwater::left_post),                     // 48 OnWaterLeft
    h(onwater::right_input, onwater::right_post),                   // 49 OnWaterRight
    h(interact::use_midas_input, interact::interaction_post),       // 50 UseMidas
    h(death::midas_death_input, death::midas_death_post),           // 51 MidasDeath
    h(air::swandive_begin_input, air::swandive_begin_post),         // 52 SwandiveBegin
    h(air::swandive_end_input, air::swandive_end_post),             // 53 SwandiveEnd
    h(common::no_input, common::default_post),                      // 54 Handstand
    h(interact::water_exit_input, common::default_post),            // 55 OnWaterExit
];

pub fn handler(state: LaraStateId) -> &'static StateHandler {
    &HANDLERS[state.id() as usize]
}

pub fn handle_input(w: &mut World, coll: &mut CollisionInfo) {
    (handler(w.lara.current_state()).input)(w, coll)
}

pub fn postprocess(w: &mut World, coll: &mut CollisionInfo) {
    (handler(w.lara.current_state()).postprocess)(w, coll)
}
