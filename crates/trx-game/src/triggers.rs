// triggers.rs — Command sequence interpreter
//
// A sector's floor data may end in a `Death` chunk and/or a
// `CommandSequence` chunk. The sequence carries an activation request and
// a condition; when the condition holds its commands run in order. Room
// swaps requested on the way are applied once, after the last command.

use thiserror::Error;
use trx_common::error::FloorDataError;
use trx_common::floordata::{
    self, ActivationState, ChunkType, CommandOpcode, FloorDataChunk, SequenceCommand, SequenceCondition,
};
use trx_common::units::*;

use crate::audio_engine::SECRET_TRACK;
use crate::effects;
use crate::lara::{self, HandStatus, UnderwaterRoute};
use crate::object_state::TriggerState;
use crate::objects::{self, keyhole, pickup, switch};
use crate::world::World;

pub const MAP_FLIP_COUNT: usize = 10;
const SECRET_COUNT: u16 = 16;
/// Underwater current strength per unit of the sink's strength.
const CURRENT_STRENGTH_SCALE: i32 = 6;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(transparent)]
    FloorData(#[from] FloorDataError),
    #[error("expected a command sequence at floor data word {index}, found {found:?}")]
    NotACommandSequence { index: usize, found: ChunkType },
    #[error("trigger condition at word {index} names missing object {object}")]
    MissingObject { index: usize, object: u16 },
}

fn chunk_at(w: &World, index: usize) -> Result<FloorDataChunk, TriggerError> {
    let word = w.floor_data.get(index).copied().ok_or(FloorDataError::Truncated { index })?;
    Ok(FloorDataChunk::decode(word, index)?)
}

/// Avatar stands on the floor it has cached.
fn lara_on_floor(w: &World) -> bool {
    w.lara.position().y == w.lara.state.floor
}

/// Runs the trigger chunks starting at floor data word `index`. Heavy
/// triggers come from objects and only fire `ItemIsHere` sequences.
pub fn handle_command_sequence(w: &mut World, index: Option<usize>, from_heavy: bool) -> Result<(), TriggerError> {
    let Some(mut index) = index else {
        return Ok(());
    };

    let chunk = chunk_at(w, index)?;
    if chunk.chunk_type == ChunkType::Death {
        if !from_heavy && lara_on_floor(w) {
            lara::burn_if_alive(w);
        }
        if chunk.is_last {
            return Ok(());
        }
        index += 1;
    }

    let chunk = chunk_at(w, index)?;
    if chunk.chunk_type != ChunkType::CommandSequence {
        return Err(TriggerError::NotACommandSequence { index, found: chunk.chunk_type });
    }
    let seq = floordata::decode_command_sequence(&w.floor_data, index)?;
    w.camera.refresh_from_sequence(&seq);

    let mut commands = seq.commands.as_slice();
    let mut switch_is_on = false;
    if from_heavy {
        if seq.condition != SequenceCondition::ItemIsHere {
            return Ok(());
        }
    } else {
        let subject = if seq.condition.references_object() {
            let Some((first, rest)) = commands.split_first() else {
                return Ok(());
            };
            commands = rest;
            let object = first.command().parameter;
            if w.objects.get(object).is_none() {
                return Err(TriggerError::MissingObject { index, object });
            }
            Some(object)
        } else {
            None
        };
        if !evaluate_condition(w, seq.condition, &seq.activation, subject, &mut switch_is_on) {
            return Ok(());
        }
    }

    let request = seq.activation;
    let condition = seq.condition;
    let mut swap_rooms = false;
    let mut flip_effect = None;

    for cmd in commands {
        let c = *cmd.command();
        match (c.opcode, cmd) {
            (CommandOpcode::Activate, _) => activate_object(w, c.parameter, &request, condition),
            (CommandOpcode::SwitchCamera, SequenceCommand::Camera(_, params)) => {
                let switch_is_off = condition == SequenceCondition::ItemActivated && !switch_is_on;
                w.camera.switch_camera(c.parameter as usize, params, from_heavy, switch_is_off);
            }
            (CommandOpcode::SwitchCamera, SequenceCommand::Plain(_)) => {}
            (CommandOpcode::LookAt, _) => w.camera.set_look_at(c.parameter),
            (CommandOpcode::UnderwaterCurrent, _) => underwater_current(w, c.parameter as usize),
            (CommandOpcode::FlipMap, _) => {
                let Some(state) = w.map_flip_activation_states.get_mut(c.parameter as usize) else {
                    log::warn!("flip map {} out of range", c.parameter);
                    continue;
                };
                if flip_map_command(state, &request, condition, w.rooms_are_swapped) {
                    swap_rooms = true;
                }
            }
            (CommandOpcode::FlipOn, _) => {
                let on = w.map_flip_activation_states.get(c.parameter as usize).is_some_and(|s| s.is_fully_activated());
                if !w.rooms_are_swapped && on {
                    swap_rooms = true;
                }
            }
            (CommandOpcode::FlipOff, _) => {
                let on = w.map_flip_activation_states.get(c.parameter as usize).is_some_and(|s| s.is_fully_activated());
                if w.rooms_are_swapped && on {
                    swap_rooms = true;
                }
            }
            (CommandOpcode::FlipEffect, _) => flip_effect = Some(c.parameter),
            (CommandOpcode::EndLevel, _) => {
                log::info!("level end triggered");
                w.finished = true;
            }
            (CommandOpcode::PlayTrack, _) => {
                let state = w.lara.current_state();
                if w.audio.trigger_cd_track(&mut w.rng, c.parameter, &request, condition, state) {
                    log::info!("final track played out, level finished");
                    w.finished = true;
                }
            }
            (CommandOpcode::Secret, _) => secret_found(w, c.parameter),
        }
    }

    if swap_rooms {
        w.swap_all_rooms();
    }
    if let Some(id) = flip_effect {
        effects::set_global_effect(w, id);
    }
    Ok(())
}

fn evaluate_condition(
    w: &mut World,
    condition: SequenceCondition,
    request: &ActivationState,
    subject: Option<u16>,
    switch_is_on: &mut bool,
) -> bool {
    match condition {
        SequenceCondition::LaraIsHere => true,
        SequenceCondition::LaraOnGround | SequenceCondition::LaraOnGroundInverted => lara_on_floor(w),
        SequenceCondition::ItemActivated => {
            let Some(id) = subject else {
                return false;
            };
            if !switch::trigger_switch(w, id, request.timeout) {
                return false;
            }
            *switch_is_on = w.objects.get(id).is_some_and(|o| o.state.current_anim_state == 1);
            true
        }
        SequenceCondition::KeyUsed => subject.is_some_and(|id| keyhole::trigger_key(w, id)),
        SequenceCondition::ItemPickedUp => subject.is_some_and(|id| pickup::trigger_pickup(w, id)),
        SequenceCondition::LaraInCombatMode => w.lara.hand_status == HandStatus::Combat,
        SequenceCondition::ItemIsHere | SequenceCondition::Dummy => false,
    }
}

/// Folds the request into object `id` and starts it once fully on.
pub fn activate_object(w: &mut World, id: u16, request: &ActivationState, condition: SequenceCondition) {
    let Some(obj) = w.objects.get_mut(id) else {
        log::warn!("trigger names missing object {}", id);
        return;
    };
    if !obj.state.apply_activation(request, condition) {
        return;
    }
    if obj.state.is_active {
        return;
    }
    let wakes = matches!(obj.state.trigger_state, TriggerState::Inactive | TriggerState::Invisible);
    if !wakes && obj.kind.is_agent() {
        return;
    }
    log::debug!("trigger activates object {}", id);
    obj.state.trigger_state = TriggerState::Active;
    obj.state.touch_bits = 0;
    objects::activate(w, id);
}

/// Folds a request into a flip map's state. Returns true when the rooms
/// have to swap to match it.
pub fn flip_map_command(
    state: &mut ActivationState,
    request: &ActivationState,
    condition: SequenceCondition,
    rooms_are_swapped: bool,
) -> bool {
    if state.oneshot {
        return false;
    }
    if condition == SequenceCondition::ItemActivated {
        state.xor_assign(request);
    } else {
        state.or_assign(request);
    }
    if state.is_fully_activated() {
        if request.oneshot {
            state.oneshot = true;
        }
        return !rooms_are_swapped;
    }
    rooms_are_swapped
}

fn underwater_current(w: &mut World, sink: usize) {
    let Some(sink) = w.camera_sinks.get(sink).copied() else {
        log::warn!("underwater current names missing sink {}", sink);
        return;
    };
    if w.lara.underwater_route.map(|r| r.box_index) != Some(sink.box_index) {
        w.lara.underwater_route = Some(UnderwaterRoute { target: sink.position, box_index: sink.box_index });
    }
    w.lara.underwater_current_strength = Length(CURRENT_STRENGTH_SCALE * sink.strength);
}

fn secret_found(w: &mut World, n: u16) {
    if n >= SECRET_COUNT {
        log::warn!("secret {} out of range", n);
        return;
    }
    let bit = 1u16 << n;
    if w.secrets_found & bit != 0 {
        return;
    }
    log::debug!("secret {} found", n);
    w.secrets_found |= bit;
    w.audio.play_stop_cd_track(&mut w.rng, SECRET_TRACK, false);
    w.player.secrets += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::type_ids;
    use crate::testlevel::{self, TestWorld};

    fn full(oneshot: bool) -> ActivationState {
        ActivationState { activation_set: 0x1f, oneshot, ..Default::default() }
    }

    #[test]
    fn test_no_floor_data_is_a_no_op() {
        let mut t = TestWorld::new();
        assert!(handle_command_sequence(&mut t.world, None, false).is_ok());
    }

    #[test]
    fn test_secret_counts_once() {
        let mut t = TestWorld::new();
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            full(false),
            &[(CommandOpcode::Secret, 5)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert_eq!(t.world.secrets_found, 1 << 5);
        assert_eq!(t.world.player.secrets, 1);
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert_eq!(t.world.secrets_found, 1 << 5);
        assert_eq!(t.world.player.secrets, 1);
    }

    #[test]
    fn test_activate_wakes_object() {
        let mut t = TestWorld::new();
        let door = testlevel::spawn_object(&mut t.world, type_ids::DOOR_1, Position::new(-1536, 0, -1536), Angle::ZERO);
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            full(false),
            &[(CommandOpcode::Activate, door)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        let obj = t.world.objects.get(door).expect("door");
        assert_eq!(obj.state.trigger_state, TriggerState::Active);
        assert!(obj.state.is_active);
        assert!(obj.state.activation_state.is_fully_activated());
    }

    #[test]
    fn test_partial_request_does_not_activate() {
        let mut t = TestWorld::new();
        let door = testlevel::spawn_object(&mut t.world, type_ids::DOOR_1, Position::new(-1536, 0, -1536), Angle::ZERO);
        let request = ActivationState { activation_set: 0x03, ..Default::default() };
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            request,
            &[(CommandOpcode::Activate, door)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        let obj = t.world.objects.get(door).expect("door");
        assert_eq!(obj.state.trigger_state, TriggerState::Inactive);
        assert_eq!(obj.state.activation_state.activation_set, 0x03);
    }

    #[test]
    fn test_death_sector_burns_lara_on_floor() {
        let mut t = TestWorld::new();
        lara::update_floor_height(&mut t.world, Length(0));
        let idx = testlevel::push_death(&mut t.world);
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert!(t.world.lara.is_dead());
    }

    #[test]
    fn test_death_sector_spares_heavy_triggers() {
        let mut t = TestWorld::new();
        lara::update_floor_height(&mut t.world, Length(0));
        let idx = testlevel::push_death(&mut t.world);
        handle_command_sequence(&mut t.world, Some(idx), true).expect("sequence");
        assert!(!t.world.lara.is_dead());
    }

    #[test]
    fn test_heavy_trigger_needs_item_is_here() {
        let mut t = TestWorld::new();
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            full(false),
            &[(CommandOpcode::EndLevel, 0)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), true).expect("sequence");
        assert!(!t.world.finished);

        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::ItemIsHere,
            full(false),
            &[(CommandOpcode::EndLevel, 0)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert!(!t.world.finished);
        handle_command_sequence(&mut t.world, Some(idx), true).expect("sequence");
        assert!(t.world.finished);
    }

    #[test]
    fn test_flip_map_command_toggles_with_switches() {
        let mut state = ActivationState::default();
        let request = full(false);
        assert!(flip_map_command(&mut state, &request, SequenceCondition::ItemActivated, false));
        assert!(state.is_fully_activated());
        assert!(flip_map_command(&mut state, &request, SequenceCondition::ItemActivated, true));
        assert_eq!(state.activation_set, 0);
        assert!(!flip_map_command(&mut state, &request, SequenceCondition::ItemActivated, true));
        assert!(state.is_fully_activated());
    }

    #[test]
    fn test_flip_on_needs_full_activation() {
        let mut t = TestWorld::new();
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            full(false),
            &[(CommandOpcode::FlipOn, 2)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert!(!t.world.rooms_are_swapped);
        t.world.map_flip_activation_states[2].fully_activate();
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert!(t.world.rooms_are_swapped);
    }

    #[test]
    fn test_flip_effect_becomes_global() {
        let mut t = TestWorld::new();
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            full(false),
            &[(CommandOpcode::FlipEffect, effects::EARTHQUAKE)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert_eq!(t.world.active_effect, Some(effects::EARTHQUAKE));
        assert_eq!(t.world.effect_timer, Frame(0));
    }

    #[test]
    fn test_underwater_current_targets_sink() {
        let mut t = TestWorld::new();
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            full(false),
            &[(CommandOpcode::UnderwaterCurrent, 0)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        let sink = t.world.camera_sinks[0];
        assert_eq!(t.world.lara.underwater_route.map(|r| r.target), Some(sink.position));
        assert_eq!(t.world.lara.underwater_current_strength, Length(6 * sink.strength));
    }

    #[test]
    fn test_switch_condition_waits_for_switch() {
        let mut t = TestWorld::new();
        let sw = testlevel::spawn_object(&mut t.world, type_ids::SWITCH, Position::new(512, 0, 512), Angle::ZERO);
        let door = testlevel::spawn_object(&mut t.world, type_ids::DOOR_1, Position::new(-1536, 0, -1536), Angle::ZERO);
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::ItemActivated,
            full(false),
            &[(CommandOpcode::Activate, sw), (CommandOpcode::Activate, door)],
            false,
        );
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert_eq!(t.world.objects.get(door).map(|o| o.state.trigger_state), Some(TriggerState::Inactive));

        if let Some(obj) = t.world.objects.get_mut(sw) {
            obj.state.trigger_state = TriggerState::Deactivated;
            obj.state.current_anim_state = 1;
        }
        handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");
        assert_eq!(t.world.objects.get(door).map(|o| o.state.trigger_state), Some(TriggerState::Active));
        assert_eq!(t.world.objects.get(sw).map(|o| o.state.trigger_state), Some(TriggerState::Inactive));
    }

    #[test]
    fn test_unknown_chunk_is_an_error() {
        let mut t = TestWorld::new();
        let idx = t.world.floor_data.len();
        t.world.floor_data.push(0x001f);
        assert!(handle_command_sequence(&mut t.world, Some(idx), false).is_err());
    }
}
