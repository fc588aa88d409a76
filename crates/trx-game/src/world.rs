// world.rs — World controller: owns the level data and runs the frame loop
//
// Every subsystem takes `&mut World`. One `update` call is one render
// frame; the slow half of the simulation only runs on even frames.

use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use trx_common::animation::{Animation, SkeletalModel};
use trx_common::audio::AudioBackend;
use trx_common::collision::CollisionInfo;
use trx_common::cvar::CvarContext;
use trx_common::error::LevelError;
use trx_common::floordata::{ActivationState, FloorDataValue};
use trx_common::height::Geometry;
use trx_common::input::{Action, ActionSet, InputHandler, InputState};
use trx_common::level::{CameraSink, Level, LARA_TYPE_ID};
use trx_common::location::Location;
use trx_common::room::{connect_sectors, BoxArea, Room};
use trx_common::units::*;

use crate::audio_engine::{AudioEngine, StreamFactory};
use crate::camera::CameraController;
use crate::effects;
use crate::lara::{self, LaraObject};
use crate::object_state::TriggerState;
use crate::objects::{self, block, door, ObjectKind, ObjectManager, KIND_BLOCK};
use crate::particles;
use crate::player::{Player, WeaponType, LARGE_MEDIPACK_ITEM, SMALL_MEDIPACK_ITEM};
use crate::triggers::{self, MAP_FLIP_COUNT};

pub struct World {
    pub level_filename: String,
    pub rooms: Vec<Room>,
    /// Level index of the room held in each slot; flips permute it.
    pub room_order: Vec<usize>,
    pub floor_data: Vec<FloorDataValue>,
    pub boxes: Vec<BoxArea>,
    pub animations: Vec<Animation>,
    pub models: HashMap<u16, SkeletalModel>,
    pub camera_sinks: Vec<CameraSink>,

    pub lara: LaraObject,
    pub objects: ObjectManager,
    pub player: Player,
    pub camera: CameraController,
    pub audio: AudioEngine,
    pub cvars: CvarContext,
    pub rng: StdRng,

    pub input: Box<dyn InputHandler>,
    /// Input sampled at the start of the frame.
    pub input_state: InputState,
    pub actions: ActionSet,

    pub map_flip_activation_states: Vec<ActivationState>,
    pub rooms_are_swapped: bool,
    pub secrets_found: u16,
    pub active_effect: Option<u16>,
    pub effect_timer: Frame,
    pub render_frame: RenderFrame,
    /// Set by the end-level command and by fatal errors; the caller stops
    /// the loop.
    pub finished: bool,
}

impl World {
    /// Validates `level` and spawns its items.
    pub fn new(
        level: Level,
        backend: Box<dyn AudioBackend>,
        streams: Box<dyn StreamFactory>,
        input: Box<dyn InputHandler>,
    ) -> Result<World, LevelError> {
        level.validate()?;

        let lara_index = level.items.iter().position(|i| i.type_id == LARA_TYPE_ID).ok_or(LevelError::MissingLara)?;
        let lara_item = &level.items[lara_index];
        let lara_model = level.models.get(&LARA_TYPE_ID).ok_or(LevelError::MissingModel(LARA_TYPE_ID))?;
        let lara = LaraObject::new(
            lara_index as u16,
            Location::new(lara_item.room, lara_item.position),
            lara_item.rotation,
            lara_model,
            &level.animations,
        );

        let Level {
            filename,
            mut rooms,
            floor_data,
            boxes,
            animations,
            models,
            items,
            camera_sinks,
            sound_details,
            sound_map,
            cd_tracks,
            seed,
            ..
        } = level;

        connect_sectors(&mut rooms, &floor_data)?;
        let room_order = (0..rooms.len()).collect();
        let audio = AudioEngine::new(backend, streams, sound_details, sound_map, cd_tracks);

        let mut world = World {
            level_filename: filename,
            rooms,
            room_order,
            floor_data,
            boxes,
            animations,
            models,
            camera: CameraController::new(camera_sinks.len()),
            camera_sinks,
            lara,
            objects: ObjectManager::new(items.len() as u16),
            player: Player::default(),
            audio,
            cvars: CvarContext::with_engine_defaults(),
            rng: StdRng::seed_from_u64(seed),
            input,
            input_state: InputState::default(),
            actions: ActionSet::empty(),
            map_flip_activation_states: vec![ActivationState::default(); MAP_FLIP_COUNT],
            rooms_are_swapped: false,
            secrets_found: 0,
            active_effect: None,
            effect_timer: Frame(0),
            render_frame: RenderFrame(0),
            finished: false,
        };

        for (i, item) in items.iter().enumerate() {
            if i != lara_index {
                objects::spawn(&mut world, i as u16, item);
            }
        }
        lara::update_floor_height(&mut world, Length(0));
        log::info!(
            "level {} loaded: {} rooms, {} objects",
            world.level_filename,
            world.rooms.len(),
            world.objects.len()
        );
        Ok(world)
    }

    /// Physics runs at half the render rate.
    #[inline]
    pub fn is_physics_frame(&self) -> bool {
        self.render_frame.get() % 2 == 0
    }

    pub fn has_action(&self, action: Action) -> bool {
        self.actions.contains(action.into())
    }

    pub fn god_mode(&self) -> bool {
        self.cvars.is_set("g_god")
    }

    pub fn cheat_dive(&self) -> bool {
        self.cvars.is_set("g_cheatdive")
    }

    /// Runs the four-point height probe for a character `height` tall.
    pub fn collision_probe(&self, coll: &mut CollisionInfo, location: &Location, height: Length) {
        let geo = Geometry { rooms: &self.rooms, floor_data: &self.floor_data };
        coll.init_height_info(&geo, &self.objects, location, height);
    }

    pub fn play_lara_sound(&mut self, id: u16) {
        let emitter = self.lara.emitter();
        self.audio.play_sound_effect(&mut self.rng, id, Some(emitter));
    }

    /// Logs a fatal simulation error and ends the level.
    pub fn fail(&mut self, e: impl fmt::Display) {
        log::error!("level {} aborted: {}", self.level_filename, e);
        self.finished = true;
    }

    // ============================================================
    // Room flipping
    // ============================================================

    /// Blocks resting in room `room` that hold a floor patch.
    fn patched_blocks_in(&self, room: usize) -> Vec<u16> {
        self.objects
            .ids_of_kind(KIND_BLOCK)
            .into_iter()
            .filter(|&id| {
                self.objects.get(id).is_some_and(|o| {
                    o.state.location.room == room
                        && o.state.trigger_state != TriggerState::Invisible
                        && matches!(o.kind, ObjectKind::Block { target: None, .. })
                })
            })
            .collect()
    }

    /// Swaps rooms `a` and `b`, carrying block patches and door blockers
    /// along.
    fn swap_room_pair(&mut self, a: usize, b: usize) {
        let mut blocks = self.patched_blocks_in(a);
        blocks.extend(self.patched_blocks_in(b));
        for &id in &blocks {
            block::patch(self, id, false);
        }
        self.rooms.swap(a, b);
        self.rooms[a].alternate_room = Some(b);
        self.rooms[b].alternate_room = Some(a);
        self.room_order.swap(a, b);
        door::remap_rooms(self, a, b);
        for &id in &blocks {
            block::patch(self, id, true);
        }
    }

    /// Swaps every room with its alternate and reconnects the sectors.
    pub fn swap_all_rooms(&mut self) {
        for a in 0..self.rooms.len() {
            let Some(b) = self.rooms[a].alternate_room else {
                continue;
            };
            if b > a && b < self.rooms.len() {
                self.swap_room_pair(a, b);
            }
        }
        self.rooms_are_swapped = !self.rooms_are_swapped;
        log::debug!("rooms swapped: {}", self.rooms_are_swapped);
        if let Err(e) = connect_sectors(&mut self.rooms, &self.floor_data) {
            self.fail(e);
        }
    }

    // ============================================================
    // Frame loop
    // ============================================================

    fn read_input(&mut self) {
        self.input.update();
        self.input_state = self.input.input_state();
        self.actions = ActionSet::empty();
        for action in [
            Action::Action,
            Action::Walk,
            Action::DrawPistols,
            Action::DrawShotgun,
            Action::DrawUzis,
            Action::DrawMagnums,
            Action::Holster,
            Action::ConsumeSmallMedipack,
            Action::ConsumeLargeMedipack,
            Action::Menu,
        ] {
            if self.input.has_action(action) {
                self.actions |= action.into();
            }
        }
    }

    /// Inventory shortcuts: medipacks and weapon requests.
    fn handle_inventory_actions(&mut self) {
        let medipack = if self.input.has_debounced_action(Action::ConsumeSmallMedipack) {
            Some(SMALL_MEDIPACK_ITEM)
        } else if self.input.has_debounced_action(Action::ConsumeLargeMedipack) {
            Some(LARGE_MEDIPACK_ITEM)
        } else {
            None
        };
        if let Some(item) = medipack {
            if self.player.use_medipack(item, &mut self.lara.state.health) {
                log::debug!("medipack {} used, health {}", item, self.lara.state.health);
            }
        }

        for (action, weapon) in [
            (Action::DrawPistols, WeaponType::Pistols),
            (Action::DrawShotgun, WeaponType::Shotgun),
            (Action::DrawUzis, WeaponType::Uzis),
            (Action::DrawMagnums, WeaponType::Magnums),
        ] {
            if self.input.has_debounced_action(action) {
                self.player.request_weapon(weapon);
            }
        }
        if self.input.has_debounced_action(Action::Holster) {
            self.player.requested_weapon = WeaponType::None;
        }
    }

    fn apply_volume_settings(&mut self) {
        self.audio.sfx_volume = self.cvars.variable_value("s_sfxvolume").clamp(0.0, 1.0);
        self.audio.music_volume = self.cvars.variable_value("s_musicvolume").clamp(0.0, 1.0);
    }

    /// Advances the world by one render frame.
    pub fn update(&mut self) {
        if self.finished {
            return;
        }
        self.read_input();
        self.handle_inventory_actions();
        self.apply_volume_settings();

        lara::update(self);
        let trigger = self.lara.floor_trigger;
        if let Err(e) = triggers::handle_command_sequence(self, trigger, false) {
            self.fail(e);
            return;
        }
        objects::update_objects(self);

        if self.is_physics_frame() {
            effects::run_active_effect(self);
            particles::update_particles(&mut self.objects.particles, &self.rooms);
        }

        lara::update_pose(self);
        let (position, yaw) = (self.lara.position(), self.lara.yaw());
        self.camera.update(&mut self.rng, position, yaw, &self.camera_sinks);
        self.audio.update();
        self.render_frame += RenderFrame(1);
    }

    /// Runs `update` until the level finishes or `max_frames` have passed.
    /// Returns the number of frames run.
    pub fn run(&mut self, max_frames: usize) -> usize {
        let mut frames = 0;
        while !self.finished && frames < max_frames {
            self.update();
            frames += 1;
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lara::state::LaraStateId;
    use crate::lara::UnderwaterState;
    use crate::objects::type_ids;
    use crate::testlevel::{self, TestWorld};
    use trx_common::floordata::{CommandOpcode, SequenceCondition, ACTIVATION_FULL};
    use trx_common::input::{AxisMovement, InputFrame, ScriptedInput};

    fn forward() -> InputFrame {
        InputFrame {
            state: InputState { z_movement: AxisMovement::Forward, ..Default::default() },
            actions: ActionSet::empty(),
        }
    }

    #[test]
    fn test_missing_lara_is_rejected() {
        let mut level = testlevel::level();
        level.items.retain(|i| i.type_id != LARA_TYPE_ID);
        let result = testlevel::world_from(level);
        assert!(matches!(result, Err(LevelError::MissingLara)));
    }

    #[test]
    fn test_physics_runs_every_other_frame() {
        let mut t = TestWorld::new();
        assert!(t.world.is_physics_frame());
        t.world.update();
        assert!(!t.world.is_physics_frame());
        assert_eq!(t.world.render_frame, RenderFrame(1));
    }

    #[test]
    fn test_walk_then_stop() {
        let mut t = TestWorld::new();
        let mut script = ScriptedInput::new();
        script.push_repeat(forward(), 30);
        script.push(InputFrame::default());
        t.world.input = Box::new(script);

        t.world.update();
        t.world.update();
        assert!(matches!(t.world.lara.goal_state(), LaraStateId::RunForward | LaraStateId::WalkForward));

        t.world.run(29 + 60);
        assert_eq!(t.world.lara.current_state(), LaraStateId::Stop);
        assert!(t.world.lara.position().z > Length(1024));
        assert_eq!(t.world.lara.state.speed, Speed(0));
    }

    #[test]
    fn test_flip_map_sequence_swaps_rooms() {
        let mut t = TestWorld::new();
        let request = ActivationState { activation_set: ACTIVATION_FULL, oneshot: true, ..Default::default() };
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            request,
            &[(CommandOpcode::FlipMap, 3)],
            false,
        );
        let before = t.world.rooms.clone();
        triggers::handle_command_sequence(&mut t.world, Some(idx), false).expect("sequence");

        let state = t.world.map_flip_activation_states[3];
        assert!(state.is_fully_activated());
        assert!(state.oneshot);
        assert!(t.world.rooms_are_swapped);
        let (a, b) = testlevel::FLIP_PAIR;
        assert_eq!(t.world.rooms[a].sectors, before[b].sectors);
        assert_eq!(t.world.rooms[b].sectors, before[a].sectors);
        assert_eq!(t.world.room_order[a], b);
    }

    #[test]
    fn test_double_swap_restores_rooms_and_blocks() {
        let mut t = TestWorld::new();
        let (a, _) = testlevel::FLIP_PAIR;
        let at = testlevel::flip_room_center();
        let id = testlevel::spawn_object(&mut t.world, type_ids::BLOCK_1, at, Angle::ZERO);
        assert_eq!(t.world.objects.get(id).map(|o| o.state.location.room), Some(a));

        let rooms = t.world.rooms.clone();
        let objects = t.world.objects.clone();
        let flips = t.world.map_flip_activation_states.clone();
        t.world.swap_all_rooms();
        assert_ne!(t.world.rooms, rooms);
        t.world.swap_all_rooms();
        assert_eq!(t.world.rooms, rooms);
        assert_eq!(t.world.objects, objects);
        assert_eq!(t.world.map_flip_activation_states, flips);
        assert!(!t.world.rooms_are_swapped);
    }

    #[test]
    fn test_swap_moves_block_patch_to_new_room() {
        let mut t = TestWorld::new();
        let (a, _) = testlevel::FLIP_PAIR;
        let at = testlevel::flip_room_center();
        testlevel::spawn_object(&mut t.world, type_ids::BLOCK_1, at, Angle::ZERO);
        let floor = |w: &World| w.rooms[a].get_sector_by_absolute_position(&at).map(|s| s.floor_height);
        assert_eq!(floor(&t.world), Some(Length(-1024)));
        t.world.swap_all_rooms();
        assert_eq!(floor(&t.world), Some(testlevel::FLIP_ALTERNATE_FLOOR - Length(1024)));
    }

    #[test]
    fn test_death_sector_kills_within_a_frame() {
        let mut t = TestWorld::new();
        let idx = testlevel::push_death(&mut t.world);
        testlevel::set_sector_floor_data(&mut t.world, 0, Position::new(1024, 0, 1024), idx);
        t.world.update();
        t.world.update();
        assert!(t.world.lara.is_dead());
    }

    #[test]
    fn test_secret_sequence_under_lara() {
        let mut t = TestWorld::new();
        let request = ActivationState { activation_set: ACTIVATION_FULL, ..Default::default() };
        let idx = testlevel::push_sequence(
            &mut t.world,
            SequenceCondition::LaraIsHere,
            request,
            &[(CommandOpcode::Secret, 5)],
            false,
        );
        testlevel::set_sector_floor_data(&mut t.world, 0, Position::new(1024, 0, 1024), idx);
        t.world.run(4);
        assert_eq!(t.world.secrets_found, 1 << 5);
        assert_eq!(t.world.player.secrets, 1);
        assert_eq!(t.world.audio.current_track, Some(crate::audio_engine::SECRET_TRACK));
    }

    #[test]
    fn test_malformed_floor_data_ends_level() {
        let mut t = TestWorld::new();
        let idx = t.world.floor_data.len();
        t.world.floor_data.push(0x001f);
        t.world.lara.floor_trigger = Some(idx);
        t.world.render_frame = RenderFrame(1);
        t.world.update();
        assert!(t.world.finished);
        let frame = t.world.render_frame;
        t.world.update();
        assert_eq!(t.world.render_frame, frame);
    }

    #[test]
    fn test_medipack_shortcut() {
        let mut t = TestWorld::new();
        t.world.player.add_item(SMALL_MEDIPACK_ITEM, 1);
        t.world.lara.state.health = Health(200);
        let mut script = ScriptedInput::new();
        script.push(InputFrame { actions: ActionSet::CONSUME_SMALL_MEDIPACK, ..Default::default() });
        script.push(InputFrame::default());
        t.world.input = Box::new(script);
        t.world.update();
        assert_eq!(t.world.lara.state.health, Health(700));
        assert_eq!(t.world.player.count(SMALL_MEDIPACK_ITEM), 0);
    }

    #[test]
    fn test_cheat_dive_puts_lara_in_water() {
        let mut t = TestWorld::new();
        t.world.cvars.cheats_allowed = true;
        t.world.cvars.set("g_cheatdive", "1");
        t.world.update();
        assert_eq!(t.world.lara.underwater_state, UnderwaterState::Diving);
    }
}
