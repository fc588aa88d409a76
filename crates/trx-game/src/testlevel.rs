// testlevel.rs — A small hand-built level shared by the unit tests
//
// Room 0 is a flat 10x10 hall with the avatar standing in it. Rooms 1 and 2
// are a water pool with an air room above, and rooms 3 and 4 form one pair
// of alternate rooms placed well away from the hall.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use trx_common::animation::{Animation, BoneTreeEntry, Keyframe, SkeletalModel, Transition, TransitionCase};
use trx_common::audio::{NullAudioBackend, TrackInfo, TrackType};
use trx_common::error::LevelError;
use trx_common::floordata::{
    self, ActivationState, CameraParameters, ChunkPayload, ChunkType, Command, CommandOpcode, CommandSequence,
    FloorDataChunk, FloorDataRecord, SequenceCommand, SequenceCondition,
};
use trx_common::input::ScriptedInput;
use trx_common::level::{CameraSink, ItemSpawn, Level, SoundDetails, LARA_TYPE_ID};
use trx_common::location::Location;
use trx_common::room::{BoxArea, Room, Sector};
use trx_common::units::*;

use crate::audio_engine::tests::SilentStreams;
use crate::audio_engine::{sfx, SECRET_TRACK};
use crate::lara::anim_ids;
use crate::lara::state::{LaraStateId, LARA_STATE_COUNT};
use crate::objects;
use crate::world::World;

pub const HALL: usize = 0;
pub const WATER_ROOM: usize = 1;
pub const AIR_ABOVE_WATER_ROOM: usize = 2;
pub const FLIP_PAIR: (usize, usize) = (3, 4);

pub const ROOM_CEILING: Length = Length(-4096);
pub const WATER_SURFACE: Length = Length(0);
const POOL_BOTTOM: Length = Length(4096);
pub const FLIP_ALTERNATE_FLOOR: Length = Length(-256);

const FLIP_ROOM_ORIGIN: Position = Position::new(16384, 0, 0);

/// Anims 0..150 carry the fixed ids the avatar code refers to; after them
/// comes one animation per motion state.
const STATE_ANIM_BASE: usize = 150;
const LARA_ANIM_COUNT: usize = STATE_ANIM_BASE + LARA_STATE_COUNT;
const FRAMES_PER_ANIM: i32 = 60;
const LARA_BONES: usize = 15;

/// Object ids handed out by `spawn_object` start here, clear of the ids
/// the object manager gives to dynamic objects.
const FIRST_TEST_OBJECT_ID: u16 = 500;

pub struct TestWorld {
    pub world: World,
}

impl TestWorld {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        match world_from(level()) {
            Ok(world) => Self { world },
            Err(e) => panic!("test level rejected: {}", e),
        }
    }
}

pub fn world_from(level: Level) -> Result<World, LevelError> {
    World::new(level, Box::new(NullAudioBackend::default()), Box::new(SilentStreams), Box::new(ScriptedInput::new()))
}

// ============================================================
// Geometry
// ============================================================

/// A walled room: the outer ring of sectors are walls, the rest is flat.
fn walled_room(origin: Position, size_x: usize, size_z: usize, floor: Length, ceiling: Length) -> Room {
    let mut sectors = Vec::with_capacity(size_x * size_z);
    for x in 0..size_x {
        for z in 0..size_z {
            if x == 0 || z == 0 || x == size_x - 1 || z == size_z - 1 {
                sectors.push(Sector::wall());
            } else {
                sectors.push(Sector { floor_height: floor, ceiling_height: ceiling, ..Default::default() });
            }
        }
    }
    Room {
        position: origin,
        sector_count_x: size_x,
        sector_count_z: size_z,
        sectors,
        y_top: ceiling,
        y_bottom: floor,
        ..Default::default()
    }
}

fn for_open_sectors(room: &mut Room, mut f: impl FnMut(&mut Sector)) {
    room.sectors.iter_mut().filter(|s| !s.is_wall()).for_each(|s| f(s));
}

fn rooms() -> Vec<Room> {
    let mut hall = walled_room(Position::new(-4096, 0, -4096), 10, 10, Length(0), ROOM_CEILING);
    hall.name = "hall".into();
    for_open_sectors(&mut hall, |s| s.box_index = Some(0));

    let mut pool = walled_room(Position::new(0, 0, 0), 5, 5, POOL_BOTTOM, WATER_SURFACE);
    pool.name = "pool".into();
    pool.is_water_room = true;
    for_open_sectors(&mut pool, |s| s.room_above = Some(AIR_ABOVE_WATER_ROOM));

    let mut air = walled_room(Position::new(0, 0, 0), 5, 5, WATER_SURFACE, ROOM_CEILING);
    air.name = "above pool".into();
    for_open_sectors(&mut air, |s| s.room_below = Some(WATER_ROOM));

    let (a, b) = FLIP_PAIR;
    let mut flip = walled_room(FLIP_ROOM_ORIGIN, 3, 3, Length(0), ROOM_CEILING);
    flip.name = "flip".into();
    flip.alternate_room = Some(b);
    let mut flipped = walled_room(FLIP_ROOM_ORIGIN, 3, 3, FLIP_ALTERNATE_FLOOR, ROOM_CEILING);
    flipped.name = "flip alternate".into();
    flipped.alternate_room = Some(a);

    vec![hall, pool, air, flip, flipped]
}

/// Center of the only open sector of the flip room.
pub fn flip_room_center() -> Position {
    FLIP_ROOM_ORIGIN + Position::new(1536, 0, 1536)
}

// ============================================================
// Animations
// ============================================================

fn lara_state_of(anim: usize) -> LaraStateId {
    use LaraStateId::*;
    if anim >= STATE_ANIM_BASE {
        return LaraStateId::from_u16((anim - STATE_ANIM_BASE) as u16).unwrap_or(Stop);
    }
    match anim {
        anim_ids::STOP_HANG => JumpUp,
        anim_ids::SMASH_JUMP => FreeFall,
        anim_ids::FREE_FALL_FORWARD => JumpForward,
        anim_ids::VAULT34 | anim_ids::VAULT12 => Climbing,
        anim_ids::RUN_UP_STEP_RIGHT | anim_ids::RUN_UP_STEP_LEFT => RunForward,
        anim_ids::WALK_UP_STEP_RIGHT
        | anim_ids::WALK_UP_STEP_LEFT
        | anim_ids::WALK_DOWN_LEFT
        | anim_ids::WALK_DOWN_RIGHT => WalkForward,
        anim_ids::WALK_DOWN_BACK_LEFT | anim_ids::WALK_DOWN_BACK_RIGHT => WalkBackward,
        anim_ids::SLIDE => SlideForward,
        anim_ids::FREE_FALL_BACK => FallBackward,
        anim_ids::HANG => Hang,
        anim_ids::SLIDE_BACK => SlideBackward,
        anim_ids::CLIMB_OUT_OF_WATER => OnWaterExit,
        anim_ids::FREE_FALL_TO_UNDERWATER | anim_ids::FREE_FALL_TO_UNDERWATER_ALTERNATE => UnderwaterDiving,
        anim_ids::UNDERWATER_TO_ONWATER => OnWaterStop,
        anim_ids::BOULDER_DEATH => BoulderDeath,
        anim_ids::ROLL_BEGIN => RollForward,
        _ => Stop,
    }
}

fn lara_pose() -> Keyframe {
    Keyframe {
        bbox: BoundingBox::new(Position::new(-100, -762, -100), Position::new(100, 0, 100)),
        offset: Vec3::ZERO,
        rotations: vec![Quat::IDENTITY; LARA_BONES],
    }
}

/// Every animation loops on itself and can switch to the state animation
/// of any motion state at any frame.
fn lara_animations() -> Vec<Animation> {
    (0..LARA_ANIM_COUNT)
        .map(|index| {
            let state = lara_state_of(index);
            let first = Frame(index as i32 * FRAMES_PER_ANIM);
            let last = first + Frame(FRAMES_PER_ANIM - 1);
            let transitions = (0..LARA_STATE_COUNT)
                .map(|s| Transition {
                    state_id: s as u16,
                    cases: vec![TransitionCase {
                        first_frame: first,
                        last_frame: last,
                        target_animation: STATE_ANIM_BASE + s,
                        target_frame: Frame((STATE_ANIM_BASE + s) as i32 * FRAMES_PER_ANIM),
                    }],
                })
                .collect();
            let speed = match state {
                LaraStateId::RunForward | LaraStateId::WalkForward => 20 << 16,
                _ => 0,
            };
            Animation {
                state_id: state.id(),
                first_frame: first,
                last_frame: last,
                next_animation: index,
                next_frame: first,
                segment_length: FRAMES_PER_ANIM as u16,
                speed,
                acceleration: 0,
                keyframes: vec![lara_pose()],
                transitions,
                commands: Vec::new(),
            }
        })
        .collect()
}

fn lara_model() -> SkeletalModel {
    let bones = (0..LARA_BONES)
        .map(|i| BoneTreeEntry { parent: (i > 0).then_some(0), offset: Vec3::ZERO })
        .collect();
    SkeletalModel { type_id: LARA_TYPE_ID, bones, mesh_base: 0, animation_index: 0 }
}

// ============================================================
// Level
// ============================================================

pub fn level() -> Level {
    let mut models = HashMap::new();
    models.insert(LARA_TYPE_ID, lara_model());

    let sound_map = [sfx::EXPLOSION, sfx::DOOR_SLAM, sfx::LARA_FALL_INTO_WATER]
        .into_iter()
        .map(|id| (id, 0))
        .collect();

    let mut cd_tracks = HashMap::new();
    cd_tracks.insert(
        3,
        TrackInfo { name: "ambient".into(), track_type: TrackType::Ambient, sound_id: None },
    );
    cd_tracks.insert(
        SECRET_TRACK,
        TrackInfo { name: "secret".into(), track_type: TrackType::Interception, sound_id: None },
    );

    Level {
        filename: "data/test.phd".into(),
        rooms: rooms(),
        floor_data: vec![0],
        boxes: vec![BoxArea {
            x_min: Length(-3072),
            x_max: Length(5120),
            z_min: Length(-3072),
            z_max: Length(5120),
            floor: Length(0),
            blockable: true,
            blocked: false,
        }],
        animations: lara_animations(),
        models,
        items: vec![ItemSpawn {
            type_id: LARA_TYPE_ID,
            room: HALL,
            position: Position::new(1024, 0, 1024),
            rotation: Angle::ZERO,
            intensity: -1,
            activation_set: 0,
            invisible: false,
        }],
        camera_sinks: vec![CameraSink {
            position: Position::new(1536, 2048, 1536),
            room: WATER_ROOM,
            strength: 2,
            box_index: 0,
        }],
        sound_details: vec![SoundDetails { sample: 0, volume: 0x7fff, chance: 0, flags: 0 }],
        sound_map,
        sprite_sequences: HashMap::new(),
        cd_tracks,
        seed: 0x5eed,
    }
}

// ============================================================
// Helpers
// ============================================================

pub fn place_lara(w: &mut World, room: usize, pos: Position) {
    w.lara.state.location = Location::new(room, pos);
}

/// Spawns an object of `type_id` in whichever room contains `pos`.
pub fn spawn_object(w: &mut World, type_id: u16, pos: Position, yaw: Angle) -> u16 {
    let room = w.rooms.iter().position(|r| r.is_inner_position_xz(&pos)).unwrap_or(HALL);
    let placed = w.objects.objects.values().filter(|o| !o.dynamic).count() as u16;
    let id = FIRST_TEST_OBJECT_ID + placed;
    let item = ItemSpawn {
        type_id,
        room,
        position: pos,
        rotation: yaw,
        intensity: -1,
        activation_set: 0,
        invisible: false,
    };
    objects::spawn(w, id, &item);
    id
}

fn append(w: &mut World, records: &[FloorDataRecord]) -> usize {
    let start = w.floor_data.len();
    w.floor_data.extend(floordata::encode(records));
    start
}

/// Appends a command sequence, optionally preceded by a death chunk, and
/// returns its floor-data index.
pub fn push_sequence(
    w: &mut World,
    condition: SequenceCondition,
    activation: ActivationState,
    commands: &[(CommandOpcode, u16)],
    death: bool,
) -> usize {
    let mut records = Vec::new();
    if death {
        records.push(FloorDataRecord {
            index: 0,
            chunk: FloorDataChunk { chunk_type: ChunkType::Death, sub_function: 0, is_last: false },
            payload: ChunkPayload::Death,
        });
    }
    let last = commands.len().saturating_sub(1);
    let commands = commands
        .iter()
        .enumerate()
        .map(|(i, &(opcode, parameter))| {
            let is_last = i == last;
            if opcode == CommandOpcode::SwitchCamera {
                SequenceCommand::Camera(
                    Command { opcode, parameter, is_last: false },
                    CameraParameters { is_last, ..Default::default() },
                )
            } else {
                SequenceCommand::Plain(Command { opcode, parameter, is_last })
            }
        })
        .collect();
    records.push(FloorDataRecord {
        index: 0,
        chunk: FloorDataChunk {
            chunk_type: ChunkType::CommandSequence,
            sub_function: condition.bits() as u8,
            is_last: true,
        },
        payload: ChunkPayload::CommandSequence(CommandSequence { condition, activation, commands }),
    });
    append(w, &records)
}

pub fn push_death(w: &mut World) -> usize {
    append(
        w,
        &[FloorDataRecord {
            index: 0,
            chunk: FloorDataChunk { chunk_type: ChunkType::Death, sub_function: 0, is_last: true },
            payload: ChunkPayload::Death,
        }],
    )
}

pub fn set_sector_floor_data(w: &mut World, room: usize, pos: Position, index: usize) {
    match w.rooms[room].get_sector_by_absolute_position_mut(&pos) {
        Some(sector) => sector.floor_data = Some(index),
        None => panic!("{} is outside room {}", pos, room),
    }
}
