// save.rs — Savegame writing and loading
//
// A savegame is one JSON document with camelCase keys, optionally gzipped.
// Loading parses and checks the whole document before touching the world,
// so a rejected savegame leaves the world as it was.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trx_common::error::LevelError;
use trx_common::floordata::ActivationState;
use trx_common::room::connect_sectors;
use trx_common::units::*;

use crate::audio_engine::AudioEngineState;
use crate::camera::{CameraController, FixedCameraFlags};
use crate::lara::LaraObject;
use crate::objects::ObjectManager;
use crate::player::Player;
use crate::world::World;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("savegame i/o: {0}")]
    Io(#[from] io::Error),
    #[error("savegame document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("savegame belongs to {found}, current level is {expected}")]
    LevelMismatch { expected: String, found: String },
    #[error("savegame has {found} rooms, level has {expected}")]
    RoomCount { expected: usize, found: usize },
    #[error("savegame room {room} has {found} sectors, level has {expected}")]
    SectorCount { room: usize, expected: usize, found: usize },
    #[error("savegame has {found} boxes, level has {expected}")]
    BoxCount { expected: usize, found: usize },
    #[error("savegame room order {0:?} is neither the level order nor its flip")]
    RoomOrder(Vec<usize>),
    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Floor and ceiling of every sector of one room, in sector order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct RoomHeights {
    floor: Vec<Length>,
    ceiling: Vec<Length>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveDocument {
    level_filename: String,
    room_order: Vec<usize>,
    object_manager: ObjectManager,
    lara: LaraObject,
    player: Player,
    map_flip_activation_states: Vec<ActivationState>,
    cameras: Vec<FixedCameraFlags>,
    active_effect: Option<u16>,
    effect_timer: Frame,
    camera_controller: CameraController,
    secrets_found: u16,
    rooms_are_swapped: bool,
    rooms: Vec<RoomHeights>,
    boxes: Vec<bool>,
    audio_engine: AudioEngineState,
}

impl SaveDocument {
    fn capture(w: &World) -> Self {
        let rooms = w
            .rooms
            .par_iter()
            .map(|room| RoomHeights {
                floor: room.sectors.iter().map(|s| s.floor_height).collect(),
                ceiling: room.sectors.iter().map(|s| s.ceiling_height).collect(),
            })
            .collect();
        Self {
            level_filename: w.level_filename.clone(),
            room_order: w.room_order.clone(),
            object_manager: w.objects.clone(),
            lara: w.lara.clone(),
            player: w.player.clone(),
            map_flip_activation_states: w.map_flip_activation_states.clone(),
            cameras: w.camera.fixed_flags.clone(),
            active_effect: w.active_effect,
            effect_timer: w.effect_timer,
            camera_controller: w.camera.clone(),
            secrets_found: w.secrets_found,
            rooms_are_swapped: w.rooms_are_swapped,
            rooms,
            boxes: w.boxes.iter().map(|b| b.blocked).collect(),
            audio_engine: w.audio.save_state(),
        }
    }

    fn check(&self, w: &World) -> Result<(), SaveError> {
        if self.level_filename != w.level_filename {
            return Err(SaveError::LevelMismatch {
                expected: w.level_filename.clone(),
                found: self.level_filename.clone(),
            });
        }
        if self.rooms.len() != w.rooms.len() || self.room_order.len() != w.rooms.len() {
            return Err(SaveError::RoomCount { expected: w.rooms.len(), found: self.rooms.len() });
        }
        for (room, (heights, current)) in self.rooms.iter().zip(&w.rooms).enumerate() {
            let expected = current.sectors.len();
            for found in [heights.floor.len(), heights.ceiling.len()] {
                if found != expected {
                    return Err(SaveError::SectorCount { room, expected, found });
                }
            }
        }
        if self.boxes.len() != w.boxes.len() {
            return Err(SaveError::BoxCount { expected: w.boxes.len(), found: self.boxes.len() });
        }
        if self.room_order != w.room_order {
            if self.room_order != flipped_order(w) {
                return Err(SaveError::RoomOrder(self.room_order.clone()));
            }
            // the flip reconnects every sector, so it must not fail halfway
            connect_sectors(&mut w.rooms.clone(), &w.floor_data)?;
        }
        Ok(())
    }
}

/// Room order after swapping every alternate pair the way
/// `World::swap_all_rooms` does.
fn flipped_order(w: &World) -> Vec<usize> {
    let mut order = w.room_order.clone();
    for (a, room) in w.rooms.iter().enumerate() {
        if let Some(b) = room.alternate_room {
            if b > a && b < order.len() {
                order.swap(a, b);
            }
        }
    }
    order
}

// ============================================================
// Writing
// ============================================================

/// Writes the world's state to `out`, gzipped when `compress` is set.
pub fn save_game<W: Write>(w: &World, out: W, compress: bool) -> Result<(), SaveError> {
    let doc = SaveDocument::capture(w);
    if compress {
        let mut enc = GzEncoder::new(out, Compression::default());
        serde_json::to_writer(&mut enc, &doc)?;
        enc.finish()?.flush()?;
    } else {
        let mut out = out;
        serde_json::to_writer(&mut out, &doc)?;
        out.flush()?;
    }
    log::info!("saved game for {}", w.level_filename);
    Ok(())
}

/// Writes a savegame file, compressed according to `save_compress`.
pub fn write_save_file(w: &World, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let file = File::create(path.as_ref())?;
    save_game(w, BufWriter::new(file), w.cvars.is_set("save_compress"))
}

// ============================================================
// Loading
// ============================================================

fn parse(mut input: impl Read) -> Result<SaveDocument, SaveError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    if bytes.starts_with(&GZIP_MAGIC) {
        Ok(serde_json::from_reader(GzDecoder::new(bytes.as_slice()))?)
    } else {
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Restores the world from a savegame written by `save_game`.
pub fn load_game<R: Read>(w: &mut World, input: R) -> Result<(), SaveError> {
    let doc = parse(input).map_err(|e| {
        log::error!("cannot read savegame: {}", e);
        e
    })?;
    if let Err(e) = doc.check(w) {
        log::error!("savegame rejected: {}", e);
        return Err(e);
    }

    if w.room_order != doc.room_order {
        w.swap_all_rooms();
    }
    w.rooms_are_swapped = doc.rooms_are_swapped;

    w.objects = doc.object_manager;
    w.lara = doc.lara;
    w.player = doc.player;
    w.map_flip_activation_states = doc.map_flip_activation_states;
    w.camera = doc.camera_controller;
    w.camera.fixed_flags = doc.cameras;
    w.active_effect = doc.active_effect;
    w.effect_timer = doc.effect_timer;
    w.secrets_found = doc.secrets_found;

    w.rooms.par_iter_mut().zip(doc.rooms.par_iter()).for_each(|(room, heights)| {
        for ((sector, &floor), &ceiling) in room.sectors.iter_mut().zip(&heights.floor).zip(&heights.ceiling) {
            sector.floor_height = floor;
            sector.ceiling_height = ceiling;
        }
    });
    for (b, &blocked) in w.boxes.iter_mut().zip(&doc.boxes) {
        b.blocked = blocked;
    }

    w.audio.load_state(&doc.audio_engine);
    log::info!("loaded game for {}", w.level_filename);
    Ok(())
}

pub fn read_save_file(w: &mut World, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let file = File::open(path.as_ref())?;
    load_game(w, BufReader::new(file))
}
