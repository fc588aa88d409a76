// level.rs — Parsed level contents consumed by the simulation
//
// The file parser lives elsewhere; it hands over a `Level` whose tables are
// validated here before a world is built from it.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::animation::{validate_animations, Animation, SkeletalModel};
use crate::audio::TrackInfo;
use crate::error::LevelError;
use crate::floordata::{self, FloorDataValue};
use crate::room::{BoxArea, Room, Sector};
use crate::units::*;

/// Object type id of the avatar.
pub const LARA_TYPE_ID: u16 = 0;

/// An object placed in the level file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemSpawn {
    pub type_id: u16,
    pub room: usize,
    pub position: Position,
    pub rotation: Angle,
    pub intensity: i16,
    pub activation_set: u8,
    pub invisible: bool,
}

/// Fixed camera or underwater-current sink. Sinks reuse the camera record:
/// `strength` is the current's pull and `box_index` its target box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CameraSink {
    pub position: Position,
    pub room: usize,
    pub strength: i32,
    pub box_index: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackMode {
    #[default]
    Normal,
    Wait,
    Restart,
    Looping,
}

/// One entry of the sound-effect table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoundDetails {
    pub sample: usize,
    /// 0..=0x7fff
    pub volume: u16,
    /// Zero means always; otherwise the effect plays when a 15-bit random
    /// value does not exceed it.
    pub chance: u16,
    pub flags: u16,
}

impl SoundDetails {
    pub fn playback_mode(&self) -> PlaybackMode {
        match self.flags & 3 {
            1 => PlaybackMode::Wait,
            2 => PlaybackMode::Restart,
            3 => PlaybackMode::Looping,
            _ => PlaybackMode::Normal,
        }
    }

    pub fn sample_count(&self) -> usize {
        (((self.flags >> 2) & 0x0f) as usize).max(1)
    }

    pub fn use_random_pitch(&self) -> bool {
        self.flags & 0x2000 != 0
    }

    pub fn use_random_volume(&self) -> bool {
        self.flags & 0x4000 != 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpriteSequence {
    pub type_id: u16,
    pub offset: usize,
    pub length: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Level {
    pub filename: String,
    pub rooms: Vec<Room>,
    pub floor_data: Vec<FloorDataValue>,
    pub boxes: Vec<BoxArea>,
    pub animations: Vec<Animation>,
    pub models: HashMap<u16, SkeletalModel>,
    pub items: Vec<ItemSpawn>,
    pub camera_sinks: Vec<CameraSink>,
    pub sound_details: Vec<SoundDetails>,
    /// Sound id to `sound_details` index.
    pub sound_map: HashMap<u16, usize>,
    pub sprite_sequences: HashMap<u16, SpriteSequence>,
    pub cd_tracks: HashMap<u16, TrackInfo>,
    /// Seed of the world's random generator.
    pub seed: u64,
}

impl Level {
    pub fn find_model(&self, type_id: u16) -> Option<&SkeletalModel> {
        let model = self.models.get(&type_id);
        if model.is_none() {
            log::warn!("no animated model for object type {}", type_id);
        }
        model
    }

    /// Checks every cross reference the simulation relies on. Rooms are
    /// checked in parallel.
    pub fn validate(&self) -> Result<(), LevelError> {
        let room_count = self.rooms.len();
        let box_count = self.boxes.len();

        self.rooms.par_iter().enumerate().try_for_each(|(room_idx, room)| {
            if room.sectors.len() != room.sector_count_x * room.sector_count_z {
                return Err(LevelError::IndexOutOfRange {
                    kind: "sector",
                    index: room.sectors.len(),
                    len: room.sector_count_x * room.sector_count_z,
                });
            }
            if room.sector_count_x < 3 || room.sector_count_z < 3 {
                return Err(LevelError::RoomTooSmall { room: room_idx, x: room.sector_count_x, z: room.sector_count_z });
            }
            if let Some(alt) = room.alternate_room {
                if alt >= room_count {
                    return Err(LevelError::IndexOutOfRange { kind: "alternate room", index: alt, len: room_count });
                }
                if self.rooms[alt].alternate_room != Some(room_idx) {
                    return Err(LevelError::AsymmetricAlternate { room: room_idx, alternate: alt });
                }
            }
            for portal in &room.portals {
                if portal.adjoining_room >= room_count {
                    return Err(LevelError::IndexOutOfRange {
                        kind: "portal room",
                        index: portal.adjoining_room,
                        len: room_count,
                    });
                }
            }
            for (sector_idx, sector) in room.sectors.iter().enumerate() {
                for link in [sector.room_above, sector.room_below].into_iter().flatten() {
                    if link >= room_count {
                        return Err(LevelError::IndexOutOfRange { kind: "vertical room link", index: link, len: room_count });
                    }
                }
                if let Some(b) = sector.box_index {
                    if b >= box_count {
                        return Err(LevelError::IndexOutOfRange { kind: "box", index: b, len: box_count });
                    }
                }
                if let Some(fd) = sector.floor_data {
                    let summary = floordata::summarize(&self.floor_data, fd)
                        .map_err(|source| LevelError::FloorData { room: room_idx, sector: sector_idx, source })?;
                    if let Some(target) = summary.boundary_room {
                        if target as usize >= room_count {
                            return Err(LevelError::IndexOutOfRange {
                                kind: "boundary room",
                                index: target as usize,
                                len: room_count,
                            });
                        }
                    }
                }
            }
            Ok(())
        })?;
        self.validate_portal_chains()?;

        validate_animations(&self.animations)?;

        for model in self.models.values() {
            if model.animation_index >= self.animations.len() && !self.animations.is_empty() {
                return Err(LevelError::IndexOutOfRange {
                    kind: "model animation",
                    index: model.animation_index,
                    len: self.animations.len(),
                });
            }
        }

        for item in &self.items {
            if item.room >= room_count {
                return Err(LevelError::IndexOutOfRange { kind: "item room", index: item.room, len: room_count });
            }
        }
        if !self.items.iter().any(|i| i.type_id == LARA_TYPE_ID) {
            return Err(LevelError::MissingLara);
        }

        for (&id, &idx) in &self.sound_map {
            if idx >= self.sound_details.len() {
                log::warn!("sound {} maps to missing details {}", id, idx);
            }
        }

        log::info!(
            "level {} validated: {} rooms, {} animations, {} items",
            self.filename,
            room_count,
            self.animations.len(),
            self.items.len()
        );
        Ok(())
    }

    fn boundary_target(&self, sector: &Sector) -> Option<usize> {
        let summary = floordata::summarize(&self.floor_data, sector.floor_data?).ok()?;
        summary.boundary_room.map(usize::from)
    }

    /// Follows the horizontal portals out of every sector and fails when a
    /// chain enters a room it already passed through.
    fn validate_portal_chains(&self) -> Result<(), LevelError> {
        let room_count = self.rooms.len();
        self.rooms.par_iter().enumerate().try_for_each(|(room_idx, room)| {
            for (sector_idx, sector) in room.sectors.iter().enumerate() {
                let Some(mut next) = self.boundary_target(sector) else {
                    continue;
                };
                let x = room.position.x.get() + (sector_idx / room.sector_count_z) as i32 * SECTOR_SIZE.get();
                let z = room.position.z.get() + (sector_idx % room.sector_count_z) as i32 * SECTOR_SIZE.get();
                let mut visited = vec![false; room_count];
                visited[room_idx] = true;
                loop {
                    if visited[next] {
                        return Err(LevelError::PortalCycle { room: room_idx, sector: sector_idx });
                    }
                    visited[next] = true;
                    let target = &self.rooms[next];
                    let s = target.get_boundary_sector_by_index(
                        (x - target.position.x.get()).div_euclid(SECTOR_SIZE.get()),
                        (z - target.position.z.get()).div_euclid(SECTOR_SIZE.get()),
                    );
                    match self.boundary_target(s) {
                        Some(n) => next = n,
                        None => break,
                    }
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_3x3(x: i32) -> Room {
        Room {
            position: Position::new(x, 0, 0),
            sector_count_x: 3,
            sector_count_z: 3,
            sectors: vec![Sector::default(); 9],
            ..Default::default()
        }
    }

    fn minimal() -> Level {
        Level {
            filename: "test.phd".into(),
            rooms: vec![room_3x3(0)],
            animations: vec![Animation::default()],
            items: vec![ItemSpawn { type_id: LARA_TYPE_ID, ..Default::default() }],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_minimal() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_lara() {
        let mut level = minimal();
        level.items.clear();
        assert!(matches!(level.validate(), Err(LevelError::MissingLara)));
    }

    #[test]
    fn test_validate_asymmetric_alternate() {
        let mut level = minimal();
        level.rooms.push(level.rooms[0].clone());
        level.rooms[0].alternate_room = Some(1);
        assert!(matches!(level.validate(), Err(LevelError::AsymmetricAlternate { room: 0, alternate: 1 })));
        level.rooms[1].alternate_room = Some(0);
        assert!(level.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_floor_data() {
        let mut level = minimal();
        level.floor_data = vec![0x8009];
        level.rooms[0].sectors[0].floor_data = Some(0);
        assert!(matches!(level.validate(), Err(LevelError::FloorData { room: 0, sector: 0, .. })));
    }

    #[test]
    fn test_validate_rejects_tiny_rooms() {
        let mut level = minimal();
        level.rooms.push(Room {
            sector_count_x: 1,
            sector_count_z: 1,
            sectors: vec![Sector::default()],
            ..Default::default()
        });
        assert!(matches!(level.validate(), Err(LevelError::RoomTooSmall { room: 1, x: 1, z: 1 })));
        level.rooms[1] = Room::default();
        assert!(matches!(level.validate(), Err(LevelError::RoomTooSmall { room: 1, x: 0, z: 0 })));
    }

    #[test]
    fn test_validate_rejects_portal_cycle() {
        // both rooms cover the same sectors and point at each other
        let mut level = minimal();
        level.rooms.push(room_3x3(0));
        level.floor_data = vec![0x8001, 1, 0x8001, 0];
        level.rooms[0].sectors[4].floor_data = Some(0);
        level.rooms[1].sectors[4].floor_data = Some(2);
        assert!(matches!(level.validate(), Err(LevelError::PortalCycle { sector: 4, .. })));
    }

    #[test]
    fn test_validate_accepts_portal_chain() {
        // room 0's east wall opens into room 1, which has no way back there
        let mut level = minimal();
        level.rooms.push(room_3x3(2 * 1024));
        level.floor_data = vec![0x8001, 1];
        let east = level.rooms[0].sector_index(2, 1);
        level.rooms[0].sectors[east].floor_data = Some(0);
        assert!(level.validate().is_ok());

        // a portal back from the overlapping sector closes the loop
        level.floor_data.extend([0x8001, 0]);
        let west = level.rooms[1].sector_index(0, 1);
        level.rooms[1].sectors[west].floor_data = Some(2);
        assert!(matches!(level.validate(), Err(LevelError::PortalCycle { .. })));
    }

    #[test]
    fn test_sound_details_flags() {
        let d = SoundDetails { flags: 3 | (4 << 2) | 0x2000, ..Default::default() };
        assert_eq!(d.playback_mode(), PlaybackMode::Looping);
        assert_eq!(d.sample_count(), 4);
        assert!(d.use_random_pitch());
        assert!(!d.use_random_volume());
    }
}
