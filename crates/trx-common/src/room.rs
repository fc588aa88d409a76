// room.rs — Rooms, sectors and pathfinding boxes
//
// Rooms live in one arena owned by the world and refer to each other by
// index. Alternate rooms form symmetric pairs; swapping a pair exchanges the
// contents of the two slots so that every index held elsewhere now sees the
// flipped geometry.

use crate::error::{FloorDataError, LevelError};
use crate::floordata::{self, FloorDataValue};
use crate::units::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One 1024x1024 cell of a room.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sector {
    pub floor_height: Length,
    pub ceiling_height: Length,
    /// Index of the first floor-data word, if the sector has any.
    pub floor_data: Option<usize>,
    pub room_above: Option<usize>,
    pub room_below: Option<usize>,
    /// Horizontal portal target, resolved from floor data by `connect_sectors`.
    pub boundary_room: Option<usize>,
    pub box_index: Option<usize>,
}

/// Stands in for lookups into a room without sectors.
static SOLID_WALL: Sector = Sector::wall();

impl Sector {
    pub const fn wall() -> Self {
        Self {
            floor_height: WALL_HEIGHT,
            ceiling_height: WALL_HEIGHT,
            floor_data: None,
            room_above: None,
            room_below: None,
            boundary_room: None,
            box_index: None,
        }
    }

    pub fn is_wall(&self) -> bool {
        self.floor_height == WALL_HEIGHT && self.ceiling_height == WALL_HEIGHT
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Portal {
    pub adjoining_room: usize,
    pub normal: Position,
}

/// A static prop with a collision box in room space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticMesh {
    pub position: Position,
    pub rotation: Angle,
    pub collision_box: BoundingBox,
    pub collidable: bool,
}

impl StaticMesh {
    /// Collision box rotated by the mesh's yaw and moved to world space.
    pub fn world_box(&self) -> BoundingBox {
        let (min, max) = match crate::units::axis_from_angle(self.rotation, Angle::deg(45)) {
            Some(Axis::Right90) => (
                Position { x: self.collision_box.min.z, y: self.collision_box.min.y, z: -self.collision_box.max.x },
                Position { x: self.collision_box.max.z, y: self.collision_box.max.y, z: -self.collision_box.min.x },
            ),
            Some(Axis::Deg180) => (
                Position { x: -self.collision_box.max.x, y: self.collision_box.min.y, z: -self.collision_box.max.z },
                Position { x: -self.collision_box.min.x, y: self.collision_box.max.y, z: -self.collision_box.min.z },
            ),
            Some(Axis::Left90) => (
                Position { x: -self.collision_box.max.z, y: self.collision_box.min.y, z: self.collision_box.min.x },
                Position { x: -self.collision_box.min.z, y: self.collision_box.max.y, z: self.collision_box.max.x },
            ),
            _ => (self.collision_box.min, self.collision_box.max),
        };
        BoundingBox::new(min + self.position, max + self.position)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Room {
    /// World position of the room's (0, 0) sector corner; `y` unused.
    pub position: Position,
    pub sector_count_x: usize,
    pub sector_count_z: usize,
    /// Column-major: index = x * sector_count_z + z.
    pub sectors: Vec<Sector>,
    pub y_top: Length,
    pub y_bottom: Length,
    pub alternate_room: Option<usize>,
    pub portals: Vec<Portal>,
    pub static_meshes: Vec<StaticMesh>,
    pub is_water_room: bool,
    pub ambient_intensity: i16,
    pub name: String,
}

impl Room {
    pub fn sector_index(&self, dx: usize, dz: usize) -> usize {
        dx * self.sector_count_z + dz
    }

    pub fn get_sector_by_index(&self, dx: i32, dz: i32) -> Option<&Sector> {
        if dx < 0 || dz < 0 || dx as usize >= self.sector_count_x || dz as usize >= self.sector_count_z {
            return None;
        }
        self.sectors.get(self.sector_index(dx as usize, dz as usize))
    }

    /// Sector lookup clamped into the room: positions outside snap to the
    /// border ring, and the border corners are never returned. Rooms below
    /// 3x3 sectors fail validation; for them this falls back to the nearest
    /// existing sector, or a solid wall when there is none.
    pub fn get_boundary_sector_by_index(&self, dx: i32, dz: i32) -> &Sector {
        let cx = self.sector_count_x as i32;
        let cz = self.sector_count_z as i32;
        let (mut dx, mut dz) = (dx, dz);
        if dz <= 0 {
            dz = 0;
            dx = dx.clamp(1, (cx - 2).max(1));
        } else if dz >= cz - 1 {
            dz = cz - 1;
            dx = dx.clamp(1, (cx - 2).max(1));
        } else {
            dx = dx.clamp(0, cx - 1);
        }
        let dx = dx.min(cx - 1).max(0) as usize;
        let dz = dz.max(0) as usize;
        self.sectors
            .get(self.sector_index(dx, dz))
            .or_else(|| self.sectors.last())
            .unwrap_or(&SOLID_WALL)
    }

    pub fn get_sector_by_absolute_position(&self, pos: &Position) -> Option<&Sector> {
        self.get_sector_by_index(
            (pos.x - self.position.x).get().div_euclid(SECTOR_SIZE.get()),
            (pos.z - self.position.z).get().div_euclid(SECTOR_SIZE.get()),
        )
    }

    pub fn get_sector_by_absolute_position_mut(&mut self, pos: &Position) -> Option<&mut Sector> {
        let dx = (pos.x - self.position.x).get().div_euclid(SECTOR_SIZE.get());
        let dz = (pos.z - self.position.z).get().div_euclid(SECTOR_SIZE.get());
        if dx < 0 || dz < 0 || dx as usize >= self.sector_count_x || dz as usize >= self.sector_count_z {
            return None;
        }
        let idx = self.sector_index(dx as usize, dz as usize);
        self.sectors.get_mut(idx)
    }

    /// Whether the XZ position lies inside the walkable part of the room,
    /// i.e. not on the outer ring of wall sectors.
    pub fn is_inner_position_xz(&self, pos: &Position) -> bool {
        let sx = (pos.x - self.position.x).get().div_euclid(SECTOR_SIZE.get());
        let sz = (pos.z - self.position.z).get().div_euclid(SECTOR_SIZE.get());
        sx > 0 && sx < self.sector_count_x as i32 - 1 && sz > 0 && sz < self.sector_count_z as i32 - 1
    }
}

/// A pathfinding box. Doors mark the box under them as blocked.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxArea {
    pub x_min: Length,
    pub x_max: Length,
    pub z_min: Length,
    pub z_max: Length,
    pub floor: Length,
    pub blockable: bool,
    pub blocked: bool,
}

impl BoxArea {
    pub fn contains_xz(&self, pos: &Position) -> bool {
        pos.x >= self.x_min && pos.x < self.x_max && pos.z >= self.z_min && pos.z < self.z_max
    }
}

/// Resolves each sector's horizontal portal from its floor data. Runs after
/// load and after every room swap.
pub fn connect_sectors(rooms: &mut [Room], floor_data: &[FloorDataValue]) -> Result<(), LevelError> {
    let room_count = rooms.len();
    rooms.par_iter_mut().enumerate().try_for_each(|(room_idx, room)| {
        for (sector_idx, sector) in room.sectors.iter_mut().enumerate() {
            sector.boundary_room = None;
            let Some(fd) = sector.floor_data else {
                continue;
            };
            let summary = floordata::summarize(floor_data, fd).map_err(|source: FloorDataError| {
                LevelError::FloorData { room: room_idx, sector: sector_idx, source }
            })?;
            if let Some(target) = summary.boundary_room {
                let target = target as usize;
                if target >= room_count {
                    return Err(LevelError::IndexOutOfRange { kind: "boundary room", index: target, len: room_count });
                }
                sector.boundary_room = Some(target);
            }
        }
        Ok(())
    })
}
