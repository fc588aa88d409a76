// height.rs — Floor and ceiling height resolution
//
// Heights come from the sector's nominal floor, tilted by its slant chunk
// and patched by dynamic objects (bridges, trapdoors) that the sector's
// command sequence references.

use crate::floordata::{ChunkPayload, CommandOpcode, FloorDataValue};
use crate::room::{Room, Sector};
use crate::units::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SlantClass {
    #[default]
    None,
    Max512,
    Steep,
}

/// Objects that can raise or lower the effective floor or ceiling of the
/// sector they stand on.
pub trait HeightPatch {
    fn patch_floor(&self, object_id: u16, pos: &Position, y: &mut Length);
    fn patch_ceiling(&self, object_id: u16, pos: &Position, y: &mut Length);
}

/// No dynamic objects.
pub struct NoPatches;

impl HeightPatch for NoPatches {
    fn patch_floor(&self, _object_id: u16, _pos: &Position, _y: &mut Length) {}
    fn patch_ceiling(&self, _object_id: u16, _pos: &Position, _y: &mut Length) {}
}

/// The room arena and the floor-data stream, borrowed together for queries.
#[derive(Clone, Copy)]
pub struct Geometry<'a> {
    pub rooms: &'a [Room],
    pub floor_data: &'a [FloorDataValue],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeightInfo {
    pub y: Length,
    pub slant_class: SlantClass,
    /// Floor-data index of the first `Death` or `CommandSequence` chunk.
    pub last_command_sequence_or_death: Option<usize>,
}

impl Default for HeightInfo {
    fn default() -> Self {
        Self { y: Length(0), slant_class: SlantClass::None, last_command_sequence_or_death: None }
    }
}

fn follow_down<'a>(geo: &Geometry<'a>, mut sector: &'a Sector, pos: &Position) -> &'a Sector {
    while let Some(below) = sector.room_below {
        match geo.rooms[below].get_sector_by_absolute_position(pos) {
            Some(s) => sector = s,
            None => break,
        }
    }
    sector
}

fn follow_up<'a>(geo: &Geometry<'a>, mut sector: &'a Sector, pos: &Position) -> &'a Sector {
    while let Some(above) = sector.room_above {
        match geo.rooms[above].get_sector_by_absolute_position(pos) {
            Some(s) => sector = s,
            None => break,
        }
    }
    sector
}

fn local_xz(pos: &Position) -> (i32, i32) {
    (pos.x.get() & 1023, pos.z.get() & 1023)
}

impl HeightInfo {
    /// Resolved floor at `pos`, starting from `sector` and descending into
    /// the rooms below.
    pub fn from_floor(geo: &Geometry<'_>, sector: &Sector, pos: &Position, objects: &dyn HeightPatch) -> Self {
        let sector = follow_down(geo, sector, pos);
        let mut hi = HeightInfo { y: sector.floor_height, ..Default::default() };

        let Some(fd) = sector.floor_data else {
            return hi;
        };
        let records = match crate::floordata::decode(geo.floor_data, fd) {
            Ok(r) => r,
            Err(e) => {
                log::error!("malformed floor data at {}: {}", fd, e);
                return hi;
            }
        };

        for record in &records {
            match &record.payload {
                ChunkPayload::FloorSlant { x, z } => {
                    let (x, z) = (*x as i32, *z as i32);
                    if x == 0 && z == 0 {
                        continue;
                    }
                    hi.slant_class = if x.abs() <= 2 && z.abs() <= 2 { SlantClass::Max512 } else { SlantClass::Steep };
                    let (lx, lz) = local_xz(pos);
                    if z < 0 {
                        hi.y -= Length((z * lz) >> 2);
                    } else {
                        hi.y += Length((z * ((1023 - lz) & 1023)) >> 2);
                    }
                    if x < 0 {
                        hi.y -= Length((x * lx) >> 2);
                    } else {
                        hi.y += Length((x * ((1023 - lx) & 1023)) >> 2);
                    }
                }
                ChunkPayload::Death => {
                    hi.last_command_sequence_or_death.get_or_insert(record.index);
                }
                ChunkPayload::CommandSequence(seq) => {
                    hi.last_command_sequence_or_death.get_or_insert(record.index);
                    for cmd in &seq.commands {
                        let c = cmd.command();
                        if c.opcode == CommandOpcode::Activate {
                            objects.patch_floor(c.parameter, pos, &mut hi.y);
                        }
                    }
                }
                _ => {}
            }
        }
        hi
    }

    /// Resolved ceiling at `pos`, ascending into the rooms above.
    pub fn from_ceiling(geo: &Geometry<'_>, sector: &Sector, pos: &Position, objects: &dyn HeightPatch) -> Self {
        let top = follow_up(geo, sector, pos);
        let mut hi = HeightInfo { y: top.ceiling_height, ..Default::default() };

        if let Some(fd) = top.floor_data {
            match crate::floordata::decode(geo.floor_data, fd) {
                Ok(records) => {
                    for record in &records {
                        if let ChunkPayload::CeilingSlant { x, z } = record.payload {
                            let (x, z) = (x as i32, z as i32);
                            let (lx, lz) = local_xz(pos);
                            if z < 0 {
                                hi.y += Length((z * lz) >> 2);
                            } else {
                                hi.y -= Length((z * ((1023 - lz) & 1023)) >> 2);
                            }
                            if x < 0 {
                                hi.y += Length((x * ((1023 - lx) & 1023)) >> 2);
                            } else {
                                hi.y -= Length((x * lx) >> 2);
                            }
                        }
                    }
                }
                Err(e) => log::error!("malformed floor data at {}: {}", fd, e),
            }
        }

        // objects patch the ceiling from the sector the query started in,
        // after descending to the floor-bearing sector
        let bottom = follow_down(geo, sector, pos);
        if let Some(fd) = bottom.floor_data {
            if let Ok(records) = crate::floordata::decode(geo.floor_data, fd) {
                for record in &records {
                    if let ChunkPayload::CommandSequence(seq) = &record.payload {
                        for cmd in &seq.commands {
                            let c = cmd.command();
                            if c.opcode == CommandOpcode::Activate {
                                objects.patch_ceiling(c.parameter, pos, &mut hi.y);
                            }
                        }
                    }
                }
            }
        }
        hi
    }
}

/// Floor and ceiling relative to an object of a given height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerticalDistances {
    /// Floor distance relative to the object's origin.
    pub floor: HeightInfo,
    /// Ceiling distance relative to the object's top.
    pub ceiling: HeightInfo,
}

impl VerticalDistances {
    pub fn init(
        &mut self,
        geo: &Geometry<'_>,
        sector: &Sector,
        position: &Position,
        objects: &dyn HeightPatch,
        object_y: Length,
        object_height: Length,
    ) {
        self.floor = HeightInfo::from_floor(geo, sector, position, objects);
        if self.floor.y != INVALID_HEIGHT {
            self.floor.y -= object_y;
        }

        self.ceiling = HeightInfo::from_ceiling(geo, sector, position, objects);
        if self.ceiling.y != INVALID_HEIGHT {
            self.ceiling.y -= object_y - object_height;
        }
    }
}

/// Floor slant bytes under `pos`, or zero when the point is clearly above
/// the floor.
pub fn floor_slant_info(geo: &Geometry<'_>, sector: &Sector, pos: &Position) -> (i8, i8) {
    let sector = follow_down(geo, sector, pos);
    if pos.y + QUARTER_SECTOR_SIZE * 2 < sector.floor_height {
        return (0, 0);
    }
    let Some(fd) = sector.floor_data else {
        return (0, 0);
    };
    match crate::floordata::decode(geo.floor_data, fd) {
        Ok(records) => match records.first().map(|r| &r.payload) {
            Some(ChunkPayload::FloorSlant { x, z }) => (*x, *z),
            _ => (0, 0),
        },
        Err(_) => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::floordata::{ActivationState, Command};

    fn single_sector(floor: i32, ceiling: i32, fd: Option<usize>) -> Vec<Room> {
        vec![Room {
            position: Position::ORIGIN,
            sector_count_x: 1,
            sector_count_z: 1,
            sectors: vec![Sector {
                floor_height: Length(floor),
                ceiling_height: Length(ceiling),
                floor_data: fd,
                ..Default::default()
            }],
            ..Default::default()
        }]
    }

    struct Bridge {
        id: u16,
        y: Length,
    }

    impl HeightPatch for Bridge {
        fn patch_floor(&self, object_id: u16, pos: &Position, y: &mut Length) {
            if object_id == self.id && pos.y <= self.y {
                *y = self.y;
            }
        }
        fn patch_ceiling(&self, object_id: u16, pos: &Position, y: &mut Length) {
            if object_id == self.id && pos.y > self.y {
                *y = self.y + Length(64);
            }
        }
    }

    #[test]
    fn test_flat_floor() {
        let rooms = single_sector(1024, 0, None);
        let geo = Geometry { rooms: &rooms, floor_data: &[] };
        let hi = HeightInfo::from_floor(&geo, &rooms[0].sectors[0], &Position::new(500, 0, 500), &NoPatches);
        assert_eq!(hi.y, Length(1024));
        assert_eq!(hi.slant_class, SlantClass::None);
        assert!(hi.last_command_sequence_or_death.is_none());
    }

    #[test]
    fn test_zero_slant_is_none() {
        let fd = vec![0x8002, 0x0000];
        let rooms = single_sector(0, -1024, Some(0));
        let geo = Geometry { rooms: &rooms, floor_data: &fd };
        let hi = HeightInfo::from_floor(&geo, &rooms[0].sectors[0], &Position::new(100, 0, 100), &NoPatches);
        assert_eq!(hi.slant_class, SlantClass::None);
        assert_eq!(hi.y, Length(0));
    }

    #[test]
    fn test_small_slant_tilts_floor() {
        // x slant +2: floor drops toward +x
        let fd = vec![0x8002, 0x0002];
        let rooms = single_sector(0, -1024, Some(0));
        let geo = Geometry { rooms: &rooms, floor_data: &fd };
        let at = |x: i32| HeightInfo::from_floor(&geo, &rooms[0].sectors[0], &Position::new(x, 0, 0), &NoPatches);
        assert_eq!(at(0).slant_class, SlantClass::Max512);
        assert_eq!(at(0).y, Length((2 * 1023) >> 2));
        assert_eq!(at(1023).y, Length(0));
    }

    #[test]
    fn test_steep_slant() {
        let fd = vec![0x8002, (3u16 << 8) as u16];
        let rooms = single_sector(0, -1024, Some(0));
        let geo = Geometry { rooms: &rooms, floor_data: &fd };
        let hi = HeightInfo::from_floor(&geo, &rooms[0].sectors[0], &Position::new(0, 0, 0), &NoPatches);
        assert_eq!(hi.slant_class, SlantClass::Steep);
    }

    #[test]
    fn test_bridge_patches_floor() {
        let fd = vec![
            0x8004,
            ActivationState::default().to_word(),
            Command { opcode: CommandOpcode::Activate, parameter: 7, is_last: true }.encode(),
        ];
        let rooms = single_sector(2048, 0, Some(0));
        let geo = Geometry { rooms: &rooms, floor_data: &fd };
        let bridge = Bridge { id: 7, y: Length(1024) };
        let hi = HeightInfo::from_floor(&geo, &rooms[0].sectors[0], &Position::new(10, 500, 10), &bridge);
        assert_eq!(hi.y, Length(1024));
        assert_eq!(hi.last_command_sequence_or_death, Some(0));
        let below = HeightInfo::from_floor(&geo, &rooms[0].sectors[0], &Position::new(10, 1500, 10), &bridge);
        assert_eq!(below.y, Length(2048));
        let ceiling = HeightInfo::from_ceiling(&geo, &rooms[0].sectors[0], &Position::new(10, 1500, 10), &bridge);
        assert_eq!(ceiling.y, Length(1088));
    }

    #[test]
    fn test_vertical_distances() {
        let rooms = single_sector(1000, -1000, None);
        let geo = Geometry { rooms: &rooms, floor_data: &[] };
        let mut vd = VerticalDistances::default();
        vd.init(&geo, &rooms[0].sectors[0], &Position::new(0, 0, 0), &NoPatches, Length(900), Length(762));
        assert_eq!(vd.floor.y, Length(100));
        assert_eq!(vd.ceiling.y, Length(-1000 - (900 - 762)));
    }
}
