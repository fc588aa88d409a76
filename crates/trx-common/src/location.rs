// location.rs — Room-bound positions

use crate::room::{Room, Sector};
use crate::units::*;
use serde::{Deserialize, Serialize};

/// A world position together with the index of the room that contains it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub room: usize,
    pub position: Position,
}

impl Location {
    pub const fn new(room: usize, position: Position) -> Self {
        Self { room, position }
    }

    /// Re-resolves `room` for the current position and returns the sector
    /// underneath it.
    ///
    /// Horizontal portals are chased first. Afterwards the vertical links
    /// are followed: down while the position is below the sector's floor,
    /// otherwise up while it is above the ceiling. Each stage gives up after
    /// one hop per room, so a cyclic portal graph cannot stall the caller.
    pub fn update_room<'a>(&mut self, rooms: &'a [Room]) -> &'a Sector {
        let max_hops = rooms.len();
        let mut sector;
        let mut hops = 0;
        loop {
            let room = &rooms[self.room];
            sector = room.get_boundary_sector_by_index(
                (self.position.x - room.position.x).get().div_euclid(SECTOR_SIZE.get()),
                (self.position.z - room.position.z).get().div_euclid(SECTOR_SIZE.get()),
            );
            let Some(next) = sector.boundary_room else { break };
            if hops >= max_hops {
                log::warn!("portal chain at {} does not end, staying in room {}", self.position, self.room);
                break;
            }
            hops += 1;
            self.room = next;
        }

        hops = 0;
        if self.position.y >= sector.floor_height {
            while self.position.y >= sector.floor_height {
                let Some(below) = sector.room_below else { break };
                if hops >= max_hops {
                    log::warn!("rooms below {} loop, staying in room {}", self.position, self.room);
                    break;
                }
                hops += 1;
                self.room = below;
                sector = Self::sector_at(rooms, below, &self.position);
            }
        } else {
            while self.position.y < sector.ceiling_height {
                let Some(above) = sector.room_above else { break };
                if hops >= max_hops {
                    log::warn!("rooms above {} loop, staying in room {}", self.position, self.room);
                    break;
                }
                hops += 1;
                self.room = above;
                sector = Self::sector_at(rooms, above, &self.position);
            }
        }

        sector
    }

    fn sector_at<'a>(rooms: &'a [Room], room: usize, pos: &Position) -> &'a Sector {
        let r = &rooms[room];
        match r.get_sector_by_absolute_position(pos) {
            Some(s) => s,
            None => {
                log::warn!("position {} outside room {} while following vertical link", pos, room);
                r.get_boundary_sector_by_index(
                    (pos.x - r.position.x).get().div_euclid(SECTOR_SIZE.get()),
                    (pos.z - r.position.z).get().div_euclid(SECTOR_SIZE.get()),
                )
            }
        }
    }

    pub fn is_valid(&self, rooms: &[Room]) -> bool {
        rooms[self.room].is_inner_position_xz(&self.position)
    }

    pub fn move_by(&mut self, delta: Position) {
        self.position += delta;
    }

    pub fn moved(&self, delta: Position) -> Self {
        Self { room: self.room, position: self.position + delta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_room(x: i32, count_x: usize, count_z: usize, floor: i32, ceiling: i32) -> Room {
        let mut room = Room {
            position: Position::new(x, 0, 0),
            sector_count_x: count_x,
            sector_count_z: count_z,
            ..Default::default()
        };
        for dx in 0..count_x {
            for dz in 0..count_z {
                let border = dx == 0 || dz == 0 || dx == count_x - 1 || dz == count_z - 1;
                room.sectors.push(if border {
                    Sector::wall()
                } else {
                    Sector {
                        floor_height: Length(floor),
                        ceiling_height: Length(ceiling),
                        ..Default::default()
                    }
                });
            }
        }
        room
    }

    #[test]
    fn test_update_room_follows_portal() {
        // room 1 starts at x = 3 sectors and overlaps room 0's east wall
        let mut rooms = vec![flat_room(0, 4, 4, 0, -2048), flat_room(2 * 1024, 4, 4, 0, -2048)];
        let idx = rooms[0].sector_index(3, 1);
        rooms[0].sectors[idx].boundary_room = Some(1);
        let idx = rooms[0].sector_index(3, 2);
        rooms[0].sectors[idx].boundary_room = Some(1);

        let mut loc = Location::new(0, Position::new(3 * 1024 + 100, -100, 1024 + 512));
        let sector = loc.update_room(&rooms);
        assert_eq!(loc.room, 1);
        assert_eq!(sector.floor_height, Length(0));
        assert!(loc.is_valid(&rooms));
    }

    #[test]
    fn test_update_room_descends() {
        let mut rooms = vec![flat_room(0, 4, 4, 0, -2048), flat_room(0, 4, 4, 2048, 0)];
        for dx in 1..3 {
            for dz in 1..3 {
                let i = rooms[0].sector_index(dx, dz);
                rooms[0].sectors[i].room_below = Some(1);
                rooms[1].sectors[i].room_above = Some(0);
            }
        }

        let mut loc = Location::new(0, Position::new(1500, 500, 1500));
        loc.update_room(&rooms);
        assert_eq!(loc.room, 1);

        loc.position.y = Length(-500);
        loc.update_room(&rooms);
        assert_eq!(loc.room, 0);
    }

    #[test]
    fn test_update_room_stops_on_portal_cycle() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut rooms = vec![flat_room(0, 3, 3, 0, -2048), flat_room(0, 3, 3, 0, -2048)];
        let idx = rooms[0].sector_index(1, 1);
        rooms[0].sectors[idx].boundary_room = Some(1);
        rooms[1].sectors[idx].boundary_room = Some(0);

        let mut loc = Location::new(0, Position::new(1500, -100, 1500));
        loc.update_room(&rooms);
        assert!(loc.room < 2);
    }

    #[test]
    fn test_update_room_stops_on_vertical_cycle() {
        let mut rooms = vec![flat_room(0, 3, 3, 0, -2048), flat_room(0, 3, 3, 0, -2048)];
        let idx = rooms[0].sector_index(1, 1);
        rooms[0].sectors[idx].room_below = Some(1);
        rooms[1].sectors[idx].room_below = Some(0);

        let mut loc = Location::new(0, Position::new(1500, 500, 1500));
        loc.update_room(&rooms);
        assert!(loc.room < 2);
    }

    #[test]
    fn test_update_room_in_tiny_rooms() {
        let one = Room {
            sector_count_x: 1,
            sector_count_z: 1,
            sectors: vec![Sector::default()],
            ..Default::default()
        };
        let rooms = vec![one, Room::default()];

        let mut loc = Location::new(0, Position::new(5000, 0, -5000));
        assert_eq!(loc.update_room(&rooms).floor_height, Length(0));
        let mut loc = Location::new(1, Position::new(100, 0, 100));
        assert!(loc.update_room(&rooms).is_wall());
    }

    #[test]
    fn test_update_room_stays_without_links() {
        let rooms = vec![flat_room(0, 4, 4, 0, -2048)];
        let mut loc = Location::new(0, Position::new(1500, 100, 1500));
        let sector = loc.update_room(&rooms);
        assert_eq!(loc.room, 0);
        assert_eq!(sector.ceiling_height, Length(-2048));
    }
}
