// collision.rs — Four-point collision probe and pushback
//
// A character is probed at its origin and at three points one radius
// ahead: straight ahead and at the two forward corners of the quadrant it
// faces. The probe heights are classified against the character's valid
// floor band and ceiling clearance, and a shift vector is computed that
// moves the character back out of whatever it ran into.

use bitflags::bitflags;

use crate::floordata::{ChunkType, FloorDataChunk};
use crate::height::{floor_slant_info, Geometry, HeightPatch, SlantClass, VerticalDistances};
use crate::location::Location;
use crate::units::*;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CollisionPolicies: u8 {
        const SLOPES_ARE_WALLS  = 0x01;
        const SLOPES_ARE_PITS   = 0x02;
        const LAVA_IS_PIT       = 0x04;
        const ENABLE_BADDIE_PUSH = 0x08;
        const ENABLE_SPAZ       = 0x10;
    }
}

impl CollisionPolicies {
    /// Standing still or walking slowly: slopes block and kill sectors are edges.
    pub const SLOPE_BLOCKING: Self = Self::SLOPES_ARE_WALLS.union(Self::SLOPES_ARE_PITS).union(Self::LAVA_IS_PIT);
    /// Enemies may push the avatar and hits make it flinch.
    pub const SPAZ_PUSH: Self = Self::ENABLE_BADDIE_PUSH.union(Self::ENABLE_SPAZ);
}

/// What the probe ran into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AxisColl {
    #[default]
    None,
    Front,
    Left,
    Right,
    Top,
    FrontTop,
    FrontLeft,
    FrontRight,
    Jammed,
}

/// Probe configuration and result for one character.
#[derive(Clone, Debug)]
pub struct CollisionInfo {
    pub collision_type: AxisColl,
    pub shift: Position,
    pub facing_angle: Angle,
    pub collision_radius: Length,
    /// Floor offsets within `[min, max]` are walkable.
    pub valid_floor_height: (Length, Length),
    /// Ceiling offsets above this value block the probe.
    pub valid_ceiling_height_min: Length,
    pub mid: VerticalDistances,
    pub front: VerticalDistances,
    pub front_left: VerticalDistances,
    pub front_right: VerticalDistances,
    /// Position at the start of the frame; the shift is measured from here.
    pub initial_position: Position,
    pub floor_slant_x: i8,
    pub floor_slant_z: i8,
    pub policies: CollisionPolicies,
    pub has_static_mesh_collision: bool,
}

impl Default for CollisionInfo {
    fn default() -> Self {
        Self {
            collision_type: AxisColl::None,
            shift: Position::ORIGIN,
            facing_angle: Angle::ZERO,
            collision_radius: DEFAULT_COLLISION_RADIUS,
            valid_floor_height: (-HEIGHT_LIMIT, HEIGHT_LIMIT),
            valid_ceiling_height_min: Length(0),
            mid: VerticalDistances::default(),
            front: VerticalDistances::default(),
            front_left: VerticalDistances::default(),
            front_right: VerticalDistances::default(),
            initial_position: Position::ORIGIN,
            floor_slant_x: 0,
            floor_slant_z: 0,
            policies: CollisionPolicies::empty(),
            has_static_mesh_collision: false,
        }
    }
}

/// Distance that moves `src` back into the sector of `dst`, or zero when
/// both lie in the same sector.
pub fn find_grid_shift(src: Length, dst: Length) -> Length {
    let src_sector = src.get().div_euclid(SECTOR_SIZE.get());
    let dst_sector = dst.get().div_euclid(SECTOR_SIZE.get());
    if src_sector == dst_sector {
        Length(0)
    } else if dst_sector > src_sector {
        Length(SECTOR_SIZE.get() - ((src.get() & 1023) - 1))
    } else {
        Length(-((src.get() & 1023) + 1))
    }
}

fn is_death_sector(geo: &Geometry<'_>, vd: &VerticalDistances) -> bool {
    match vd.floor.last_command_sequence_or_death {
        Some(idx) => match geo.floor_data.get(idx) {
            Some(&w) => FloorDataChunk::decode(w, idx).map(|c| c.chunk_type == ChunkType::Death).unwrap_or(false),
            None => false,
        },
        None => false,
    }
}

impl CollisionInfo {
    fn apply_policies(&self, geo: &Geometry<'_>, vd: &mut VerticalDistances) {
        if self.policies.contains(CollisionPolicies::SLOPES_ARE_WALLS)
            && vd.floor.slant_class == SlantClass::Steep
            && vd.floor.y < Length(0)
        {
            vd.floor.y = Length(-32767);
        } else if self.policies.contains(CollisionPolicies::SLOPES_ARE_PITS)
            && vd.floor.slant_class == SlantClass::Steep
            && vd.floor.y > Length(0)
        {
            vd.floor.y = Length(512);
        } else if self.policies.contains(CollisionPolicies::LAVA_IS_PIT)
            && vd.floor.y > Length(0)
            && is_death_sector(geo, vd)
        {
            vd.floor.y = Length(512);
        }
    }

    fn probe(
        &self,
        geo: &Geometry<'_>,
        objects: &dyn HeightPatch,
        room: usize,
        at: Position,
        y: Length,
        height: Length,
    ) -> VerticalDistances {
        let mut loc = Location::new(room, at);
        let sector = loc.update_room(geo.rooms);
        let mut vd = VerticalDistances::default();
        vd.init(geo, sector, &loc.position, objects, y, height);
        vd
    }

    fn floor_out_of_range(&self, vd: &VerticalDistances) -> bool {
        vd.floor.y > self.valid_floor_height.1 || vd.floor.y < self.valid_floor_height.0
    }

    /// Probes the four points around `location` for a character `height`
    /// units tall and classifies the result.
    pub fn init_height_info(
        &mut self,
        geo: &Geometry<'_>,
        objects: &dyn HeightPatch,
        location: &Location,
        height: Length,
    ) {
        self.collision_type = AxisColl::None;
        self.shift = Position::ORIGIN;
        self.has_static_mesh_collision = false;

        let pos = location.position;
        let y_top = pos.y - height;
        let probe_pos = Position { y: y_top, ..pos };

        self.mid = self.probe(geo, objects, location.room, probe_pos, pos.y, height);
        {
            let mut loc = Location::new(location.room, probe_pos);
            let sector = loc.update_room(geo.rooms);
            let (sx, sz) = floor_slant_info(geo, sector, &pos);
            self.floor_slant_x = sx;
            self.floor_slant_z = sz;
        }

        let r = self.collision_radius;
        let front_x = Length((self.facing_angle.sin() * r.get() as f32) as i32);
        let front_z = Length((self.facing_angle.cos() * r.get() as f32) as i32);
        let (fx, fz, lx, lz, rx, rz) = match axis_from_angle(self.facing_angle, Angle::deg(45)) {
            Some(Axis::Right90) => (r, front_z, r, r, r, -r),
            Some(Axis::Deg180) => (front_x, -r, r, -r, -r, -r),
            Some(Axis::Left90) => (-r, front_z, -r, -r, -r, r),
            _ => (front_x, r, -r, r, r, r),
        };
        let quadrant = axis_from_angle(self.facing_angle, Angle::deg(45)).unwrap_or(Axis::Deg0);

        let at = |dx: Length, dz: Length| Position { x: pos.x + dx, y: y_top, z: pos.z + dz };

        let mut front = self.probe(geo, objects, location.room, at(fx, fz), pos.y, height);
        self.apply_policies(geo, &mut front);
        let mut front_left = self.probe(geo, objects, location.room, at(lx, lz), pos.y, height);
        self.apply_policies(geo, &mut front_left);
        let mut front_right = self.probe(geo, objects, location.room, at(rx, rz), pos.y, height);
        self.apply_policies(geo, &mut front_right);
        self.front = front;
        self.front_left = front_left;
        self.front_right = front_right;

        let old = self.initial_position;
        self.classify(pos, old, quadrant, (fx, fz), (lx, lz), (rx, rz));

        if self.collision_type == AxisColl::None {
            self.check_static_meshes(geo, location, height);
        }

        log::trace!(
            "collision at {}: {:?} shift {} mid floor {} ceiling {}",
            pos,
            self.collision_type,
            self.shift,
            self.mid.floor.y,
            self.mid.ceiling.y
        );
    }

    fn classify(
        &mut self,
        pos: Position,
        old: Position,
        quadrant: Axis,
        (fx, fz): (Length, Length),
        (lx, lz): (Length, Length),
        (rx, rz): (Length, Length),
    ) {
        if self.mid.floor.y == INVALID_HEIGHT {
            self.shift = old - pos;
            self.collision_type = AxisColl::Front;
            return;
        }

        if self.mid.floor.y - self.mid.ceiling.y <= Length(0) {
            self.shift = old - pos;
            self.collision_type = AxisColl::Jammed;
            return;
        }

        if self.mid.ceiling.y >= Length(0) {
            self.shift.y = self.mid.ceiling.y;
            self.collision_type = AxisColl::Top;
        }

        if self.floor_out_of_range(&self.front) || self.front.ceiling.y > self.valid_ceiling_height_min {
            match quadrant {
                Axis::Deg0 | Axis::Deg180 => {
                    self.shift.x = old.x - pos.x;
                    self.shift.z = find_grid_shift(pos.z + fz, pos.z);
                }
                Axis::Right90 | Axis::Left90 => {
                    self.shift.x = find_grid_shift(pos.x + fx, pos.x);
                    self.shift.z = old.z - pos.z;
                }
            }
            self.collision_type = AxisColl::Front;
            return;
        }

        if self.front.ceiling.y == self.valid_ceiling_height_min {
            self.shift = old - pos;
            self.collision_type = AxisColl::FrontTop;
            return;
        }

        if self.floor_out_of_range(&self.front_left) {
            match quadrant {
                Axis::Deg0 | Axis::Deg180 => self.shift.x = find_grid_shift(pos.x + lx, pos.x + fx),
                Axis::Right90 | Axis::Left90 => self.shift.z = find_grid_shift(pos.z + lz, pos.z + fz),
            }
            self.collision_type = AxisColl::FrontLeft;
            return;
        }

        if self.floor_out_of_range(&self.front_right) {
            match quadrant {
                Axis::Deg0 | Axis::Deg180 => self.shift.x = find_grid_shift(pos.x + rx, pos.x + fx),
                Axis::Right90 | Axis::Left90 => self.shift.z = find_grid_shift(pos.z + rz, pos.z + fz),
            }
            self.collision_type = AxisColl::FrontRight;
            return;
        }

        // a sloped ceiling dipping into one side only
        if self.front_left.ceiling.y > self.valid_ceiling_height_min {
            self.shift = old - pos;
            self.collision_type = AxisColl::Left;
        } else if self.front_right.ceiling.y > self.valid_ceiling_height_min {
            self.shift = old - pos;
            self.collision_type = AxisColl::Right;
        }
    }

    fn check_static_meshes(&mut self, geo: &Geometry<'_>, location: &Location, height: Length) {
        let pos = location.position;
        let r = self.collision_radius;
        let body = BoundingBox::new(
            Position { x: pos.x - r, y: pos.y - height, z: pos.z - r },
            Position { x: pos.x + r, y: pos.y, z: pos.z + r },
        );
        let Some(room) = geo.rooms.get(location.room) else {
            return;
        };
        for mesh in room.static_meshes.iter().filter(|m| m.collidable) {
            let b = mesh.world_box();
            let overlaps = body.min.x < b.max.x
                && body.max.x > b.min.x
                && body.min.y < b.max.y
                && body.max.y > b.min.y
                && body.min.z < b.max.z
                && body.max.z > b.min.z;
            if overlaps {
                self.has_static_mesh_collision = true;
                self.shift = self.initial_position - pos;
                self.collision_type = AxisColl::Front;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::height::NoPatches;
    use crate::room::{Room, Sector, StaticMesh};

    /// 5x5 room with floor 0, ceiling -2048 and a raised step at (2, 3).
    fn test_room(step: i32) -> Room {
        let mut room = Room { sector_count_x: 5, sector_count_z: 5, ..Default::default() };
        for x in 0..5 {
            for z in 0..5 {
                let border = x == 0 || z == 0 || x == 4 || z == 4;
                room.sectors.push(if border {
                    Sector::wall()
                } else {
                    Sector { floor_height: Length(0), ceiling_height: Length(-2048), ..Default::default() }
                });
            }
        }
        let i = room.sector_index(2, 3);
        room.sectors[i].floor_height = Length(step);
        room
    }

    fn walk_info(pos: Position) -> CollisionInfo {
        CollisionInfo {
            valid_floor_height: (-STEPPABLE_HEIGHT, STEPPABLE_HEIGHT),
            initial_position: pos,
            ..Default::default()
        }
    }

    #[test]
    fn test_find_grid_shift() {
        assert_eq!(find_grid_shift(Length(1000), Length(900)), Length(0));
        // moving back from sector 1 into sector 0
        assert_eq!(find_grid_shift(Length(1030), Length(1000)), Length(-7));
        // moving forward from sector 0 into sector 1
        assert_eq!(find_grid_shift(Length(1020), Length(1030)), Length(5));
    }

    #[test]
    fn test_open_floor_is_clear() {
        let rooms = vec![test_room(0)];
        let geo = Geometry { rooms: &rooms, floor_data: &[] };
        let pos = Position::new(2048 + 512, 0, 2048 + 512);
        let mut coll = walk_info(pos);
        coll.init_height_info(&geo, &NoPatches, &Location::new(0, pos), LARA_WALK_HEIGHT);
        assert_eq!(coll.collision_type, AxisColl::None);
        assert_eq!(coll.mid.floor.y, Length(0));
        assert_eq!(coll.mid.ceiling.y, Length(-2048 + 762));
    }

    #[test]
    fn test_step_ahead_is_front() {
        let rooms = vec![test_room(-512)];
        let geo = Geometry { rooms: &rooms, floor_data: &[] };
        let start = Position::new(2048 + 512, 0, 3072 - 120);
        let pos = Position::new(2048 + 512, 0, 3072 - 50);
        let mut coll = walk_info(start);
        coll.init_height_info(&geo, &NoPatches, &Location::new(0, pos), LARA_WALK_HEIGHT);
        assert_eq!(coll.collision_type, AxisColl::Front);
        assert_eq!(coll.front.floor.y, Length(-512));
        assert_eq!(coll.shift.x, Length(0));
        assert_eq!(coll.shift.z, Length(-51));
    }

    #[test]
    fn test_pushback_across_sector_edge() {
        let rooms = vec![test_room(-512)];
        let geo = Geometry { rooms: &rooms, floor_data: &[] };
        // standing on the raised sector, facing the drop behind it
        let pos = Position::new(2048 + 512, -512, 3072 + 10);
        let mut coll = walk_info(pos);
        coll.facing_angle = Angle::deg(180);
        coll.init_height_info(&geo, &NoPatches, &Location::new(0, pos), LARA_WALK_HEIGHT);
        assert_eq!(coll.collision_type, AxisColl::Front);
        assert_eq!(coll.front.floor.y, Length(512));
        assert_eq!(coll.shift.x, Length(0));
        assert_eq!(coll.shift.z, Length(91));
    }

    #[test]
    fn test_side_probe_is_front_right() {
        let rooms = vec![test_room(-512)];
        let geo = Geometry { rooms: &rooms, floor_data: &[] };
        // sector (2, 3) is ahead-right of a character in sector (1, 2) facing +z
        let pos = Position::new(2048 - 50, 0, 3072 - 50);
        let mut coll = walk_info(pos);
        coll.init_height_info(&geo, &NoPatches, &Location::new(0, pos), LARA_WALK_HEIGHT);
        assert_eq!(coll.collision_type, AxisColl::FrontRight);
        assert_eq!(coll.shift.x, Length(-51));
    }

    #[test]
    fn test_low_ceiling_is_jammed() {
        let mut room = test_room(0);
        let i = room.sector_index(2, 2);
        room.sectors[i].ceiling_height = Length(-500);
        let rooms = vec![room];
        let geo = Geometry { rooms: &rooms, floor_data: &[] };
        let pos = Position::new(2048 + 512, 0, 2048 + 512);
        let mut coll = walk_info(pos);
        coll.init_height_info(&geo, &NoPatches, &Location::new(0, pos), Length(1000));
        assert_eq!(coll.collision_type, AxisColl::Jammed);
    }

    #[test]
    fn test_slopes_are_walls() {
        let fd = vec![0x8002, 4u16 << 8];
        let mut room = test_room(0);
        let i = room.sector_index(2, 3);
        room.sectors[i].floor_data = Some(0);
        let rooms = vec![room];
        let geo = Geometry { rooms: &rooms, floor_data: &fd };
        // the slope ahead rises above the probe origin
        let pos = Position::new(2048 + 512, 1500, 3072 - 50);
        let mut coll = CollisionInfo {
            valid_floor_height: (-HEIGHT_LIMIT, HEIGHT_LIMIT),
            policies: CollisionPolicies::SLOPES_ARE_WALLS,
            initial_position: pos,
            ..Default::default()
        };
        coll.init_height_info(&geo, &NoPatches, &Location::new(0, pos), Length(10));
        assert_eq!(coll.front.floor.y, Length(-32767));
    }

    #[test]
    fn test_static_mesh_blocks() {
        let mut room = test_room(0);
        room.static_meshes.push(StaticMesh {
            position: Position::new(2048 + 512, 0, 2048 + 600),
            rotation: Angle::ZERO,
            collision_box: BoundingBox::new(Position::new(-50, -300, -50), Position::new(50, 0, 50)),
            collidable: true,
        });
        let rooms = vec![room];
        let geo = Geometry { rooms: &rooms, floor_data: &[] };
        let pos = Position::new(2048 + 512, 0, 2048 + 512);
        let mut coll = walk_info(pos);
        coll.init_height_info(&geo, &NoPatches, &Location::new(0, pos), LARA_WALK_HEIGHT);
        assert!(coll.has_static_mesh_collision);
        assert_eq!(coll.collision_type, AxisColl::Front);
    }
}
