// door.rs — Doors: sector blocking while shut, pushing the avatar out of the wings

use serde::{Deserialize, Serialize};
use trx_common::collision::CollisionInfo;
use trx_common::room::{Room, Sector};
use trx_common::units::*;

use super::{animate, lara_touches, push_lara, ObjectKind};
use crate::world::World;

const DOOR_CLOSED: u16 = 0;
const DOOR_OPEN: u16 = 1;

/// One sector a shut door turns into a wall, with what it looked like
/// while the door was open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorBlocker {
    pub room: usize,
    pub sector: usize,
    floor_height: Length,
    ceiling_height: Length,
    floor_data: Option<usize>,
    room_above: Option<usize>,
    room_below: Option<usize>,
    boundary_room: Option<usize>,
    box_index: Option<usize>,
    /// Box marked blocked while the door is shut.
    blocked_box: Option<usize>,
}

impl DoorBlocker {
    fn capture(room: usize, sector: usize, s: &Sector, boxes: &[trx_common::room::BoxArea]) -> Self {
        let blocked_box = s.box_index.filter(|&b| boxes.get(b).is_some_and(|bx| bx.blockable));
        Self {
            room,
            sector,
            floor_height: s.floor_height,
            ceiling_height: s.ceiling_height,
            floor_data: s.floor_data,
            room_above: s.room_above,
            room_below: s.room_below,
            boundary_room: s.boundary_room,
            box_index: s.box_index,
            blocked_box,
        }
    }

    fn snapshot(&self) -> Sector {
        Sector {
            floor_height: self.floor_height,
            ceiling_height: self.ceiling_height,
            floor_data: self.floor_data,
            room_above: self.room_above,
            room_below: self.room_below,
            boundary_room: self.boundary_room,
            box_index: self.box_index,
        }
    }
}

fn sector_index_at(room: &Room, pos: &Position) -> Option<usize> {
    let dx = (pos.x - room.position.x).get().div_euclid(SECTOR_SIZE.get());
    let dz = (pos.z - room.position.z).get().div_euclid(SECTOR_SIZE.get());
    if dx < 0 || dz < 0 || dx as usize >= room.sector_count_x || dz as usize >= room.sector_count_z {
        return None;
    }
    Some(room.sector_index(dx as usize, dz as usize))
}

/// Collects the sectors the door closes off: the wings sector behind it in
/// its own room and, through that sector's portal, the sector at the door
/// on the far side. The alternate room gets the same treatment.
fn find_blockers(w: &World, room: usize, pos: &Position, yaw: Angle) -> Vec<DoorBlocker> {
    let doorway = *pos - pitch(SECTOR_SIZE, yaw);
    let mut blockers = Vec::new();
    let add = |blockers: &mut Vec<DoorBlocker>, room: usize, at: &Position| -> Option<usize> {
        let r = w.rooms.get(room)?;
        let idx = sector_index_at(r, at)?;
        let s = r.sectors.get(idx)?;
        blockers.push(DoorBlocker::capture(room, idx, s, &w.boxes));
        s.boundary_room
    };

    let mut sides = vec![room];
    if let Some(alt) = w.rooms.get(room).and_then(|r| r.alternate_room) {
        sides.push(alt);
    }
    for side in sides {
        let Some(beyond) = add(&mut blockers, side, &doorway) else {
            continue;
        };
        add(&mut blockers, beyond, pos);
    }
    blockers
}

fn blockers(w: &World, id: u16) -> Vec<DoorBlocker> {
    match w.objects.get(id).map(|o| &o.kind) {
        Some(ObjectKind::Door { blockers }) => blockers.clone(),
        _ => Vec::new(),
    }
}

fn set_shut(w: &mut World, id: u16, shut: bool) {
    for b in blockers(w, id) {
        let Some(sector) = w.rooms.get_mut(b.room).and_then(|r| r.sectors.get_mut(b.sector)) else {
            continue;
        };
        *sector = if shut { Sector::wall() } else { b.snapshot() };
        if let Some(bx) = b.blocked_box.and_then(|i| w.boxes.get_mut(i)) {
            bx.blocked = shut;
        }
    }
}

pub fn init(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    let found = find_blockers(w, obj.state.location.room, &obj.position(), obj.state.rotation.y);
    log::trace!("door {} blocks {} sectors", id, found.len());
    if let Some(ObjectKind::Door { blockers }) = w.objects.get_mut(id).map(|o| &mut o.kind) {
        *blockers = found;
    }
    set_shut(w, id, true);
}

pub fn update(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let s = &mut obj.state;
    if s.update_activation_timeout() {
        if s.current_anim_state == DOOR_CLOSED {
            s.goal_anim_state = DOOR_OPEN;
        } else {
            set_shut(w, id, false);
        }
    } else if s.current_anim_state == DOOR_OPEN {
        s.goal_anim_state = DOOR_CLOSED;
    } else {
        set_shut(w, id, true);
    }
    animate(w, id);
}

pub fn collide(w: &mut World, id: u16, coll: &mut CollisionInfo) {
    if !lara_touches(w, id, coll.collision_radius) {
        return;
    }
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    let bbox = obj.bounding_box(&w.animations);
    push_lara(w, id, &bbox, coll);
}

/// Follows two rooms trading places in a room flip.
pub fn remap_rooms(w: &mut World, a: usize, b: usize) {
    for obj in w.objects.objects.values_mut() {
        let ObjectKind::Door { blockers } = &mut obj.kind else {
            continue;
        };
        for bl in blockers.iter_mut() {
            if bl.room == a {
                bl.room = b;
            } else if bl.room == b {
                bl.room = a;
            }
        }
    }
}
