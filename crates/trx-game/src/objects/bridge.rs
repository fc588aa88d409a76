// bridge.rs — Bridges and trapdoors: walkable surfaces that patch sector heights

use trx_common::units::*;

use super::{BridgeKind, Object, ObjectKind};
use crate::world::World;

const BRIDGE_THICKNESS: Length = Length(256);
const TRAPDOOR_OPEN: u16 = 1;
const TRAPDOOR_CLOSED: u16 = 0;

/// Distance into the sector along the bridge's incline, 0..1023.
fn incline_offset(obj: &Object, pos: &Position) -> i32 {
    let mask = SECTOR_SIZE.get() - 1;
    let yaw = obj.state.rotation.y;
    if yaw == Angle::ZERO {
        (SECTOR_SIZE - pos.x).get() & mask
    } else if yaw == Angle::deg(180) {
        pos.x.get() & mask
    } else if yaw == Angle::deg(-90) {
        pos.z.get() & mask
    } else {
        (SECTOR_SIZE - pos.z).get() & mask
    }
}

/// Surface height of the bridge above `pos`.
fn surface(obj: &Object, pos: &Position) -> Length {
    let base = obj.position().y;
    match obj.kind {
        ObjectKind::Bridge(BridgeKind::Slope1) => base + Length(incline_offset(obj, pos) >> 2),
        ObjectKind::Bridge(BridgeKind::Slope2) => base + Length(incline_offset(obj, pos) >> 1),
        _ => base,
    }
}

pub fn bridge_floor(obj: &Object, pos: &Position, y: &mut Length) {
    let level = surface(obj, pos);
    if pos.y <= level {
        *y = level;
    }
}

pub fn bridge_ceiling(obj: &Object, pos: &Position, y: &mut Length) {
    let level = surface(obj, pos);
    if pos.y > level {
        *y = level + BRIDGE_THICKNESS;
    }
}

/// The trapdoor covers its own sector and the one ahead of its hinge.
fn on_trapdoor(obj: &Object, pos: &Position) -> bool {
    let sector = |v: Length| v.get().div_euclid(SECTOR_SIZE.get());
    let (ox, oz) = (sector(obj.position().x), sector(obj.position().z));
    let (px, pz) = (sector(pos.x), sector(pos.z));
    let (dx, dz) = match axis_from_angle(obj.state.rotation.y, Angle::deg(45)) {
        Some(Axis::Deg0) => (0, 1),
        Some(Axis::Right90) => (1, 0),
        Some(Axis::Deg180) => (0, -1),
        Some(Axis::Left90) => (-1, 0),
        None => (0, 0),
    };
    (px == ox && pz == oz) || (px == ox + dx && pz == oz + dz)
}

pub fn trapdoor_floor(obj: &Object, pos: &Position, y: &mut Length) {
    if obj.state.current_anim_state != TRAPDOOR_CLOSED || !on_trapdoor(obj, pos) {
        return;
    }
    if pos.y <= obj.position().y {
        *y = obj.position().y;
    }
}

pub fn trapdoor_ceiling(obj: &Object, pos: &Position, y: &mut Length) {
    if obj.state.current_anim_state != TRAPDOOR_CLOSED || !on_trapdoor(obj, pos) {
        return;
    }
    if pos.y > obj.position().y {
        *y = obj.position().y + BRIDGE_THICKNESS;
    }
}

pub fn trapdoor_update(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let s = &mut obj.state;
    if s.triggered() {
        if s.current_anim_state == TRAPDOOR_CLOSED {
            s.goal_anim_state = TRAPDOOR_OPEN;
        }
    } else if s.current_anim_state == TRAPDOOR_OPEN {
        s.goal_anim_state = TRAPDOOR_CLOSED;
    }
    super::animate(w, id);
}
