// mod.rs — Object manager: spawning, dispatch, per-frame updates, avatar collisions
//
// Objects are keyed by their level item index; dynamic objects (darts, the
// Thor hammer block) get ids past the level's item count. Per-kind behaviour
// lives in a static table of function pointers indexed by the kind's tag,
// so that a behaviour can take the whole world mutably while it runs.

pub mod agent;
pub mod block;
pub mod bridge;
pub mod door;
pub mod keyhole;
pub mod pickup;
pub mod switch;
pub mod thor_hammer;
pub mod traps;

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use trx_common::collision::{AxisColl, CollisionInfo};
use trx_common::height::{Geometry, HeightInfo, HeightPatch};
use trx_common::level::ItemSpawn;
use trx_common::location::Location;
use trx_common::room::Room;
use trx_common::units::*;

use crate::audio_engine::Emitter;
use crate::lara::state::LaraStateId;
use crate::object_state::{ObjectState, TriggerState};
use crate::particles::{Particle, ParticleKind};
use crate::skeleton::{AnimEvent, Skeleton};
use crate::world::World;

/// Level item type ids.
pub mod type_ids {
    pub const WOLF: u16 = 7;
    pub const RAT_ON_LAND: u16 = 16;
    pub const RAT_IN_WATER: u16 = 17;
    pub const FLYING_MUTANT: u16 = 20;
    pub const WALKING_MUTANT_1: u16 = 21;
    pub const WALKING_MUTANT_2: u16 = 22;
    pub const SWINGING_BLADE: u16 = 36;
    pub const DART: u16 = 39;
    pub const DART_GUN: u16 = 40;
    pub const SLAMMING_DOORS: u16 = 42;
    pub const SWORD_OF_DAMOCLES: u16 = 43;
    pub const THOR_HAMMER_HANDLE: u16 = 44;
    pub const THOR_HAMMER_BLOCK: u16 = 45;
    pub const BLOCK_1: u16 = 48;
    pub const BLOCK_4: u16 = 51;
    pub const TALL_BLOCK: u16 = 52;
    pub const SWITCH: u16 = 55;
    pub const UNDERWATER_SWITCH: u16 = 56;
    pub const DOOR_1: u16 = 57;
    pub const DOOR_8: u16 = 64;
    pub const TRAPDOOR_1: u16 = 65;
    pub const TRAPDOOR_2: u16 = 66;
    pub const BRIDGE_FLAT: u16 = 68;
    pub const BRIDGE_SLOPE_1: u16 = 69;
    pub const BRIDGE_SLOPE_2: u16 = 70;
    pub const PUZZLE_HOLE_1: u16 = 118;
    pub const PUZZLE_HOLE_4: u16 = 121;
    pub const KEYHOLE_1: u16 = 137;
    pub const KEYHOLE_4: u16 = 140;
    pub const SCION_PIECE_1: u16 = 143;
    pub const SCION_PIECE_3: u16 = 145;
}

/// Objects farther than this from the avatar are not tested for contact.
const COLLISION_RANGE: Length = Length(4096);
const ANIMATE_LARA_LIMIT: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeKind {
    Flat,
    Slope1,
    Slope2,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Pushable block; `target` is where a push or pull in progress ends.
    Block { tall: bool, target: Option<Position> },
    Bridge(BridgeKind),
    Trapdoor,
    Switch { underwater: bool },
    Door { blockers: Vec<door::DoorBlocker> },
    /// Takes inventory item `item`.
    Keyhole { item: u16 },
    PuzzleHole { item: u16 },
    Pickup,
    SwingingBlade,
    SlammingDoors,
    DartGun,
    Dart,
    SwordOfDamocles { rotate_speed: Angle, drop_x: Length, drop_z: Length },
    ThorHammerHandle { block: Option<u16> },
    ThorHammerBlock,
    ScionPiece,
    Agent(agent::AgentState),
    /// Animates while triggered and does nothing else.
    Animated,
}

// ============================================================
// Dispatch table
// ============================================================

pub type InitFn = fn(w: &mut World, id: u16);
pub type UpdateFn = fn(w: &mut World, id: u16);
pub type CollideFn = fn(w: &mut World, id: u16, coll: &mut CollisionInfo);
pub type ActivateFn = fn(w: &mut World, id: u16);
pub type PatchFn = fn(obj: &Object, pos: &Position, y: &mut Length);

pub struct Behaviour {
    pub init: Option<InitFn>,
    pub update: Option<UpdateFn>,
    pub collide: Option<CollideFn>,
    pub activate: ActivateFn,
    pub patch_floor: Option<PatchFn>,
    pub patch_ceiling: Option<PatchFn>,
}

pub const KIND_BLOCK: usize = 0;
pub const KIND_BRIDGE: usize = 1;
pub const KIND_TRAPDOOR: usize = 2;
pub const KIND_SWITCH: usize = 3;
pub const KIND_DOOR: usize = 4;
pub const KIND_KEYHOLE: usize = 5;
pub const KIND_PUZZLE_HOLE: usize = 6;
pub const KIND_PICKUP: usize = 7;
pub const KIND_SWINGING_BLADE: usize = 8;
pub const KIND_SLAMMING_DOORS: usize = 9;
pub const KIND_DART_GUN: usize = 10;
pub const KIND_DART: usize = 11;
pub const KIND_SWORD_OF_DAMOCLES: usize = 12;
pub const KIND_THOR_HAMMER_HANDLE: usize = 13;
pub const KIND_THOR_HAMMER_BLOCK: usize = 14;
pub const KIND_SCION_PIECE: usize = 15;
pub const KIND_AGENT: usize = 16;
pub const KIND_ANIMATED: usize = 17;
const KIND_COUNT: usize = 18;

const fn plain(update: Option<UpdateFn>, collide: Option<CollideFn>) -> Behaviour {
    Behaviour { init: None, update, collide, activate: activate_default, patch_floor: None, patch_ceiling: None }
}

static BEHAVIOURS: [Behaviour; KIND_COUNT] = [
    // KIND_BLOCK
    Behaviour { init: Some(block::init), ..plain(Some(block::update), Some(block::collide)) },
    // KIND_BRIDGE
    Behaviour {
        patch_floor: Some(bridge::bridge_floor),
        patch_ceiling: Some(bridge::bridge_ceiling),
        ..plain(None, None)
    },
    // KIND_TRAPDOOR
    Behaviour {
        patch_floor: Some(bridge::trapdoor_floor),
        patch_ceiling: Some(bridge::trapdoor_ceiling),
        ..plain(Some(bridge::trapdoor_update), None)
    },
    // KIND_SWITCH
    plain(Some(switch::update), Some(switch::collide)),
    // KIND_DOOR
    Behaviour { init: Some(door::init), ..plain(Some(door::update), Some(door::collide)) },
    // KIND_KEYHOLE
    plain(None, Some(keyhole::keyhole_collide)),
    // KIND_PUZZLE_HOLE
    plain(None, Some(keyhole::puzzle_hole_collide)),
    // KIND_PICKUP
    plain(None, Some(pickup::collide)),
    // KIND_SWINGING_BLADE
    plain(Some(traps::swinging_blade_update), Some(trap_collide)),
    // KIND_SLAMMING_DOORS
    plain(Some(traps::slamming_doors_update), Some(trap_collide)),
    // KIND_DART_GUN
    plain(Some(traps::dart_gun_update), None),
    // KIND_DART
    plain(Some(traps::dart_update), Some(trap_collide)),
    // KIND_SWORD_OF_DAMOCLES
    Behaviour {
        init: Some(traps::sword_init),
        ..plain(Some(traps::sword_update), Some(traps::sword_collide))
    },
    // KIND_THOR_HAMMER_HANDLE
    Behaviour {
        init: Some(thor_hammer::init),
        ..plain(Some(thor_hammer::handle_update), Some(thor_hammer::collide))
    },
    // KIND_THOR_HAMMER_BLOCK
    plain(None, Some(thor_hammer::collide)),
    // KIND_SCION_PIECE
    plain(None, Some(pickup::scion_collide)),
    // KIND_AGENT
    Behaviour { activate: agent::activate, ..plain(Some(agent::update), Some(agent::collide)) },
    // KIND_ANIMATED
    plain(Some(animated_update), None),
];

impl ObjectKind {
    pub fn tag(&self) -> usize {
        match self {
            ObjectKind::Block { .. } => KIND_BLOCK,
            ObjectKind::Bridge(_) => KIND_BRIDGE,
            ObjectKind::Trapdoor => KIND_TRAPDOOR,
            ObjectKind::Switch { .. } => KIND_SWITCH,
            ObjectKind::Door { .. } => KIND_DOOR,
            ObjectKind::Keyhole { .. } => KIND_KEYHOLE,
            ObjectKind::PuzzleHole { .. } => KIND_PUZZLE_HOLE,
            ObjectKind::Pickup => KIND_PICKUP,
            ObjectKind::SwingingBlade => KIND_SWINGING_BLADE,
            ObjectKind::SlammingDoors => KIND_SLAMMING_DOORS,
            ObjectKind::DartGun => KIND_DART_GUN,
            ObjectKind::Dart => KIND_DART,
            ObjectKind::SwordOfDamocles { .. } => KIND_SWORD_OF_DAMOCLES,
            ObjectKind::ThorHammerHandle { .. } => KIND_THOR_HAMMER_HANDLE,
            ObjectKind::ThorHammerBlock => KIND_THOR_HAMMER_BLOCK,
            ObjectKind::ScionPiece => KIND_SCION_PIECE,
            ObjectKind::Agent(_) => KIND_AGENT,
            ObjectKind::Animated => KIND_ANIMATED,
        }
    }

    pub fn behaviour(&self) -> &'static Behaviour {
        &BEHAVIOURS[self.tag()]
    }

    pub fn is_agent(&self) -> bool {
        matches!(self, ObjectKind::Agent(_))
    }
}

/// Object kind for a level item type, or None for types the engine does
/// not simulate.
pub fn kind_for_type(type_id: u16) -> Option<ObjectKind> {
    use type_ids::*;
    Some(match type_id {
        WOLF => ObjectKind::Agent(agent::AgentState::new(agent::AgentKind::Wolf)),
        RAT_ON_LAND | RAT_IN_WATER => ObjectKind::Agent(agent::AgentState::new(agent::AgentKind::Rat)),
        FLYING_MUTANT | WALKING_MUTANT_1 | WALKING_MUTANT_2 => {
            ObjectKind::Agent(agent::AgentState::new(agent::AgentKind::Mutant))
        }
        SWINGING_BLADE => ObjectKind::SwingingBlade,
        DART => ObjectKind::Dart,
        DART_GUN => ObjectKind::DartGun,
        SLAMMING_DOORS => ObjectKind::SlammingDoors,
        SWORD_OF_DAMOCLES => ObjectKind::SwordOfDamocles {
            rotate_speed: Angle::ZERO,
            drop_x: Length(0),
            drop_z: Length(0),
        },
        THOR_HAMMER_HANDLE => ObjectKind::ThorHammerHandle { block: None },
        THOR_HAMMER_BLOCK => ObjectKind::ThorHammerBlock,
        BLOCK_1..=BLOCK_4 => ObjectKind::Block { tall: false, target: None },
        TALL_BLOCK => ObjectKind::Block { tall: true, target: None },
        SWITCH => ObjectKind::Switch { underwater: false },
        UNDERWATER_SWITCH => ObjectKind::Switch { underwater: true },
        DOOR_1..=DOOR_8 => ObjectKind::Door { blockers: Vec::new() },
        TRAPDOOR_1 | TRAPDOOR_2 => ObjectKind::Trapdoor,
        BRIDGE_FLAT => ObjectKind::Bridge(BridgeKind::Flat),
        BRIDGE_SLOPE_1 => ObjectKind::Bridge(BridgeKind::Slope1),
        BRIDGE_SLOPE_2 => ObjectKind::Bridge(BridgeKind::Slope2),
        PUZZLE_HOLE_1..=PUZZLE_HOLE_4 => ObjectKind::PuzzleHole {
            item: crate::player::PUZZLE_1_ITEM + (type_id - PUZZLE_HOLE_1),
        },
        KEYHOLE_1..=KEYHOLE_4 => ObjectKind::Keyhole { item: crate::player::KEY_1_ITEM + (type_id - KEYHOLE_1) },
        SCION_PIECE_1..=SCION_PIECE_3 => ObjectKind::ScionPiece,
        t if pickup::is_pickup_type(t) => ObjectKind::Pickup,
        _ => return None,
    })
}

// ============================================================
// Objects
// ============================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub id: u16,
    pub kind: ObjectKind,
    pub state: ObjectState,
    /// Sprite objects have none.
    pub skeleton: Option<Skeleton>,
    /// Created at run time rather than listed in the level.
    pub dynamic: bool,
    pub collidable: bool,
}

impl Object {
    pub fn position(&self) -> Position {
        self.state.location.position
    }

    pub fn local_frame(&self, anims: &[trx_common::animation::Animation]) -> Frame {
        self.skeleton.as_ref().map_or(Frame(0), |s| s.local_frame(anims))
    }

    /// Collision box of the current pose in object space, or a default box
    /// one sector wide for sprites.
    pub fn bounding_box(&self, anims: &[trx_common::animation::Animation]) -> BoundingBox {
        let bbox = self.skeleton.as_ref().map(|s| s.bounding_box(anims)).unwrap_or_default();
        if bbox == BoundingBox::default() {
            BoundingBox::new(Position::new(-256, -256, -256), Position::new(256, 0, 256))
        } else {
            bbox
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectManager {
    pub objects: BTreeMap<u16, Object>,
    next_dynamic_id: u16,
    #[serde(skip)]
    pub particles: Vec<Particle>,
    #[serde(skip)]
    doomed: Vec<u16>,
}

impl ObjectManager {
    pub fn new(first_dynamic_id: u16) -> Self {
        Self { next_dynamic_id: first_dynamic_id, ..Default::default() }
    }

    pub fn get(&self, id: u16) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: u16) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Adds a run-time object and returns its id.
    pub fn add_dynamic(&mut self, kind: ObjectKind, state: ObjectState, skeleton: Option<Skeleton>) -> u16 {
        let id = self.next_dynamic_id;
        self.next_dynamic_id = self.next_dynamic_id.wrapping_add(1);
        self.objects.insert(id, Object { id, kind, state, skeleton, dynamic: true, collidable: true });
        id
    }

    /// Removes a dynamic object at the end of the frame; level objects are
    /// only switched off.
    pub fn kill(&mut self, id: u16) {
        let Some(obj) = self.objects.get_mut(&id) else {
            return;
        };
        obj.state.is_active = false;
        obj.state.trigger_state = TriggerState::Deactivated;
        obj.collidable = false;
        if let Some(sk) = obj.skeleton.as_mut() {
            sk.visible = false;
        }
        if obj.dynamic {
            self.doomed.push(id);
        }
    }

    fn reap(&mut self) {
        for id in self.doomed.drain(..) {
            self.objects.remove(&id);
        }
    }

    /// Ids of all objects of one kind.
    pub fn ids_of_kind(&self, tag: usize) -> Vec<u16> {
        self.objects.values().filter(|o| o.kind.tag() == tag).map(|o| o.id).collect()
    }
}

impl HeightPatch for ObjectManager {
    fn patch_floor(&self, object_id: u16, pos: &Position, y: &mut Length) {
        if let Some(obj) = self.objects.get(&object_id) {
            if let Some(patch) = obj.kind.behaviour().patch_floor {
                patch(obj, pos, y);
            }
        }
    }

    fn patch_ceiling(&self, object_id: u16, pos: &Position, y: &mut Length) {
        if let Some(obj) = self.objects.get(&object_id) {
            if let Some(patch) = obj.kind.behaviour().patch_ceiling {
                patch(obj, pos, y);
            }
        }
    }
}

// ============================================================
// Spawning
// ============================================================

/// Creates the object for level item `id`. Items of unknown type with an
/// animated model become plain animated objects; others are skipped.
pub fn spawn(w: &mut World, id: u16, item: &ItemSpawn) {
    let model = w.models.get(&item.type_id);
    let kind = match kind_for_type(item.type_id) {
        Some(k) => k,
        None if model.is_some() => ObjectKind::Animated,
        None => {
            log::debug!("item {} of type {} is not simulated", id, item.type_id);
            return;
        }
    };

    let location = Location::new(item.room, item.position);
    let mut state = ObjectState::new(item.type_id, location, Rotation::yaw(item.rotation));
    state.shade = item.intensity;
    state.activation_state.activation_set = item.activation_set;

    let skeleton = model.map(|m| {
        let mut sk = Skeleton::new(m, &w.animations);
        sk.set_animation(&mut state, &w.animations, m.animation_index, None);
        sk
    });
    state.goal_anim_state = state.current_anim_state;

    if item.invisible || kind.is_agent() {
        state.trigger_state = TriggerState::Invisible;
    }
    if state.activation_state.is_fully_activated() {
        state.trigger_state = TriggerState::Active;
        state.is_active = true;
    }

    let init = kind.behaviour().init;
    let mut obj = Object { id, kind, state, skeleton, dynamic: false, collidable: true };
    if obj.state.trigger_state == TriggerState::Invisible {
        if let Some(sk) = obj.skeleton.as_mut() {
            sk.visible = false;
        }
    }
    w.objects.objects.insert(id, obj);
    if let Some(init) = init {
        init(w, id);
    }
}

// ============================================================
// Activation
// ============================================================

fn activate_default(w: &mut World, id: u16) {
    if let Some(obj) = w.objects.get_mut(id) {
        obj.state.is_active = true;
        if let Some(sk) = obj.skeleton.as_mut() {
            sk.visible = true;
        }
    }
}

/// Puts a fully triggered object on the update list.
pub fn activate(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    (obj.kind.behaviour().activate)(w, id);
}

// ============================================================
// Frame update
// ============================================================

/// Runs the update of every active object, then drops the dynamic objects
/// killed on the way.
pub fn update_objects(w: &mut World) {
    let ids: Vec<u16> = w.objects.objects.values().filter(|o| o.state.is_active).map(|o| o.id).collect();
    for id in ids {
        let Some(update) = w.objects.get(id).and_then(|o| o.kind.behaviour().update) else {
            continue;
        };
        update(w, id);
    }
    w.objects.reap();
}

/// Tests every object near the avatar for contact.
pub fn collide_with_lara(w: &mut World, coll: &mut CollisionInfo) {
    let lara = w.lara.position();
    let ids: Vec<u16> = w
        .objects
        .objects
        .values()
        .filter(|o| o.collidable && o.state.trigger_state != TriggerState::Invisible)
        .filter(|o| {
            let d = o.position() - lara;
            d.x.abs() < COLLISION_RANGE && d.y.abs() < COLLISION_RANGE && d.z.abs() < COLLISION_RANGE
        })
        .map(|o| o.id)
        .collect();
    for id in ids {
        let Some(collide) = w.objects.get(id).and_then(|o| o.kind.behaviour().collide) else {
            continue;
        };
        collide(w, id, coll);
    }
}

fn animated_update(w: &mut World, id: u16) {
    animate(w, id);
}

/// Steps the object's animation on physics frames and integrates its
/// speed and gravity.
pub fn animate(w: &mut World, id: u16) {
    if !w.is_physics_frame() {
        return;
    }
    let Some(obj) = w.objects.objects.get_mut(&id) else {
        return;
    };
    let Some(skeleton) = obj.skeleton.as_mut() else {
        return;
    };
    let events = skeleton.process_frame(&mut obj.state, &w.animations, Speed(0));
    let local = skeleton.local_frame(&w.animations);
    let anim_speed = skeleton.animation(&w.animations).map(|a| a.speed_at(local));

    let s = &mut obj.state;
    if s.falling {
        s.fallspeed += if s.fallspeed < FAST_FALL_SPEED { GRAVITY } else { Speed(1) };
        s.location.position.y += s.fallspeed.per_frame();
    } else if let Some(speed) = anim_speed {
        s.speed = speed;
    }
    let d = pitch(s.speed.per_frame(), s.rotation.y);
    s.location.move_by(d);
    s.location.update_room(&w.rooms);

    for ev in events {
        match ev {
            AnimEvent::PlaySound(sound) => play_sound(w, id, sound),
            AnimEvent::PlayEffect(effect) => crate::effects::run_effect(w, effect, crate::effects::EffectTarget::Object(id)),
            AnimEvent::EmptyHands => {}
            AnimEvent::Kill => {
                if let Some(obj) = w.objects.get_mut(id) {
                    log::trace!("object {} deactivated by its animation", id);
                    obj.state.trigger_state = TriggerState::Deactivated;
                    obj.state.is_active = false;
                }
            }
        }
    }
}

pub fn play_sound(w: &mut World, id: u16, sound: u16) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    let emitter = Emitter { owner: id, position: obj.position() };
    w.audio.play_sound_effect(&mut w.rng, sound, Some(emitter));
}

// ============================================================
// Heights and rooms
// ============================================================

/// Floor under `loc` with object patches applied.
pub fn floor_at(w: &World, loc: &Location) -> Length {
    let mut l = *loc;
    let geo = Geometry { rooms: &w.rooms, floor_data: &w.floor_data };
    let sector = l.update_room(&w.rooms);
    HeightInfo::from_floor(&geo, sector, &loc.position, &w.objects).y
}

/// Ceiling above `loc` with object patches applied.
pub fn ceiling_at(w: &World, loc: &Location) -> Length {
    let mut l = *loc;
    let geo = Geometry { rooms: &w.rooms, floor_data: &w.floor_data };
    let sector = l.update_room(&w.rooms);
    HeightInfo::from_ceiling(&geo, sector, &loc.position, &w.objects).y
}

/// Raises (positive) or lowers (negative) the nominal floor of the sector
/// under `loc`.
pub fn alter_floor_height(rooms: &mut [Room], loc: &Location, dy: Length) {
    let mut l = *loc;
    l.update_room(rooms);
    let Some(sector) = rooms.get_mut(l.room).and_then(|r| r.get_sector_by_absolute_position_mut(&loc.position)) else {
        log::warn!("no sector to patch at {}", loc.position);
        return;
    };
    sector.floor_height += dy;
}

/// Runs the command sequence of the sector under the object as a heavy
/// trigger.
pub fn heavy_trigger(w: &mut World, id: u16) {
    let Some(loc) = w.objects.get(id).map(|o| o.state.location) else {
        return;
    };
    let idx = {
        let mut l = loc;
        let geo = Geometry { rooms: &w.rooms, floor_data: &w.floor_data };
        let sector = l.update_room(&w.rooms);
        HeightInfo::from_floor(&geo, sector, &loc.position, &w.objects).last_command_sequence_or_death
    };
    if let Err(e) = crate::triggers::handle_command_sequence(w, idx, true) {
        w.fail(e);
    }
}

// ============================================================
// Avatar interaction
// ============================================================

/// Where the avatar has to stand, relative to an object, to use it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InteractionLimits {
    pub bbox: BoundingBox,
    pub max_rotation: Rotation,
}

impl InteractionLimits {
    pub const fn new(min: Position, max: Position, max_rotation: Rotation) -> Self {
        Self { bbox: BoundingBox::new(min, max), max_rotation }
    }

    pub fn can_interact(&self, lara: &ObjectState, obj: &ObjectState) -> bool {
        let dx = (lara.rotation.x - obj.rotation.x).abs();
        let dy = (lara.rotation.y - obj.rotation.y).abs();
        let dz = (lara.rotation.z - obj.rotation.z).abs();
        if dx > self.max_rotation.x || dy > self.max_rotation.y || dz > self.max_rotation.z {
            return false;
        }
        let d = lara.location.position - obj.location.position;
        self.bbox.contains(&rotate_y(&d, -obj.rotation.y))
    }
}

/// Avatar standing still with free hands and the action button held.
pub fn lara_ready_to_interact(w: &World, needed: LaraStateId) -> bool {
    w.has_action(trx_common::input::Action::Action)
        && w.lara.hand_status == crate::lara::HandStatus::None
        && !w.lara.state.falling
        && w.lara.current_state() == needed
}

/// Plays the avatar's animation until it reaches state `goal`.
pub fn animate_lara_until(w: &mut World, goal: LaraStateId) {
    w.lara.set_goal(goal);
    for _ in 0..ANIMATE_LARA_LIMIT {
        crate::lara::update_impl(w);
        if w.lara.current_state() == goal {
            return;
        }
    }
    log::warn!("avatar never reached state {:?}", goal);
}

/// Avatar's body overlaps the object's box grown by `radius`.
pub fn lara_touches(w: &World, id: u16, radius: Length) -> bool {
    let Some(obj) = w.objects.get(id) else {
        return false;
    };
    let bbox = obj.bounding_box(&w.animations);
    let d = rotate_y(&(w.lara.position() - obj.position()), -obj.state.rotation.y);
    let top = d.y - LARA_WALK_HEIGHT;
    d.x >= bbox.min.x - radius
        && d.x <= bbox.max.x + radius
        && d.z >= bbox.min.z - radius
        && d.z <= bbox.max.z + radius
        && d.y >= bbox.min.y
        && top <= bbox.max.y
}

/// Moves the avatar out of `bbox` (object space) along the shortest way,
/// then backs off again if that put it into a wall.
pub fn push_lara(w: &mut World, id: u16, bbox: &BoundingBox, coll: &mut CollisionInfo) -> bool {
    let Some(obj) = w.objects.get(id) else {
        return false;
    };
    let (origin, yaw) = (obj.position(), obj.state.rotation.y);
    let r = coll.collision_radius;
    let d = rotate_y(&(w.lara.position() - origin), -yaw);
    let (min_x, max_x) = (bbox.min.x - r, bbox.max.x + r);
    let (min_z, max_z) = (bbox.min.z - r, bbox.max.z + r);
    let top = d.y - LARA_WALK_HEIGHT;
    if d.x < min_x || d.x > max_x || d.z < min_z || d.z > max_z || d.y < bbox.min.y || top > bbox.max.y {
        return false;
    }

    let left = d.x - min_x;
    let right = max_x - d.x;
    let back = d.z - min_z;
    let front = max_z - d.z;
    let mut local = d;
    if left <= right && left <= front && left <= back {
        local.x -= left;
    } else if right <= left && right <= front && right <= back {
        local.x += right;
    } else if front <= left && front <= right && front <= back {
        local.z += front;
    } else {
        local.z -= back;
    }
    let pushed = origin + rotate_y(&local, yaw);
    let y = w.lara.position().y;
    w.lara.state.location.position = Position { y, ..pushed };

    let loc = w.lara.state.location;
    let mut probe = CollisionInfo {
        collision_radius: coll.collision_radius,
        facing_angle: angle_from_atan(pushed.x - coll.initial_position.x, pushed.z - coll.initial_position.z),
        initial_position: coll.initial_position,
        ..Default::default()
    };
    w.collision_probe(&mut probe, &loc, LARA_WALK_HEIGHT);
    if probe.collision_type != AxisColl::None {
        let p = &mut w.lara.state.location.position;
        p.x = coll.initial_position.x;
        p.z = coll.initial_position.z;
    } else {
        w.lara.state.location.update_room(&w.rooms);
    }
    true
}

/// Takes `damage` off the avatar and splashes blood where it was hit.
pub fn hurt_lara(w: &mut World, damage: Health) {
    w.lara.state.is_hit = true;
    if !w.god_mode() {
        w.lara.state.health -= damage;
    }
    let p = w.lara.position();
    let at = Position {
        x: p.x + Length(w.rng.gen_range(-128..128)),
        y: p.y - Length(w.rng.gen_range(0..745)),
        z: p.z + Length(w.rng.gen_range(-128..128)),
    };
    let blood = Particle::new(ParticleKind::Blood, Location::new(w.lara.state.location.room, at));
    w.objects.particles.push(blood);
}

/// Traps record touching bones while active and block the avatar otherwise.
pub fn trap_collide(w: &mut World, id: u16, coll: &mut CollisionInfo) {
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    if obj.state.trigger_state == TriggerState::Active {
        let touching = lara_touches(w, id, coll.collision_radius);
        if let Some(obj) = w.objects.get_mut(id) {
            obj.state.touch_bits = if touching { u32::MAX } else { 0 };
        }
        return;
    }
    let bbox = obj.bounding_box(&w.animations);
    push_lara(w, id, &bbox, coll);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlevel::TestWorld;

    #[test]
    fn test_kind_for_type() {
        assert_eq!(kind_for_type(type_ids::TALL_BLOCK), Some(ObjectKind::Block { tall: true, target: None }));
        assert_eq!(
            kind_for_type(type_ids::KEYHOLE_1 + 2),
            Some(ObjectKind::Keyhole { item: crate::player::KEY_1_ITEM + 2 })
        );
        assert_eq!(kind_for_type(crate::player::SMALL_MEDIPACK_ITEM), Some(ObjectKind::Pickup));
        assert!(kind_for_type(1000).is_none());
    }

    #[test]
    fn test_interaction_limits_follow_object_yaw() {
        let limits = InteractionLimits::new(
            Position::new(-200, 0, 312),
            Position::new(200, 0, 512),
            Rotation { x: Angle::deg(10), y: Angle::deg(30), z: Angle::deg(10) },
        );
        let obj = ObjectState::new(0, Location::new(0, Position::new(0, 0, 0)), Rotation::yaw(Angle::deg(90)));
        let mut lara = ObjectState::new(0, Location::new(0, Position::new(400, 0, 0)), Rotation::yaw(Angle::deg(90)));
        assert!(limits.can_interact(&lara, &obj));
        lara.rotation.y = Angle::deg(0);
        assert!(!limits.can_interact(&lara, &obj));
        lara.rotation.y = Angle::deg(90);
        lara.location.position = Position::new(0, 0, 400);
        assert!(!limits.can_interact(&lara, &obj));
    }

    #[test]
    fn test_dynamic_objects_are_removed_when_killed() {
        let mut t = TestWorld::new();
        let state = ObjectState::new(type_ids::DART, t.world.lara.state.location, Rotation::default());
        let id = t.world.objects.add_dynamic(ObjectKind::Dart, state, None);
        assert!(t.world.objects.get(id).is_some());
        t.world.objects.kill(id);
        update_objects(&mut t.world);
        assert!(t.world.objects.get(id).is_none());
    }

    #[test]
    fn test_hurt_lara_spills_blood() {
        let mut t = TestWorld::new();
        hurt_lara(&mut t.world, Health(100));
        assert_eq!(t.world.lara.state.health, LARA_HEALTH - Health(100));
        assert!(t.world.lara.state.is_hit);
        assert_eq!(t.world.objects.particles.len(), 1);
    }
}
