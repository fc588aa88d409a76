// mod.rs — The avatar: amphibious regimes, per-frame update, floor tracking
//
// One call to `update` is one render frame. Input handlers and the slow
// rates (yaw speed, roll decay, air) run every render frame; animation,
// gravity, movement and the collision response only run on physics frames.

pub mod anim_ids;
pub mod handlers;
pub mod state;

use serde::{Deserialize, Serialize};
use trx_common::animation::{Animation, SkeletalModel};
use trx_common::collision::{CollisionInfo, CollisionPolicies};
use trx_common::height::{Geometry, HeightInfo};
use trx_common::location::Location;
use trx_common::units::*;

use crate::audio_engine::{sfx, Emitter};
use crate::object_state::ObjectState;
use crate::particles::{Particle, ParticleKind};
use crate::skeleton::{AnimEvent, Skeleton};
use crate::world::World;

use self::state::LaraStateId;

/// Render frames the jump button has to be held on the surface to dive.
pub const DIVE_KEYPRESS_TIME: RenderFrame = Frame(10).to_render();
const AIR_RECOVERY: RenderFrame = RenderFrame(RENDER_FRAME_RATE / 3);
const DROWNING_DAMAGE: Health = Health(5);
const SPLASH_COUNT: usize = 10;
const FLAME_COUNT: usize = 10;
const WATER_ENTRY_DEPTH: Length = Length(100);
const SURFACE_CATCH_DISTANCE: Length = QUARTER_SECTOR_SIZE;
const MAX_DIVE_PITCH: Angle = Angle::deg(100);
const MAX_DIVE_ROLL: Angle = Angle::deg(22);
const TORSO_BONE: usize = 7;
const HEAD_BONE: usize = 14;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnderwaterState {
    #[default]
    OnLand,
    Swimming,
    Diving,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandStatus {
    #[default]
    None,
    Grabbing,
    Combat,
}

/// Where an underwater current pulls the avatar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnderwaterRoute {
    pub target: Position,
    pub box_index: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaraObject {
    pub id: u16,
    pub state: ObjectState,
    pub skeleton: Skeleton,
    pub underwater_state: UnderwaterState,
    pub hand_status: HandStatus,
    /// Turn rate per animation frame; applied halved every render frame.
    pub y_rotation_speed: Angle,
    pub movement_angle: Angle,
    /// Replaces the fall speed of the next `StartFalling` command.
    pub fall_speed_override: Speed,
    pub air: RenderFrame,
    pub current_slide_angle: Angle,
    pub swim_to_dive_keypress_duration: RenderFrame,
    pub head_rotation: Rotation,
    pub torso_rotation: Rotation,
    pub underwater_current_strength: Length,
    pub underwater_route: Option<UnderwaterRoute>,
    /// Floor-data index of the command sequence under the avatar.
    pub floor_trigger: Option<usize>,
}

impl LaraObject {
    pub fn new(id: u16, location: Location, yaw: Angle, model: &SkeletalModel, anims: &[Animation]) -> Self {
        let mut state = ObjectState::new(model.type_id, location, Rotation::yaw(yaw));
        state.health = LARA_HEALTH;
        state.is_active = true;
        let mut skeleton = Skeleton::new(model, anims);
        skeleton.set_animation(&mut state, anims, model.animation_index, None);
        state.goal_anim_state = state.current_anim_state;
        Self {
            id,
            state,
            skeleton,
            underwater_state: UnderwaterState::OnLand,
            hand_status: HandStatus::None,
            y_rotation_speed: Angle::ZERO,
            movement_angle: yaw,
            fall_speed_override: Speed(0),
            air: LARA_AIR,
            current_slide_angle: Angle::ZERO,
            swim_to_dive_keypress_duration: RenderFrame(0),
            head_rotation: Rotation::default(),
            torso_rotation: Rotation::default(),
            underwater_current_strength: Length(0),
            underwater_route: None,
            floor_trigger: None,
        }
    }

    pub fn current_state(&self) -> LaraStateId {
        LaraStateId::from_u16(self.state.current_anim_state).unwrap_or(LaraStateId::Stop)
    }

    pub fn goal_state(&self) -> LaraStateId {
        LaraStateId::from_u16(self.state.goal_anim_state).unwrap_or(LaraStateId::Stop)
    }

    pub fn set_goal(&mut self, s: LaraStateId) {
        self.state.goal_anim_state = s.id();
    }

    pub fn set_current(&mut self, s: LaraStateId) {
        self.state.current_anim_state = s.id();
    }

    pub fn set_animation(&mut self, anims: &[Animation], anim: usize, frame: Option<Frame>) {
        self.skeleton.set_animation(&mut self.state, anims, anim, frame);
    }

    pub fn local_frame(&self, anims: &[Animation]) -> Frame {
        self.skeleton.local_frame(anims)
    }

    pub fn is_dead(&self) -> bool {
        self.state.health <= Health(0)
    }

    pub fn position(&self) -> Position {
        self.state.location.position
    }

    pub fn yaw(&self) -> Angle {
        self.state.rotation.y
    }

    /// Accelerates the turn rate, capped at `limit`.
    pub fn add_y_rotation_speed(&mut self, v: Angle, limit: Angle) {
        self.y_rotation_speed = (self.y_rotation_speed + v.to_render_unit()).min(limit);
    }

    /// Decelerates the turn rate, floored at `limit`.
    pub fn sub_y_rotation_speed(&mut self, v: Angle, limit: Angle) {
        self.y_rotation_speed = (self.y_rotation_speed - v.to_render_unit()).max(limit);
    }

    pub fn apply_shift(&mut self, coll: &CollisionInfo) {
        self.state.location.position += coll.shift;
    }

    pub fn place_on_floor(&mut self, coll: &CollisionInfo) {
        self.state.location.position.y += coll.mid.floor.y;
    }

    pub fn emitter(&self) -> Emitter {
        Emitter { owner: self.id, position: self.position() }
    }
}

// ============================================================
// Frame update
// ============================================================

pub fn update(w: &mut World) {
    let in_water = w.cheat_dive() || w.rooms.get(w.lara.state.location.room).is_some_and(|r| r.is_water_room);
    match (w.lara.underwater_state, in_water) {
        (UnderwaterState::OnLand, true) => enter_water(w),
        (UnderwaterState::Diving, false) => leave_water_from_diving(w),
        (UnderwaterState::Swimming, false) => {
            log::debug!("avatar left the water surface");
            w.lara.underwater_state = UnderwaterState::OnLand;
            w.lara.set_animation(&w.animations, anim_ids::FREE_FALL_FORWARD, None);
            w.lara.set_goal(LaraStateId::JumpForward);
            w.lara.set_current(LaraStateId::JumpForward);
            w.lara.state.speed = w.lara.state.fallspeed / 4;
            w.lara.state.falling = true;
            w.lara.state.fallspeed = Speed(0);
            w.lara.state.rotation.x = Angle::ZERO;
            w.lara.state.rotation.z = Angle::ZERO;
        }
        _ => {}
    }

    update_air(w);

    let mut coll = CollisionInfo::default();
    match w.lara.underwater_state {
        UnderwaterState::OnLand => update_on_land(w, &mut coll),
        UnderwaterState::Diving => update_diving(w, &mut coll),
        UnderwaterState::Swimming => update_swimming(w, &mut coll),
    }

    let (id, pos) = (w.lara.id, w.lara.position());
    w.audio.update_emitter(id, pos);
}

fn enter_water(w: &mut World) {
    log::debug!("avatar entered water in room {}", w.lara.state.location.room);
    w.lara.air = LARA_AIR;
    w.lara.underwater_state = UnderwaterState::Diving;
    w.lara.state.falling = false;
    w.lara.state.location.position.y += WATER_ENTRY_DEPTH;
    w.audio.stop_sound_effect(sfx::LARA_SCREAM, Some(w.lara.id));

    match w.lara.current_state() {
        LaraStateId::SwandiveBegin => {
            w.lara.state.rotation.x = Angle::deg(-45);
            w.lara.set_goal(LaraStateId::UnderwaterDiving);
            update_impl(w);
            w.lara.state.fallspeed *= 2;
        }
        LaraStateId::SwandiveEnd => {
            w.lara.state.rotation.x = Angle::deg(-85);
            w.lara.set_goal(LaraStateId::UnderwaterDiving);
            update_impl(w);
            w.lara.state.fallspeed *= 2;
        }
        _ => {
            w.lara.state.rotation.x = Angle::deg(-45);
            w.lara.set_animation(&w.animations, anim_ids::FREE_FALL_TO_UNDERWATER, None);
            w.lara.set_goal(LaraStateId::UnderwaterForward);
            w.lara.set_current(LaraStateId::UnderwaterDiving);
            w.lara.state.fallspeed = w.lara.state.fallspeed * 3 / 2;
        }
    }

    if let Some(surface) = water_surface_height(w) {
        w.play_lara_sound(sfx::LARA_FALL_INTO_WATER);
        let pos = w.lara.position();
        let at = Location::new(w.lara.state.location.room, Position { y: surface, ..pos });
        for _ in 0..SPLASH_COUNT {
            let p = Particle::splash(at, &mut w.rng);
            w.objects.particles.push(p);
        }
    }
}

fn leave_water_from_diving(w: &mut World) {
    let surface = water_surface_height(w);
    w.lara.state.rotation.x = Angle::ZERO;
    w.lara.state.rotation.z = Angle::ZERO;
    w.lara.hand_status = HandStatus::None;

    match surface {
        Some(s) if (s - w.lara.position().y).abs() < SURFACE_CATCH_DISTANCE => {
            log::debug!("avatar surfaced at {}", s);
            w.lara.underwater_state = UnderwaterState::Swimming;
            w.lara.state.fallspeed = Speed(0);
            w.lara.set_animation(&w.animations, anim_ids::UNDERWATER_TO_ONWATER, None);
            w.lara.set_goal(LaraStateId::OnWaterStop);
            w.lara.set_current(LaraStateId::OnWaterStop);
            w.lara.state.location.position.y = s + Length(1);
            w.lara.swim_to_dive_keypress_duration = DIVE_KEYPRESS_TIME + RenderFrame(1);
            update_floor_height(w, Length(-381));
            w.play_lara_sound(sfx::LARA_CATCHING_AIR);
        }
        _ => {
            log::debug!("avatar dropped out of the water");
            w.lara.underwater_state = UnderwaterState::OnLand;
            w.lara.set_animation(&w.animations, anim_ids::FREE_FALL_FORWARD, None);
            w.lara.set_goal(LaraStateId::JumpForward);
            w.lara.set_current(LaraStateId::JumpForward);
            w.lara.state.speed = w.lara.state.fallspeed / 4;
            w.lara.state.falling = true;
            w.lara.state.fallspeed = Speed(0);
        }
    }
}

fn update_air(w: &mut World) {
    match w.lara.underwater_state {
        UnderwaterState::OnLand => w.lara.air = LARA_AIR,
        UnderwaterState::Diving => {
            if w.lara.is_dead() || w.cheat_dive() {
                return;
            }
            w.lara.air -= RenderFrame(1);
            if w.lara.air < RenderFrame(0) {
                w.lara.air = RenderFrame(-1);
                if !w.god_mode() {
                    w.lara.state.health -= DROWNING_DAMAGE;
                }
            }
        }
        UnderwaterState::Swimming => {
            w.lara.air = (w.lara.air + AIR_RECOVERY).min(LARA_AIR);
        }
    }
}

fn decay_towards_zero(a: Angle, step: Angle) -> Angle {
    if a < -step {
        a + step
    } else if a > step {
        a - step
    } else {
        Angle::ZERO
    }
}

fn update_on_land(w: &mut World, coll: &mut CollisionInfo) {
    coll.initial_position = w.lara.position();
    coll.collision_radius = DEFAULT_COLLISION_RADIUS;
    coll.policies = CollisionPolicies::SPAZ_PUSH;

    handlers::handle_input(w, coll);

    if !w.input_state.free_look {
        w.lara.head_rotation.x -= w.lara.head_rotation.x / 8;
        w.lara.head_rotation.y -= w.lara.head_rotation.y / 8;
        w.lara.torso_rotation = w.lara.head_rotation;
    }

    w.lara.state.rotation.z = decay_towards_zero(w.lara.state.rotation.z, Angle::deg(1).to_render_unit());
    w.lara.y_rotation_speed = decay_towards_zero(w.lara.y_rotation_speed, TURN_SPEED_DECELERATION.to_render_unit());
    w.lara.state.rotation.y += w.lara.y_rotation_speed.to_render_unit();

    if !w.is_physics_frame() {
        return;
    }

    update_impl(w);
    test_interactions(w, coll);
    handlers::postprocess(w, coll);
    update_floor_height(w, -LARA_WALK_HEIGHT / 2);
}

fn update_diving(w: &mut World, coll: &mut CollisionInfo) {
    coll.initial_position = w.lara.position();
    coll.collision_radius = DEFAULT_COLLISION_RADIUS_UNDERWATER;
    coll.policies = CollisionPolicies::empty();
    coll.valid_ceiling_height_min = LARA_DIVE_HEIGHT;
    coll.valid_floor_height = (-LARA_DIVE_HEIGHT, HEIGHT_LIMIT);

    handlers::handle_input(w, coll);

    w.lara.state.rotation.z = decay_towards_zero(w.lara.state.rotation.z, Angle::deg(2).to_render_unit());
    w.lara.state.rotation.x = w.lara.state.rotation.x.clamp(-MAX_DIVE_PITCH, MAX_DIVE_PITCH);
    w.lara.state.rotation.z = w.lara.state.rotation.z.clamp(-MAX_DIVE_ROLL, MAX_DIVE_ROLL);

    if !w.is_physics_frame() {
        return;
    }

    if w.lara.underwater_current_strength != Length(0) {
        handle_underwater_current(w, coll);
    }
    update_impl(w);
    let d = yaw_pitch(w.lara.state.fallspeed.per_frame() / 4, &w.lara.state.rotation);
    w.lara.state.location.move_by(d);
    test_interactions(w, coll);
    handlers::postprocess(w, coll);
    update_floor_height(w, Length(0));
}

fn update_swimming(w: &mut World, coll: &mut CollisionInfo) {
    coll.initial_position = w.lara.position();
    coll.collision_radius = DEFAULT_COLLISION_RADIUS;
    coll.policies = CollisionPolicies::empty();
    coll.valid_ceiling_height_min = Length(100);
    coll.valid_floor_height = (Length(-100), HEIGHT_LIMIT);

    w.camera.set_rotation_around_lara_x(Angle::deg(-22));
    handlers::handle_input(w, coll);

    w.lara.state.rotation.z = decay_towards_zero(w.lara.state.rotation.z, Angle::deg(2).to_render_unit());
    w.lara.state.rotation.y += w.lara.y_rotation_speed.to_render_unit();

    if !w.is_physics_frame() {
        return;
    }

    if w.lara.underwater_current_strength != Length(0) {
        handle_underwater_current(w, coll);
    }
    update_impl(w);
    let d = pitch(w.lara.state.fallspeed.per_frame() / 4, w.lara.movement_angle);
    w.lara.state.location.move_by(d);
    test_interactions(w, coll);
    handlers::postprocess(w, coll);
    update_floor_height(w, Length(100));
}

/// Advances the avatar's animation by one frame, carries out the animation
/// events and integrates speed and gravity.
pub fn update_impl(w: &mut World) {
    let events = w.lara.skeleton.process_frame(&mut w.lara.state, &w.animations, w.lara.fall_speed_override);
    if w.lara.state.falling {
        w.lara.fall_speed_override = Speed(0);
    }

    for ev in events {
        match ev {
            AnimEvent::PlaySound(id) => w.play_lara_sound(id),
            AnimEvent::PlayEffect(effect) => crate::effects::run_effect(w, effect, crate::effects::EffectTarget::Lara),
            AnimEvent::EmptyHands => w.lara.hand_status = HandStatus::None,
            AnimEvent::Kill => {}
        }
    }

    let local = w.lara.local_frame(&w.animations);
    let anim_speed = w.lara.skeleton.animation(&w.animations).map(|a| a.speed_at(local));
    let s = &mut w.lara.state;
    if s.falling {
        s.fallspeed += if s.fallspeed < FAST_FALL_SPEED { GRAVITY } else { Speed(1) };
        s.location.position.y += s.fallspeed.per_frame();
    } else if let Some(speed) = anim_speed {
        s.speed = speed;
    }

    if w.lara.underwater_state == UnderwaterState::OnLand {
        let d = pitch(w.lara.state.speed.per_frame(), w.lara.movement_angle);
        w.lara.state.location.move_by(d);
    }
}

/// Re-resolves the avatar's room from a point `dy` above or below its
/// origin and caches the floor and trigger underneath.
pub fn update_floor_height(w: &mut World, dy: Length) {
    let pos = w.lara.position();
    let mut loc = Location::new(w.lara.state.location.room, Position { y: pos.y + dy, ..pos });
    let geo = Geometry { rooms: &w.rooms, floor_data: &w.floor_data };
    let sector = loc.update_room(&w.rooms);
    let hi = HeightInfo::from_floor(&geo, sector, &pos, &w.objects);
    w.lara.state.location.room = loc.room;
    w.lara.state.floor = hi.y;
    w.lara.floor_trigger = hi.last_command_sequence_or_death;
}

/// Y of the water surface above or around the avatar, if any.
pub fn water_surface_height(w: &World) -> Option<Length> {
    let pos = w.lara.position();
    let mut loc = w.lara.state.location;
    let mut sector = loc.update_room(&w.rooms);
    let in_water = |room: usize| w.rooms.get(room).is_some_and(|r| r.is_water_room);

    if in_water(loc.room) {
        while let Some(above) = sector.room_above {
            if !in_water(above) {
                return Some(sector.ceiling_height);
            }
            sector = w.rooms[above].get_sector_by_absolute_position(&pos)?;
        }
        return Some(sector.ceiling_height);
    }

    while let Some(below) = sector.room_below {
        if in_water(below) {
            return Some(sector.floor_height);
        }
        sector = w.rooms[below].get_sector_by_absolute_position(&pos)?;
    }
    None
}

/// Kills the avatar by fire when it stands on the floor.
pub fn burn_if_alive(w: &mut World) {
    if w.lara.is_dead() || w.god_mode() {
        return;
    }
    let pos = w.lara.position();
    let mut loc = w.lara.state.location;
    let geo = Geometry { rooms: &w.rooms, floor_data: &w.floor_data };
    let sector = loc.update_room(&w.rooms);
    let floor = HeightInfo::from_floor(&geo, sector, &pos, &w.objects).y;
    if floor != w.lara.state.floor {
        return;
    }
    log::debug!("avatar burnt at {}", pos);
    w.lara.state.health = DEAD_HEALTH;
    w.lara.state.is_hit = true;
    for _ in 0..FLAME_COUNT {
        let p = Particle::new(ParticleKind::Sparkle, w.lara.state.location);
        w.objects.particles.push(p);
    }
}

fn test_interactions(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.state.is_hit = false;
    if w.lara.is_dead() {
        return;
    }
    crate::objects::collide_with_lara(w, coll);
}

/// Drifts the avatar toward the current's sink and reacts to what it bumps
/// into on the way.
fn handle_underwater_current(w: &mut World, coll: &mut CollisionInfo) {
    let Some(route) = w.lara.underwater_route else {
        w.lara.underwater_current_strength = Length(0);
        return;
    };
    let strength = w.lara.underwater_current_strength;
    let pos = w.lara.position();
    let mut d = route.target - pos;
    d.x = d.x.clamp(-strength, strength).to_render_unit();
    d.y = d.y.clamp(-strength, strength).to_render_unit();
    d.z = d.z.clamp(-strength, strength).to_render_unit();
    w.lara.state.location.move_by(d);
    w.lara.underwater_current_strength = Length(0);

    coll.facing_angle = angle_from_atan(d.x, d.z);
    let probe = w.lara.state.location.moved(Position::new(0, LARA_DIVE_GROUND_ELEVATION.get(), 0));
    w.collision_probe(coll, &probe, LARA_DIVE_HEIGHT);
    handlers::underwater::react_to_collision(w, coll);
    coll.initial_position = w.lara.position();
}

/// Applies the head and torso offsets and recomputes the bone matrices.
pub fn update_pose(w: &mut World) {
    let Some(model) = w.models.get(&w.lara.state.type_id) else {
        return;
    };
    let extra = [(TORSO_BONE, w.lara.torso_rotation), (HEAD_BONE, w.lara.head_rotation)];
    w.lara.skeleton.update_pose(&w.animations, model, &extra);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlevel::{self, TestWorld};

    #[test]
    fn test_air_drains_and_drowns() {
        let mut t = TestWorld::new();
        t.world.lara.underwater_state = UnderwaterState::Diving;
        t.world.lara.air = RenderFrame(1);
        update_air(&mut t.world);
        assert_eq!(t.world.lara.air, RenderFrame(0));
        update_air(&mut t.world);
        assert_eq!(t.world.lara.air, RenderFrame(-1));
        assert_eq!(t.world.lara.state.health, LARA_HEALTH - DROWNING_DAMAGE);
        update_air(&mut t.world);
        assert_eq!(t.world.lara.air, RenderFrame(-1));
    }

    #[test]
    fn test_air_recovers_on_surface() {
        let mut t = TestWorld::new();
        t.world.lara.underwater_state = UnderwaterState::Swimming;
        t.world.lara.air = LARA_AIR - RenderFrame(5);
        update_air(&mut t.world);
        assert_eq!(t.world.lara.air, LARA_AIR);
    }

    #[test]
    fn test_turn_rate_is_capped() {
        let mut t = TestWorld::new();
        for _ in 0..100 {
            t.world.lara.add_y_rotation_speed(SLOW_TURN_SPEED_ACCELERATION, FAST_TURN_SPEED);
        }
        assert_eq!(t.world.lara.y_rotation_speed, FAST_TURN_SPEED);
        for _ in 0..100 {
            t.world.lara.sub_y_rotation_speed(SLOW_TURN_SPEED_ACCELERATION, -FAST_TURN_SPEED);
        }
        assert_eq!(t.world.lara.y_rotation_speed, -FAST_TURN_SPEED);
    }

    #[test]
    fn test_water_surface_from_below() {
        let mut t = TestWorld::new();
        testlevel::place_lara(&mut t.world, testlevel::WATER_ROOM, Position::new(1536, 2048, 1536));
        assert_eq!(water_surface_height(&t.world), Some(testlevel::WATER_SURFACE));
    }

    #[test]
    fn test_no_water_surface_on_dry_land() {
        let t = TestWorld::new();
        assert_eq!(water_surface_height(&t.world), None);
    }

    #[test]
    fn test_surfacing_switches_to_swimming() {
        let mut t = TestWorld::new();
        testlevel::place_lara(&mut t.world, testlevel::AIR_ABOVE_WATER_ROOM, Position::new(1536, -50, 1536));
        t.world.lara.underwater_state = UnderwaterState::Diving;
        t.world.lara.state.fallspeed = Speed(40);
        leave_water_from_diving(&mut t.world);
        assert_eq!(t.world.lara.underwater_state, UnderwaterState::Swimming);
        assert_eq!(t.world.lara.current_state(), LaraStateId::OnWaterStop);
        assert_eq!(t.world.lara.position().y, testlevel::WATER_SURFACE + Length(1));
        assert_eq!(t.world.lara.state.fallspeed, Speed(0));
    }

    #[test]
    fn test_burn_kills_on_floor_only() {
        let mut t = TestWorld::new();
        update_floor_height(&mut t.world, Length(0));
        t.world.lara.state.floor = Length(-10);
        burn_if_alive(&mut t.world);
        assert!(!t.world.lara.is_dead());
        update_floor_height(&mut t.world, Length(0));
        burn_if_alive(&mut t.world);
        assert_eq!(t.world.lara.state.health, DEAD_HEALTH);
        assert_eq!(t.world.objects.particles.len(), FLAME_COUNT);
    }
}
