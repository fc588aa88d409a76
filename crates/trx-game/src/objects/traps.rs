// traps.rs — Swinging blades, slamming doors, dart guns and the sword of Damocles

use rand::Rng;
use trx_common::collision::CollisionInfo;
use trx_common::location::Location;
use trx_common::units::*;

use super::{animate, floor_at, hurt_lara, lara_touches, play_sound, push_lara, type_ids, ObjectKind};
use crate::audio_engine::sfx;
use crate::object_state::{ObjectState, TriggerState};
use crate::particles::{Particle, ParticleKind};
use crate::world::World;

const BLADE_IDLE: u16 = 0;
const BLADE_SWINGING: u16 = 2;
const BLADE_DAMAGE: Health = Health(100);

const SLAMMING_OPEN: u16 = 0;
const SLAMMING_CLOSED: u16 = 1;
const SLAMMING_DAMAGE: Health = Health(400);

const DART_GUN_IDLE: u16 = 0;
const DART_GUN_FIRING: u16 = 1;
const DART_SPEED: Speed = Speed(256);
const DART_DAMAGE: Health = Health(50);
const DART_DROP: Length = Length(512);
const DART_MUZZLE: Length = Length(412);

const SWORD_DAMAGE: Health = Health(100);
const SWORD_REACH_XZ: Length = Length(1536);
const SWORD_REACH_Y: Length = Length(3 * 1024);
const SWORD_DROP_FRAMES: i32 = 32;
const SWORD_REST_OFFSET: Length = Length(10);

/// Damage on touch while a closing or swinging pose is playing.
fn hurt_on_touch(w: &mut World, id: u16, state: u16, damage: Health) {
    let touching = w.objects.get(id).is_some_and(|o| o.state.current_anim_state == state && o.state.touch_bits != 0);
    if touching {
        hurt_lara(w, damage);
    }
}

// ============================================================
// Swinging blade
// ============================================================

pub fn swinging_blade_update(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let s = &mut obj.state;
    if s.update_activation_timeout() {
        if s.current_anim_state == BLADE_IDLE {
            s.goal_anim_state = BLADE_SWINGING;
        }
    } else if s.current_anim_state == BLADE_SWINGING {
        s.goal_anim_state = BLADE_IDLE;
    }
    hurt_on_touch(w, id, BLADE_SWINGING, BLADE_DAMAGE);

    if let Some(loc) = w.objects.get(id).map(|o| o.state.location) {
        let mut l = loc;
        l.update_room(&w.rooms);
        let floor = floor_at(w, &l);
        if let Some(obj) = w.objects.get_mut(id) {
            obj.state.location.room = l.room;
            obj.state.floor = floor;
        }
    }
    animate(w, id);
}

// ============================================================
// Slamming doors
// ============================================================

pub fn slamming_doors_update(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let s = &mut obj.state;
    if s.update_activation_timeout() {
        if s.current_anim_state == SLAMMING_OPEN {
            s.goal_anim_state = SLAMMING_CLOSED;
        } else {
            hurt_on_touch(w, id, SLAMMING_CLOSED, SLAMMING_DAMAGE);
        }
    } else if s.current_anim_state == SLAMMING_CLOSED {
        s.goal_anim_state = SLAMMING_OPEN;
    }
    animate(w, id);
}

// ============================================================
// Dart gun and darts
// ============================================================

pub fn dart_gun_update(w: &mut World, id: u16) {
    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let s = &mut obj.state;
    if s.update_activation_timeout() {
        if s.current_anim_state == DART_GUN_IDLE {
            s.goal_anim_state = DART_GUN_FIRING;
        }
    } else if s.current_anim_state == DART_GUN_FIRING {
        s.goal_anim_state = DART_GUN_IDLE;
    }

    let firing = w.objects.get(id).is_some_and(|o| {
        o.state.current_anim_state == DART_GUN_FIRING && o.local_frame(&w.animations) == Frame(0)
    });
    if firing && w.is_physics_frame() {
        fire_dart(w, id);
    }
    animate(w, id);
}

fn fire_dart(w: &mut World, gun: u16) {
    let Some(obj) = w.objects.get(gun) else {
        return;
    };
    let mut d = Position::new(0, DART_DROP.get(), 0);
    match axis_from_angle(obj.state.rotation.y, Angle::deg(45)) {
        Some(Axis::Deg0) => d.z += DART_MUZZLE,
        Some(Axis::Right90) => d.x += DART_MUZZLE,
        Some(Axis::Deg180) => d.z -= DART_MUZZLE,
        Some(Axis::Left90) => d.x -= DART_MUZZLE,
        None => {}
    }
    let loc = Location::new(obj.state.location.room, obj.position() - d);
    let mut state = ObjectState::new(type_ids::DART, loc, Rotation::yaw(obj.state.rotation.y));
    state.trigger_state = TriggerState::Active;
    state.is_active = true;
    state.speed = DART_SPEED;

    let skeleton = w.models.get(&type_ids::DART).map(|m| {
        let mut sk = crate::skeleton::Skeleton::new(m, &w.animations);
        sk.set_animation(&mut state, &w.animations, m.animation_index, None);
        sk
    });
    let dart = w.objects.add_dynamic(ObjectKind::Dart, state, skeleton);
    w.objects.particles.push(Particle::new(ParticleKind::Smoke, loc));
    log::trace!("dart gun {} fired dart {}", gun, dart);
    play_sound(w, gun, sfx::DART_SPIT);
}

pub fn dart_update(w: &mut World, id: u16) {
    if !w.is_physics_frame() {
        return;
    }
    if lara_touches(w, id, Length(0)) {
        hurt_lara(w, DART_DAMAGE);
        w.objects.kill(id);
        return;
    }

    let Some(obj) = w.objects.get_mut(id) else {
        return;
    };
    let step = pitch(obj.state.speed.per_frame(), obj.state.rotation.y);
    obj.state.location.move_by(step);
    let mut loc = obj.state.location;
    loc.update_room(&w.rooms);
    obj.state.location.room = loc.room;

    let floor = floor_at(w, &loc);
    if loc.position.y >= floor {
        w.objects.particles.push(Particle::new(ParticleKind::Ricochet, loc));
        play_sound(w, id, sfx::RICOCHET);
        w.objects.kill(id);
    }
}

// ============================================================
// Sword of Damocles
// ============================================================

fn sword_params(w: &mut World, id: u16) -> Option<(&mut ObjectState, &mut Angle, &mut Length, &mut Length)> {
    let obj = w.objects.get_mut(id)?;
    match &mut obj.kind {
        ObjectKind::SwordOfDamocles { rotate_speed, drop_x, drop_z } => {
            Some((&mut obj.state, rotate_speed, drop_x, drop_z))
        }
        _ => None,
    }
}

pub fn sword_init(w: &mut World, id: u16) {
    let yaw = Angle::from_au(w.rng.gen_range(-32768..32768));
    let spin = Angle::from_au(w.rng.gen_range(-1024..=1024));
    let Some(loc) = w.objects.get(id).map(|o| o.state.location) else {
        return;
    };
    let floor = floor_at(w, &loc);
    if let Some((state, rotate_speed, _, _)) = sword_params(w, id) {
        state.rotation.y = yaw;
        state.floor = floor;
        *rotate_speed = spin;
    }
}

pub fn sword_update(w: &mut World, id: u16) {
    if !w.is_physics_frame() {
        return;
    }
    let lara = w.lara.position();
    let Some((s, rotate_speed, drop_x, drop_z)) = sword_params(w, id) else {
        return;
    };

    if s.falling {
        s.rotation.y += *rotate_speed;
        s.fallspeed += if s.fallspeed < FAST_FALL_SPEED { GRAVITY } else { Speed(1) };
        s.location.position.y += s.fallspeed.per_frame();
        s.location.position.x += *drop_x;
        s.location.position.z += *drop_z;
        if s.location.position.y > s.floor {
            s.location.position.y = s.floor + SWORD_REST_OFFSET;
            s.falling = false;
            s.trigger_state = TriggerState::Deactivated;
            s.is_active = false;
            log::debug!("sword {} hit the floor", id);
            play_sound(w, id, sfx::SWORD_CLATTER);
        }
        return;
    }

    if s.location.position.y == s.floor + SWORD_REST_OFFSET {
        return;
    }
    s.rotation.y += *rotate_speed;
    let d = lara - s.location.position;
    if d.x.abs() <= SWORD_REACH_XZ && d.z.abs() <= SWORD_REACH_XZ && d.y > Length(0) && d.y < SWORD_REACH_Y {
        *drop_x = d.x / SWORD_DROP_FRAMES;
        *drop_z = d.z / SWORD_DROP_FRAMES;
        s.falling = true;
        log::debug!("sword {} drops", id);
    }
}

pub fn sword_collide(w: &mut World, id: u16, coll: &mut CollisionInfo) {
    if !lara_touches(w, id, coll.collision_radius) {
        return;
    }
    let Some(obj) = w.objects.get(id) else {
        return;
    };
    let falling = obj.state.falling;
    let bbox = obj.bounding_box(&w.animations);
    push_lara(w, id, &bbox, coll);
    if falling {
        hurt_lara(w, SWORD_DAMAGE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlevel::{self, TestWorld};
    use trx_common::floordata::{ActivationState, SequenceCondition, ACTIVATION_FULL};

    fn activate(t: &mut TestWorld, id: u16) {
        let request = ActivationState { activation_set: ACTIVATION_FULL, ..Default::default() };
        let obj = t.world.objects.get_mut(id).expect("object");
        obj.state.apply_activation(&request, SequenceCondition::LaraIsHere);
        obj.state.trigger_state = TriggerState::Active;
        obj.state.is_active = true;
    }

    #[test]
    fn test_blade_swings_while_triggered_and_cuts() {
        let mut t = TestWorld::new();
        let id = testlevel::spawn_object(&mut t.world, type_ids::SWINGING_BLADE, Position::new(1024, 0, 1024), Angle::ZERO);
        activate(&mut t, id);
        swinging_blade_update(&mut t.world, id);
        assert_eq!(t.world.objects.get(id).map(|o| o.state.goal_anim_state), Some(BLADE_SWINGING));

        let obj = t.world.objects.get_mut(id).expect("blade");
        obj.state.current_anim_state = BLADE_SWINGING;
        obj.state.touch_bits = 1;
        swinging_blade_update(&mut t.world, id);
        assert_eq!(t.world.lara.state.health, LARA_HEALTH - BLADE_DAMAGE);
        assert!(t.world.lara.state.is_hit);
    }

    #[test]
    fn test_dart_gun_fires_dart_that_hurts() {
        let mut t = TestWorld::new();
        let gun = testlevel::spawn_object(&mut t.world, type_ids::DART_GUN, Position::new(1024, 256, -1024), Angle::ZERO);
        activate(&mut t, gun);
        let obj = t.world.objects.get_mut(gun).expect("gun");
        obj.state.current_anim_state = DART_GUN_FIRING;
        let before = t.world.objects.len();
        dart_gun_update(&mut t.world, gun);
        assert_eq!(t.world.objects.len(), before + 1);
        assert_eq!(t.world.objects.particles.last().map(|p| p.kind), Some(ParticleKind::Smoke));

        let dart = t.world.objects.objects.values().find(|o| o.kind == ObjectKind::Dart).map(|o| o.id).expect("dart");
        assert_eq!(t.world.objects.get(dart).map(|o| o.position()), Some(Position::new(1024, -256, -1024 - 412)));
        if let Some(obj) = t.world.objects.get_mut(gun) {
            obj.state.is_active = false;
        }
        for _ in 0..64 {
            t.world.render_frame += RenderFrame(1);
            crate::objects::update_objects(&mut t.world);
            if t.world.objects.get(dart).is_none() {
                break;
            }
        }
        assert!(t.world.objects.get(dart).is_none());
        assert_eq!(t.world.lara.state.health, LARA_HEALTH - DART_DAMAGE);
    }

    #[test]
    fn test_sword_drops_on_lara_and_rests() {
        let mut t = TestWorld::new();
        let id = testlevel::spawn_object(&mut t.world, type_ids::SWORD_OF_DAMOCLES, Position::new(1024, -2048, 1024), Angle::ZERO);
        activate(&mut t, id);
        assert_eq!(t.world.objects.get(id).map(|o| o.state.floor), Some(Length(0)));
        sword_update(&mut t.world, id);
        assert!(t.world.objects.get(id).is_some_and(|o| o.state.falling));

        for _ in 0..200 {
            sword_update(&mut t.world, id);
        }
        let obj = t.world.objects.get(id).expect("sword");
        assert!(!obj.state.falling);
        assert_eq!(obj.state.trigger_state, TriggerState::Deactivated);
        assert_eq!(obj.position().y, SWORD_REST_OFFSET);
    }
}
