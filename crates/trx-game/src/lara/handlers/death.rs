// death.rs — Dying on land, in the water, under a boulder or turned to gold

use trx_common::collision::CollisionInfo;
use trx_common::units::*;

use super::common::{default_post, local_frame};
use super::underwater;
use crate::audio_engine::sfx;
use crate::camera::CameraModifier;
use crate::lara::water_surface_height;
use crate::particles::{Particle, ParticleKind};
use crate::world::World;

const DEATH_COLLISION_RADIUS: Length = Length(400);
const SINK_RATE: Speed = Speed(8);
const FLOAT_UP_STEP: Length = Length(5);
const FLOAT_MARGIN: Length = Length(100);

/// Local frames at which the gold spreads to another mesh, with the
/// bitmask of meshes swapped by then.
const MIDAS_MESH_STEPS: [(i32, u32); 8] = [
    (5, 0x0001),
    (70, 0x0003),
    (90, 0x0023),
    (100, 0x01a3),
    (120, 0x03a3),
    (130, 0x0fa3),
    (140, 0x3fa3),
    (180, 0x7fff),
];

pub fn death_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_modifier(CameraModifier::FollowCenter);
    w.camera.set_rotation_around_lara_x(Angle::deg(-25));
}

pub fn boulder_death_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_modifier(CameraModifier::FollowCenter);
    w.camera.set_rotation_around_lara_x(Angle::deg(-25));
    w.camera.set_rotation_around_lara_y(Angle::deg(170));
}

pub fn death_post(w: &mut World, coll: &mut CollisionInfo) {
    w.audio.stop_sound_effect(sfx::LARA_SCREAM, Some(w.lara.id));
    coll.collision_radius = DEATH_COLLISION_RADIUS;
    default_post(w, coll);
    w.lara.apply_shift(coll);
    w.lara.state.health = DEAD_HEALTH;
    w.lara.air = RenderFrame(-1);
    w.lara.place_on_floor(coll);
}

pub fn water_death_input(w: &mut World, _coll: &mut CollisionInfo) {
    if w.is_physics_frame() {
        w.lara.state.fallspeed = (w.lara.state.fallspeed - SINK_RATE).max(Speed(0));
    }
    let step = Angle::deg(2).to_render_unit();
    let x = w.lara.state.rotation.x;
    w.lara.state.rotation.x = if x.abs() <= step {
        Angle::ZERO
    } else if x < Angle::ZERO {
        x + step
    } else {
        x - step
    };
}

pub fn water_death_post(w: &mut World, coll: &mut CollisionInfo) {
    w.lara.air = RenderFrame(-1);
    w.lara.hand_status = crate::lara::HandStatus::Grabbing;
    if let Some(surface) = water_surface_height(w) {
        if surface < w.lara.position().y - FLOAT_MARGIN {
            w.lara.state.location.position.y -= FLOAT_UP_STEP;
        }
    }
    underwater::common_post(w, coll);
}

pub fn midas_death_input(w: &mut World, _coll: &mut CollisionInfo) {
    w.camera.set_modifier(CameraModifier::FollowCenter);
    if w.is_physics_frame() {
        let p = Particle::new(ParticleKind::Sparkle, w.lara.state.location);
        w.objects.particles.push(p);
    }
    let frame = local_frame(w).get();
    let mask = MIDAS_MESH_STEPS
        .iter()
        .take_while(|(at, _)| frame >= *at)
        .last()
        .map_or(0, |(_, m)| *m);
    w.lara.skeleton.mesh_swap = mask;
}

pub fn midas_death_post(w: &mut World, coll: &mut CollisionInfo) {
    default_post(w, coll);
    w.lara.apply_shift(coll);
    w.lara.place_on_floor(coll);
}
