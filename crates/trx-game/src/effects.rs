// effects.rs — Numbered effects run by animations and `FlipEffect` commands
//
// Most effects are instant. The timed ones (earthquake, flood, sounds of
// moving scenery, flickering rooms) stay in `World::active_effect` and are
// run once per physics frame with `World::effect_timer` counting up from
// zero until they clear themselves.

use rand::Rng;
use trx_common::location::Location;
use trx_common::units::*;

use crate::audio_engine::sfx;
use crate::camera::CameraMode;
use crate::lara::anim_ids;
use crate::lara::state::LaraStateId;
use crate::particles::{Particle, ParticleKind};
use crate::world::World;

pub const TURN_180: u16 = 0;
pub const DINO_STOMP: u16 = 1;
pub const LARA_NORMAL: u16 = 2;
pub const LARA_BUBBLES: u16 = 3;
pub const FINISH_LEVEL: u16 = 4;
pub const EARTHQUAKE: u16 = 5;
pub const FLOOD: u16 = 6;
pub const CHANDELIER: u16 = 7;
pub const RAISING_BLOCK: u16 = 8;
pub const STAIRS_TO_SLOPE: u16 = 9;
pub const SAND: u16 = 10;
pub const EXPLOSION: u16 = 11;
pub const LARA_HANDS_FREE: u16 = 12;
pub const FLIP_MAP: u16 = 13;
pub const DRAW_RIGHT_WEAPON: u16 = 14;
pub const CHAIN_BLOCK: u16 = 15;
pub const FLICKER: u16 = 16;

const STOMP_RANGE: f32 = 16.0 * 1024.0;
const STOMP_BOUNCE: f32 = 100.0;
const MAX_BUBBLES: i32 = 12;
const RIGHT_HAND_BONE: usize = 10;
/// Frame of the standing animation the avatar is put back into.
const LARA_NORMAL_FRAME: Frame = Frame(185);

/// Who an effect applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectTarget {
    None,
    Lara,
    Object(u16),
}

fn target_location(w: &World, target: EffectTarget) -> Option<(Location, Angle)> {
    match target {
        EffectTarget::None => None,
        EffectTarget::Lara => Some((w.lara.state.location, w.lara.yaw())),
        EffectTarget::Object(id) => w.objects.get(id).map(|o| (o.state.location, o.state.rotation.y)),
    }
}

fn play(w: &mut World, id: u16) {
    w.audio.play_sound_effect(&mut w.rng, id, None);
}

/// Ends the running timed effect.
fn clear(w: &mut World) {
    w.active_effect = None;
}

/// Runs effect `id` once.
pub fn run_effect(w: &mut World, id: u16, target: EffectTarget) {
    log::trace!("effect {} on {:?}", id, target);
    match id {
        TURN_180 => turn_180(w, target),
        DINO_STOMP => dino_stomp(w, target),
        LARA_NORMAL => lara_normal(w),
        LARA_BUBBLES => lara_bubbles(w, target),
        FINISH_LEVEL => w.finished = true,
        EARTHQUAKE => earthquake(w),
        FLOOD => flood(w),
        CHANDELIER => {
            play(w, sfx::CHANDELIER_FALL);
            clear(w);
        }
        RAISING_BLOCK => {
            w.effect_timer += Frame(1);
            if w.effect_timer == Frame(5) {
                play(w, sfx::RAISING_BLOCK);
                clear(w);
            }
        }
        STAIRS_TO_SLOPE => stairs_to_slope(w),
        SAND => {
            if w.effect_timer <= Frame(120) {
                play(w, sfx::LOW_HUM);
            } else {
                clear(w);
            }
            w.effect_timer += Frame(1);
        }
        EXPLOSION => {
            play(w, sfx::SETTLING_DEBRIS);
            w.camera.set_bounce(Length(-75));
            clear(w);
        }
        LARA_HANDS_FREE => w.lara.hand_status = crate::lara::HandStatus::None,
        FLIP_MAP => w.swap_all_rooms(),
        DRAW_RIGHT_WEAPON => {
            if target == EffectTarget::Lara {
                w.lara.skeleton.set_mesh_swap(RIGHT_HAND_BONE, true);
            } else if let EffectTarget::Object(oid) = target {
                if let Some(sk) = w.objects.get_mut(oid).and_then(|o| o.skeleton.as_mut()) {
                    sk.set_mesh_swap(RIGHT_HAND_BONE, true);
                }
            }
        }
        CHAIN_BLOCK => {
            if w.effect_timer == Frame(0) {
                play(w, sfx::CHAIN_BLOCK);
            }
            w.effect_timer += Frame(1);
            if w.effect_timer == Frame(55) {
                play(w, sfx::LARA_FALL_INTO_WATER);
                clear(w);
            }
        }
        FLICKER => {
            let t = w.effect_timer;
            if t == Frame(90) || t == Frame(92) || t == Frame(105) || t == Frame(107) {
                w.swap_all_rooms();
            } else if t > Frame(125) {
                w.swap_all_rooms();
                clear(w);
            }
            w.effect_timer += Frame(1);
        }
        _ => log::warn!("unhandled effect {}", id),
    }
}

/// Effects that finish in a single call; the per-frame runner drops them
/// after one run.
fn is_instant(id: u16) -> bool {
    matches!(id, TURN_180 | DINO_STOMP | LARA_NORMAL | LARA_BUBBLES | FINISH_LEVEL | LARA_HANDS_FREE | FLIP_MAP | DRAW_RIGHT_WEAPON)
}

/// Starts `id` as the world's running effect.
pub fn set_global_effect(w: &mut World, id: u16) {
    log::debug!("global effect {} started", id);
    w.active_effect = Some(id);
    w.effect_timer = Frame(0);
}

/// Runs the active effect for this physics frame.
pub fn run_active_effect(w: &mut World) {
    let Some(id) = w.active_effect else {
        return;
    };
    run_effect(w, id, EffectTarget::None);
    if is_instant(id) && w.active_effect == Some(id) {
        clear(w);
    }
}

// ============================================================
// Individual effects
// ============================================================

fn turn_180(w: &mut World, target: EffectTarget) {
    match target {
        EffectTarget::Lara => w.lara.state.rotation.y += Angle::deg(180),
        EffectTarget::Object(id) => {
            if let Some(obj) = w.objects.get_mut(id) {
                obj.state.rotation.y += Angle::deg(180);
            }
        }
        EffectTarget::None => log::warn!("turn effect without a target"),
    }
}

/// Shakes the camera, harder the closer the stomp is.
fn dino_stomp(w: &mut World, target: EffectTarget) {
    let Some((loc, _)) = target_location(w, target) else {
        return;
    };
    let d = loc.position.to_render_system() - w.camera.position.to_render_system();
    let a = d.abs();
    if a.x > STOMP_RANGE || a.y > STOMP_RANGE || a.z > STOMP_RANGE {
        return;
    }
    let bounce = STOMP_BOUNCE * (1.0 - d.length_squared() / (STOMP_RANGE * STOMP_RANGE));
    w.camera.set_bounce(Length(bounce as i32));
}

/// Back to the regular meshes and the standing pose after a cutscene.
fn lara_normal(w: &mut World) {
    w.lara.set_current(LaraStateId::Stop);
    w.lara.state.required_anim_state = Some(LaraStateId::Unknown12.id());
    let frame = w.animations.get(anim_ids::STAY_SOLID).map(|a| a.first_frame + LARA_NORMAL_FRAME);
    w.lara.set_animation(&w.animations, anim_ids::STAY_SOLID, frame);
    w.lara.skeleton.mesh_swap = 0;
    w.camera.set_mode(CameraMode::Chase);
}

fn lara_bubbles(w: &mut World, target: EffectTarget) {
    let Some((loc, yaw)) = target_location(w, target) else {
        return;
    };
    let count = w.rng.gen_range(0..MAX_BUBBLES);
    if count == 0 {
        return;
    }
    let owner = match target {
        EffectTarget::Object(id) => id,
        _ => w.lara.id,
    };
    let emitter = crate::audio_engine::Emitter { owner, position: loc.position };
    w.audio.play_sound_effect(&mut w.rng, sfx::LARA_UNDERWATER_GURGLE, Some(emitter));
    let mouth = loc.moved(pitch(Length(50), yaw) - Position::new(0, 700, 0));
    for _ in 0..count {
        w.objects.particles.push(Particle::new(ParticleKind::Bubble, mouth));
    }
}

fn earthquake(w: &mut World) {
    match w.effect_timer.get() {
        0 => {
            play(w, sfx::EXPLOSION);
            w.camera.set_bounce(Length(-250));
        }
        3 => play(w, sfx::ROLLING_BALL),
        35 => play(w, sfx::EXPLOSION),
        20 | 50 | 70 => play(w, sfx::TREX_FOOTSTEP),
        _ => {}
    }
    w.effect_timer += Frame(1);
    if w.effect_timer == Frame(105) {
        clear(w);
    }
}

fn flood(w: &mut World) {
    if w.effect_timer <= Frame(120) {
        if w.effect_timer == Frame(0) {
            play(w, sfx::WATER_RUSH);
        }
    } else {
        w.audio.stop_sound_effect(sfx::WATER_RUSH, None);
        clear(w);
    }
    w.effect_timer += Frame(1);
}

fn stairs_to_slope(w: &mut World) {
    if w.effect_timer > Frame(120) {
        clear(w);
    } else {
        if w.effect_timer == Frame(0) {
            play(w, sfx::DOOR_SLAM);
        }
        play(w, sfx::FLOWING_AIR);
    }
    w.effect_timer += Frame(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlevel::TestWorld;

    #[test]
    fn test_turn_180_flips_lara() {
        let mut t = TestWorld::new();
        t.world.lara.state.rotation.y = Angle::ZERO;
        run_effect(&mut t.world, TURN_180, EffectTarget::Lara);
        assert_eq!(t.world.lara.yaw(), Angle::deg(180));
    }

    #[test]
    fn test_earthquake_runs_for_105_frames() {
        let mut t = TestWorld::new();
        set_global_effect(&mut t.world, EARTHQUAKE);
        for _ in 0..104 {
            run_active_effect(&mut t.world);
        }
        assert_eq!(t.world.active_effect, Some(EARTHQUAKE));
        run_active_effect(&mut t.world);
        assert_eq!(t.world.active_effect, None);
    }

    #[test]
    fn test_instant_effect_runs_once() {
        let mut t = TestWorld::new();
        set_global_effect(&mut t.world, FINISH_LEVEL);
        run_active_effect(&mut t.world);
        assert!(t.world.finished);
        assert_eq!(t.world.active_effect, None);
    }

    #[test]
    fn test_flicker_swaps_back_and_forth() {
        let mut t = TestWorld::new();
        set_global_effect(&mut t.world, FLICKER);
        let mut swaps = 0;
        let mut last = t.world.rooms_are_swapped;
        while t.world.active_effect.is_some() {
            run_active_effect(&mut t.world);
            if t.world.rooms_are_swapped != last {
                swaps += 1;
                last = t.world.rooms_are_swapped;
            }
        }
        assert_eq!(swaps, 5);
        assert!(t.world.rooms_are_swapped);
    }

    #[test]
    fn test_hands_free() {
        let mut t = TestWorld::new();
        t.world.lara.hand_status = crate::lara::HandStatus::Grabbing;
        run_effect(&mut t.world, LARA_HANDS_FREE, EffectTarget::Lara);
        assert_eq!(t.world.lara.hand_status, crate::lara::HandStatus::None);
    }
}
