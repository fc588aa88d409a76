// particles.rs — Short-lived sprite effects: splashes, bubbles, blood, smoke and sparks

use rand::Rng;
use trx_common::location::Location;
use trx_common::room::Room;
use trx_common::units::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Splash,
    Bubble,
    Blood,
    Sparkle,
    Ricochet,
    Smoke,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    pub location: Location,
    /// Displacement per physics frame.
    pub velocity: Position,
    pub lifetime: Frame,
}

const SPLASH_LIFETIME: Frame = Frame(16);
const BLOOD_LIFETIME: Frame = Frame(8);
const SPARKLE_LIFETIME: Frame = Frame(12);
const RICOCHET_LIFETIME: Frame = Frame(4);
const SMOKE_LIFETIME: Frame = Frame(10);
const SMOKE_RISE: Length = Length(4);
const BUBBLE_RISE: Length = Length(8);
const SPLASH_GRAVITY: Length = Length(6);

impl Particle {
    pub fn new(kind: ParticleKind, location: Location) -> Self {
        let lifetime = match kind {
            ParticleKind::Splash => SPLASH_LIFETIME,
            ParticleKind::Bubble => Frame(i32::MAX),
            ParticleKind::Blood => BLOOD_LIFETIME,
            ParticleKind::Sparkle => SPARKLE_LIFETIME,
            ParticleKind::Ricochet => RICOCHET_LIFETIME,
            ParticleKind::Smoke => SMOKE_LIFETIME,
        };
        Self { kind, location, velocity: Position::ORIGIN, lifetime }
    }

    /// A splash drop thrown outward from `location` in a random direction.
    pub fn splash<R: Rng>(location: Location, rng: &mut R) -> Self {
        let mut p = Self::new(ParticleKind::Splash, location);
        let angle = Angle::from_au(rng.gen_range(-32768..32768));
        let speed = Length(rng.gen_range(8..40));
        p.velocity = pitch(speed, angle);
        p.velocity.y = Length(-rng.gen_range(24..64));
        p
    }

    /// Advances one physics frame. Returns false once the particle is gone.
    pub fn update(&mut self, rooms: &[Room]) -> bool {
        match self.kind {
            ParticleKind::Splash => {
                self.velocity.y += SPLASH_GRAVITY;
            }
            ParticleKind::Bubble => {
                self.velocity = Position { y: -BUBBLE_RISE, ..Position::ORIGIN };
            }
            ParticleKind::Blood => {
                self.velocity.y = Length(2);
            }
            ParticleKind::Smoke => {
                self.velocity.y = -SMOKE_RISE;
            }
            ParticleKind::Sparkle | ParticleKind::Ricochet => {}
        }
        self.location.move_by(self.velocity);
        self.location.update_room(rooms);

        if self.kind == ParticleKind::Bubble {
            return rooms.get(self.location.room).is_some_and(|r| r.is_water_room);
        }
        self.lifetime -= Frame(1);
        self.lifetime > Frame(0)
    }
}

/// Advances all particles and drops the finished ones.
pub fn update_particles(particles: &mut Vec<Particle>, rooms: &[Room]) {
    particles.retain_mut(|p| p.update(rooms));
}
