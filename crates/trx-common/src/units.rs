// units.rs — Fixed-point world quantities and engine constants
//
// Every spatial, angular and temporal value in the simulation is an integer
// quantity wrapped in its own newtype so that lengths cannot be added to
// speeds by accident. Rates expressed "per animation frame" are converted
// to "per render frame" with `to_render_unit`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            pub const ZERO: Self = Self(0);

            #[inline]
            pub const fn get(self) -> i32 {
                self.0
            }

            #[inline]
            pub const fn abs(self) -> Self {
                Self(self.0.abs())
            }

            #[inline]
            pub fn signum(self) -> i32 {
                self.0.signum()
            }
        }

        impl Add for $name {
            type Output = Self;
            #[inline]
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl AddAssign for $name {
            #[inline]
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl SubAssign for $name {
            #[inline]
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = Self;
            #[inline]
            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<i32> for $name {
            type Output = Self;
            #[inline]
            fn mul(self, rhs: i32) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<i32> for $name {
            type Output = Self;
            #[inline]
            fn div(self, rhs: i32) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl MulAssign<i32> for $name {
            #[inline]
            fn mul_assign(&mut self, rhs: i32) {
                self.0 *= rhs;
            }
        }

        impl DivAssign<i32> for $name {
            #[inline]
            fn div_assign(&mut self, rhs: i32) {
                self.0 /= rhs;
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

quantity!(
    /// World distance. One sector is 1024 units; +Y points down.
    Length
);
quantity!(
    /// Distance travelled per animation frame.
    Speed
);
quantity!(
    /// Animation frame count (30 Hz).
    Frame
);
quantity!(
    /// Render frame count (60 Hz).
    RenderFrame
);
quantity!(Health);

impl Speed {
    /// Distance covered in one animation frame.
    #[inline]
    pub const fn per_frame(self) -> Length {
        Length(self.0)
    }
}

impl Length {
    #[inline]
    pub const fn to_speed(self) -> Speed {
        Speed(self.0)
    }

    /// Halves a per-animation-frame displacement to a per-render-frame one.
    #[inline]
    pub const fn to_render_unit(self) -> Self {
        Self(self.0 / 2)
    }
}

impl Frame {
    #[inline]
    pub const fn to_render(self) -> RenderFrame {
        RenderFrame(self.0 * 2)
    }
}

impl RenderFrame {
    #[inline]
    pub const fn to_anim(self) -> Frame {
        Frame(self.0 / 2)
    }
}

// ============================================================
// Angles
// ============================================================

/// Angle in 16-bit units; a full turn is 65536. Arithmetic wraps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Angle(pub i16);

impl Angle {
    pub const ZERO: Self = Self(0);

    /// Whole degrees to angle units, truncating like the level data does.
    #[inline]
    pub const fn deg(d: i32) -> Self {
        Self((d * 65536 / 360) as i16)
    }

    /// Hundredths of a degree, for the fractional turn rates.
    #[inline]
    pub const fn centideg(cd: i32) -> Self {
        Self((cd * 65536 / 36000) as i16)
    }

    #[inline]
    pub const fn from_au(au: i32) -> Self {
        Self(au as i16)
    }

    #[inline]
    pub const fn au(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    pub fn radians(self) -> f32 {
        self.0 as f32 * std::f32::consts::PI / 32768.0
    }

    #[inline]
    pub fn degrees(self) -> f32 {
        self.0 as f32 * 180.0 / 32768.0
    }

    #[inline]
    pub fn sin(self) -> f32 {
        self.radians().sin()
    }

    #[inline]
    pub fn cos(self) -> f32 {
        self.radians().cos()
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    /// Halves a per-animation-frame turn rate to a per-render-frame one.
    #[inline]
    pub const fn to_render_unit(self) -> Self {
        Self(self.0 / 2)
    }

    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self(self.0.clamp(min.0, max.0))
    }
}

impl PartialOrd for Angle {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Angle {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Angle {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Angle {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl AddAssign for Angle {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl SubAssign for Angle {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

impl Neg for Angle {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl Mul<i32> for Angle {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: i32) -> Self {
        Self((self.0 as i32).wrapping_mul(rhs) as i16)
    }
}

impl Div<i32> for Angle {
    type Output = Self;
    #[inline]
    fn div(self, rhs: i32) -> Self {
        Self((self.0 as i32 / rhs) as i16)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}deg", self.degrees())
    }
}

/// Angle whose tangent is `dx / dz`, measured from +Z toward +X.
pub fn angle_from_atan(dx: Length, dz: Length) -> Angle {
    let rad = (dx.0 as f32).atan2(dz.0 as f32);
    Angle((rad * 32768.0 / std::f32::consts::PI) as i32 as i16)
}

/// The four cardinal facings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Deg0,
    Right90,
    Deg180,
    Left90,
}

/// Cardinal axis within `margin` of `angle`, if any.
pub fn axis_from_angle(angle: Angle, margin: Angle) -> Option<Axis> {
    let a = angle.au();
    let m = margin.au();
    if a.abs() <= m {
        return Some(Axis::Deg0);
    }
    if (a - 16384).abs() <= m {
        return Some(Axis::Right90);
    }
    if (a + 16384).abs() <= m {
        return Some(Axis::Left90);
    }
    if a >= 32767 - m || a <= -32768 + m {
        return Some(Axis::Deg180);
    }
    None
}

pub fn snap_rotation(axis: Axis) -> Angle {
    match axis {
        Axis::Deg0 => Angle::deg(0),
        Axis::Right90 => Angle::deg(90),
        Axis::Deg180 => Angle::deg(180),
        Axis::Left90 => Angle::deg(-90),
    }
}

// ============================================================
// Vectors
// ============================================================

/// Integer world position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: Length,
    pub y: Length,
    pub z: Length,
}

impl Position {
    pub const ORIGIN: Self = Self { x: Length(0), y: Length(0), z: Length(0) };

    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x: Length(x), y: Length(y), z: Length(z) }
    }

    /// Converts to the renderer's right-handed, Y-up space.
    pub fn to_render_system(self) -> glam::Vec3 {
        glam::Vec3::new(self.x.0 as f32, -(self.y.0 as f32), -(self.z.0 as f32))
    }

    pub fn distance_xz(&self, other: &Position) -> f32 {
        let dx = (self.x.0 - other.x.0) as f32;
        let dz = (self.z.0 - other.z.0) as f32;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn length(&self) -> f32 {
        let (x, y, z) = (self.x.0 as f32, self.y.0 as f32, self.z.0 as f32);
        (x * x + y * y + z * z).sqrt()
    }
}

impl Add for Position {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y, z: self.z + rhs.z }
    }
}

impl Sub for Position {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y, z: self.z - rhs.z }
    }
}

impl AddAssign for Position {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl SubAssign for Position {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Pitch/yaw/roll triple. `x` pitches, `y` yaws, `z` rolls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rotation {
    pub x: Angle,
    pub y: Angle,
    pub z: Angle,
}

impl Rotation {
    pub const fn yaw(y: Angle) -> Self {
        Self { x: Angle::ZERO, y, z: Angle::ZERO }
    }
}

/// Horizontal displacement of `len` along `angle`.
pub fn pitch(len: Length, angle: Angle) -> Position {
    Position {
        x: Length((len.0 as f32 * angle.sin()) as i32),
        y: Length(0),
        z: Length((len.0 as f32 * angle.cos()) as i32),
    }
}

/// Displacement of `len` along the yaw and pitch of `rot`.
pub fn yaw_pitch(len: Length, rot: &Rotation) -> Position {
    let flat = len.0 as f32 * rot.x.cos();
    Position {
        x: Length((flat * rot.y.sin()) as i32),
        y: Length(-(len.0 as f32 * rot.x.sin()) as i32),
        z: Length((flat * rot.y.cos()) as i32),
    }
}

/// Rotates a local offset by the yaw of an object.
pub fn rotate_y(offset: &Position, yaw: Angle) -> Position {
    let (s, c) = (yaw.sin(), yaw.cos());
    let x = offset.x.0 as f32;
    let z = offset.z.0 as f32;
    Position {
        x: Length((x * c + z * s) as i32),
        y: offset.y,
        z: Length((z * c - x * s) as i32),
    }
}

/// Axis-aligned box in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Position,
    pub max: Position,
}

impl BoundingBox {
    pub const fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, p: &Position) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

// ============================================================
// Engine constants
// ============================================================

pub const FRAME_RATE: i32 = 30;
pub const RENDER_FRAME_RATE: i32 = 60;

pub const SECTOR_SIZE: Length = Length(1024);
pub const QUARTER_SECTOR_SIZE: Length = Length(256);
pub const HEIGHT_LIMIT: Length = Length(127 * 256);
/// Returned when no floor or ceiling exists at a point.
pub const INVALID_HEIGHT: Length = Length(i32::MAX);
/// Floor and ceiling of a solid wall sector.
pub const WALL_HEIGHT: Length = Length(-127 * 256);

pub const STEPPABLE_HEIGHT: Length = Length(128);
pub const CLIMB_LIMIT_2_CLICK_MIN: Length = Length(384);
pub const CLIMB_LIMIT_2_CLICK_MAX: Length = Length(640);
pub const CLIMB_LIMIT_3_CLICK_MAX: Length = Length(896);
pub const JUMP_REACHABLE_HEIGHT: Length = Length(1920);
pub const JUMP_UP_MIN_HEIGHT: Length = Length(1152);

pub const LARA_WALK_HEIGHT: Length = Length(762);
pub const LARA_HANG_HEIGHT: Length = Length(870);
pub const LARA_SWIM_HEIGHT: Length = Length(210);
pub const LARA_DIVE_HEIGHT: Length = Length(400);
pub const LARA_DIVE_GROUND_ELEVATION: Length = Length(200);
pub const SCALP_TO_HANDS_HEIGHT: Length = Length(160);

pub const DEFAULT_COLLISION_RADIUS: Length = Length(100);
pub const DEFAULT_COLLISION_RADIUS_UNDERWATER: Length = Length(300);
pub const MAX_GRABBABLE_GRADIENT: Length = Length(60);

pub const FREE_FALL_SPEED_THRESHOLD: Speed = Speed(131);
pub const FAST_FALL_SPEED: Speed = Speed(128);
pub const GRAVITY: Speed = Speed(6);
pub const ONWATER_ACCELERATION: Speed = Speed(8);
pub const ONWATER_DECELERATION: Speed = Speed(4);
pub const ONWATER_MAX_SPEED: Speed = Speed(60);
pub const UNDERWATER_MAX_SPEED: Speed = Speed(200);

pub const LARA_HEALTH: Health = Health(1000);
pub const DEAD_HEALTH: Health = Health(-1);
/// Air supply in render frames; one minute underwater.
pub const LARA_AIR: RenderFrame = RenderFrame(3600);

// Per-animation-frame turn rates.
pub const SLOW_TURN_SPEED: Angle = Angle::deg(4);
pub const MEDIUM_TURN_SPEED: Angle = Angle::deg(6);
pub const FAST_TURN_SPEED: Angle = Angle::deg(8);
pub const RUN_BACK_TURN_SPEED: Angle = Angle::deg(6);
pub const JUMP_TURN_SPEED: Angle = Angle::deg(3);
pub const SLOW_TURN_SPEED_ACCELERATION: Angle = Angle::centideg(225);
pub const TURN_SPEED_DECELERATION: Angle = Angle::deg(2);
pub const ONWATER_TURN_SPEED: Angle = Angle::deg(2);
pub const WATER_COLLISION_ROTATION_SPEED_Y: Angle = Angle::deg(5);
