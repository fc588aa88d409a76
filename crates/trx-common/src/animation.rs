// animation.rs — Animations, transitions and skeletal models
//
// Animation commands arrive from the level as a flat word stream. They are
// decoded once at load into `AnimCommand` values; the per-frame code never
// touches raw words.

use crate::error::LevelError;
use crate::units::*;

// ============================================================
// Animation commands
// ============================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimCommand {
    /// Local offset applied when the animation ends.
    SetPosition(Position),
    /// Launch into the air when the animation ends.
    StartFalling { fallspeed: Speed, speed: Speed },
    EmptyHands,
    Kill,
    /// Fires on the frame equal to `frame` (absolute frame number).
    PlaySound { frame: Frame, sound_id: u16 },
    PlayEffect { frame: Frame, effect_id: u16 },
}

fn read_word(stream: &[u16], idx: usize) -> Result<u16, LevelError> {
    stream.get(idx).copied().ok_or(LevelError::IndexOutOfRange {
        kind: "animation command",
        index: idx,
        len: stream.len(),
    })
}

/// Decodes `count` commands starting at `offset`.
pub fn decode_anim_commands(stream: &[u16], offset: usize, count: usize) -> Result<Vec<AnimCommand>, LevelError> {
    let mut out = Vec::with_capacity(count);
    let mut pos = offset;
    for _ in 0..count {
        let opcode = read_word(stream, pos)?;
        pos += 1;
        let cmd = match opcode {
            1 => {
                let x = read_word(stream, pos)? as i16 as i32;
                let y = read_word(stream, pos + 1)? as i16 as i32;
                let z = read_word(stream, pos + 2)? as i16 as i32;
                pos += 3;
                AnimCommand::SetPosition(Position::new(x, y, z))
            }
            2 => {
                let fallspeed = read_word(stream, pos)? as i16 as i32;
                let speed = read_word(stream, pos + 1)? as i16 as i32;
                pos += 2;
                AnimCommand::StartFalling { fallspeed: Speed(fallspeed), speed: Speed(speed) }
            }
            3 => AnimCommand::EmptyHands,
            4 => AnimCommand::Kill,
            5 | 6 => {
                let frame = Frame(read_word(stream, pos)? as i32);
                let id = read_word(stream, pos + 1)?;
                pos += 2;
                if opcode == 5 {
                    AnimCommand::PlaySound { frame, sound_id: id & 0x3fff }
                } else {
                    AnimCommand::PlayEffect { frame, effect_id: id & 0x3fff }
                }
            }
            // unused opcode, no payload
            0 => continue,
            other => {
                return Err(LevelError::IndexOutOfRange { kind: "animation opcode", index: other as usize, len: 7 })
            }
        };
        out.push(cmd);
    }
    Ok(out)
}

// ============================================================
// Transitions
// ============================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionCase {
    pub first_frame: Frame,
    pub last_frame: Frame,
    pub target_animation: usize,
    pub target_frame: Frame,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub state_id: u16,
    pub cases: Vec<TransitionCase>,
}

/// One stored pose.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keyframe {
    pub bbox: BoundingBox,
    pub offset: glam::Vec3,
    /// One rotation per bone, in bone-tree order.
    pub rotations: Vec<glam::Quat>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Animation {
    pub state_id: u16,
    pub first_frame: Frame,
    pub last_frame: Frame,
    pub next_animation: usize,
    pub next_frame: Frame,
    /// Frames between stored keyframes.
    pub segment_length: u16,
    /// Horizontal speed and acceleration in 16.16 fixed point.
    pub speed: i32,
    pub acceleration: i32,
    pub keyframes: Vec<Keyframe>,
    pub transitions: Vec<Transition>,
    pub commands: Vec<AnimCommand>,
}

impl Animation {
    /// Number of frames, counting both ends.
    pub fn frame_count(&self) -> Frame {
        self.last_frame - self.first_frame + Frame(1)
    }

    /// First case whose range contains `frame` among the transitions to
    /// `goal`.
    pub fn find_transition(&self, goal: u16, frame: Frame) -> Option<&TransitionCase> {
        self.transitions
            .iter()
            .filter(|t| t.state_id == goal)
            .flat_map(|t| t.cases.iter())
            .find(|c| frame >= c.first_frame && frame <= c.last_frame)
    }

    /// Speed integrated from the fixed-point base and acceleration at a
    /// local frame.
    pub fn speed_at(&self, local_frame: Frame) -> Speed {
        Speed((self.speed + self.acceleration * local_frame.get()) >> 16)
    }

    /// Keyframes around `frame` and the blend factor between them.
    pub fn keyframe_pair(&self, frame: Frame) -> Option<(&Keyframe, &Keyframe, f32)> {
        if self.keyframes.is_empty() {
            return None;
        }
        let seg = self.segment_length.max(1) as i32;
        let local = (frame - self.first_frame).get().max(0);
        let idx = ((local / seg) as usize).min(self.keyframes.len() - 1);
        let next = (idx + 1).min(self.keyframes.len() - 1);
        let t = (local % seg) as f32 / seg as f32;
        Some((&self.keyframes[idx], &self.keyframes[next], t))
    }
}

// ============================================================
// Models
// ============================================================

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoneTreeEntry {
    /// Parent bone index; the root has none.
    pub parent: Option<usize>,
    pub offset: glam::Vec3,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkeletalModel {
    pub type_id: u16,
    pub bones: Vec<BoneTreeEntry>,
    pub mesh_base: usize,
    /// Index of the model's first animation.
    pub animation_index: usize,
}

/// Checks frame ranges and cross references of the animation table.
pub fn validate_animations(animations: &[Animation]) -> Result<(), LevelError> {
    let len = animations.len();
    for (index, anim) in animations.iter().enumerate() {
        if anim.first_frame > anim.last_frame {
            return Err(LevelError::InvertedFrameRange {
                index,
                first: anim.first_frame.get(),
                last: anim.last_frame.get(),
            });
        }
        if anim.next_animation >= len {
            return Err(LevelError::IndexOutOfRange { kind: "next animation", index: anim.next_animation, len });
        }
        for case in anim.transitions.iter().flat_map(|t| t.cases.iter()) {
            if case.target_animation >= len {
                return Err(LevelError::IndexOutOfRange { kind: "transition target", index: case.target_animation, len });
            }
        }
    }
    Ok(())
}
