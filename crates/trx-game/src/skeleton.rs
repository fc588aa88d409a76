// skeleton.rs — Animated skeleton playback and pose evaluation

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use trx_common::animation::{AnimCommand, Animation, SkeletalModel};
use trx_common::units::*;

use crate::object_state::ObjectState;

/// Side effects of animation commands that the owner has to carry out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimEvent {
    PlaySound(u16),
    PlayEffect(u16),
    EmptyHands,
    Kill,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skeleton {
    pub model_type: u16,
    pub anim: usize,
    pub frame: Frame,
    /// Bones whose mesh is swapped for the alternate one.
    pub mesh_swap: u32,
    pub visible: bool,
    #[serde(skip)]
    pub poses: Vec<Mat4>,
}

impl Skeleton {
    pub fn new(model: &SkeletalModel, anims: &[Animation]) -> Self {
        let frame = anims.get(model.animation_index).map_or(Frame(0), |a| a.first_frame);
        Self {
            model_type: model.type_id,
            anim: model.animation_index,
            frame,
            mesh_swap: 0,
            visible: true,
            poses: Vec::new(),
        }
    }

    pub fn animation<'a>(&self, anims: &'a [Animation]) -> Option<&'a Animation> {
        anims.get(self.anim)
    }

    /// Frame relative to the start of the current animation.
    pub fn local_frame(&self, anims: &[Animation]) -> Frame {
        match self.animation(anims) {
            Some(a) => self.frame - a.first_frame,
            None => self.frame,
        }
    }

    /// Switches to `anim`. A missing or out-of-range `frame` starts at the
    /// animation's first frame.
    pub fn set_animation(&mut self, state: &mut ObjectState, anims: &[Animation], anim: usize, frame: Option<Frame>) {
        let Some(a) = anims.get(anim) else {
            log::warn!("animation {} out of range ({} animations)", anim, anims.len());
            return;
        };
        self.anim = anim;
        self.frame = match frame {
            Some(f) if f >= a.first_frame && f <= a.last_frame => f,
            _ => a.first_frame,
        };
        state.current_anim_state = a.state_id;
    }

    /// Steps one frame and follows a transition toward the goal state if
    /// one matches. Returns true when the frame ran past the animation.
    pub fn advance_frame(&mut self, state: &mut ObjectState, anims: &[Animation]) -> bool {
        self.frame += Frame(1);
        let Some(anim) = self.animation(anims) else {
            return false;
        };
        if state.current_anim_state != state.goal_anim_state {
            if let Some(case) = anim.find_transition(state.goal_anim_state, self.frame) {
                let (target, frame) = (case.target_animation, case.target_frame);
                self.set_animation(state, anims, target, Some(frame));
            }
        }
        match self.animation(anims) {
            Some(a) => self.frame > a.last_frame,
            None => false,
        }
    }

    /// Advances one frame and runs the animation commands: end-of-animation
    /// commands when the animation wraps, sound and effect commands on their
    /// trigger frames. `fall_override` replaces the fall speed of a
    /// `StartFalling` command when non-zero.
    pub fn process_frame(&mut self, state: &mut ObjectState, anims: &[Animation], fall_override: Speed) -> Vec<AnimEvent> {
        let mut events = Vec::new();
        if self.advance_frame(state, anims) {
            if let Some(anim) = anims.get(self.anim) {
                for cmd in &anim.commands {
                    match *cmd {
                        AnimCommand::SetPosition(offset) => state.move_local(&offset),
                        AnimCommand::StartFalling { fallspeed, speed } => {
                            state.fallspeed = if fall_override != Speed(0) { fall_override } else { fallspeed };
                            state.speed = speed;
                            state.falling = true;
                        }
                        AnimCommand::EmptyHands => events.push(AnimEvent::EmptyHands),
                        AnimCommand::Kill => events.push(AnimEvent::Kill),
                        _ => {}
                    }
                }
                let (next, next_frame) = (anim.next_animation, anim.next_frame);
                self.set_animation(state, anims, next, Some(next_frame));
                if state.required_anim_state == Some(state.current_anim_state) {
                    state.required_anim_state = None;
                }
            }
        }

        if let Some(anim) = anims.get(self.anim) {
            for cmd in &anim.commands {
                match *cmd {
                    AnimCommand::PlaySound { frame, sound_id } if frame == self.frame => {
                        events.push(AnimEvent::PlaySound(sound_id))
                    }
                    AnimCommand::PlayEffect { frame, effect_id } if frame == self.frame => {
                        events.push(AnimEvent::PlayEffect(effect_id))
                    }
                    _ => {}
                }
            }
        }
        events
    }

    pub fn bounding_box(&self, anims: &[Animation]) -> BoundingBox {
        self.animation(anims)
            .and_then(|a| a.keyframe_pair(self.frame))
            .map(|(a, _, _)| a.bbox)
            .unwrap_or_default()
    }

    pub fn set_mesh_swap(&mut self, bone: usize, swapped: bool) {
        if swapped {
            self.mesh_swap |= 1 << bone;
        } else {
            self.mesh_swap &= !(1 << bone);
        }
    }

    /// Recomputes the bone matrices for the current frame, interpolating
    /// between the surrounding keyframes. `extra` adds per-bone rotations
    /// (head and torso for the avatar).
    pub fn update_pose(&mut self, anims: &[Animation], model: &SkeletalModel, extra: &[(usize, Rotation)]) {
        let Some((a, b, t)) = self.animation(anims).and_then(|anim| anim.keyframe_pair(self.frame)) else {
            self.poses.clear();
            return;
        };
        self.poses.clear();
        for (i, bone) in model.bones.iter().enumerate() {
            let ra = a.rotations.get(i).copied().unwrap_or(Quat::IDENTITY);
            let rb = b.rotations.get(i).copied().unwrap_or(ra);
            let mut rot = ra.slerp(rb, t);
            for (_, r) in extra.iter().filter(|(idx, _)| *idx == i) {
                rot *= Quat::from_euler(EulerRot::YXZ, r.y.radians(), r.x.radians(), r.z.radians());
            }
            let translation = if i == 0 { a.offset.lerp(b.offset, t) } else { bone.offset };
            let local = Mat4::from_rotation_translation(rot, translation);
            let parent = bone.parent.and_then(|p| self.poses.get(p)).copied().unwrap_or(Mat4::IDENTITY);
            self.poses.push(parent * local);
        }
    }

    /// World-space position of a bone's origin.
    pub fn bone_position(&self, bone: usize) -> Option<Vec3> {
        self.poses.get(bone).map(|m| m.w_axis.truncate())
    }
}
