// input.rs — Player input seam
//
// The simulation reads input through `InputHandler` once per frame. Axes
// are tri-state; discrete actions are either held or debounced (true only
// on the frame the button went down).

use bitflags::bitflags;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AxisMovement {
    #[default]
    Null,
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    /// Forward / Backward.
    pub z_movement: AxisMovement,
    /// Left / Right turning.
    pub x_movement: AxisMovement,
    /// Left / Right sidestep.
    pub step_movement: AxisMovement,
    pub jump: bool,
    pub roll: bool,
    pub free_look: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Action,
    Walk,
    DrawPistols,
    DrawShotgun,
    DrawUzis,
    DrawMagnums,
    Holster,
    ConsumeSmallMedipack,
    ConsumeLargeMedipack,
    Menu,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ActionSet: u16 {
        const ACTION                 = 1 << 0;
        const WALK                   = 1 << 1;
        const DRAW_PISTOLS           = 1 << 2;
        const DRAW_SHOTGUN           = 1 << 3;
        const DRAW_UZIS              = 1 << 4;
        const DRAW_MAGNUMS           = 1 << 5;
        const HOLSTER                = 1 << 6;
        const CONSUME_SMALL_MEDIPACK = 1 << 7;
        const CONSUME_LARGE_MEDIPACK = 1 << 8;
        const MENU                   = 1 << 9;
    }
}

impl From<Action> for ActionSet {
    fn from(a: Action) -> Self {
        match a {
            Action::Action => Self::ACTION,
            Action::Walk => Self::WALK,
            Action::DrawPistols => Self::DRAW_PISTOLS,
            Action::DrawShotgun => Self::DRAW_SHOTGUN,
            Action::DrawUzis => Self::DRAW_UZIS,
            Action::DrawMagnums => Self::DRAW_MAGNUMS,
            Action::Holster => Self::HOLSTER,
            Action::ConsumeSmallMedipack => Self::CONSUME_SMALL_MEDIPACK,
            Action::ConsumeLargeMedipack => Self::CONSUME_LARGE_MEDIPACK,
            Action::Menu => Self::MENU,
        }
    }
}

pub trait InputHandler {
    /// Advances to the next frame's input.
    fn update(&mut self);
    fn input_state(&self) -> InputState;
    fn has_action(&self, action: Action) -> bool;
    fn has_debounced_action(&self, action: Action) -> bool;
}

/// One frame of recorded input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputFrame {
    pub state: InputState,
    pub actions: ActionSet,
}

/// Replays a queue of frames; when the queue runs dry the last frame is
/// held. Used by tests and demo playback.
#[derive(Default)]
pub struct ScriptedInput {
    frames: VecDeque<InputFrame>,
    current: InputFrame,
    previous: ActionSet,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: InputFrame) {
        self.frames.push_back(frame);
    }

    /// Queues `count` copies of `frame`.
    pub fn push_repeat(&mut self, frame: InputFrame, count: usize) {
        for _ in 0..count {
            self.frames.push_back(frame);
        }
    }

    /// Replaces whatever is queued by `frame`, held indefinitely.
    pub fn hold(&mut self, frame: InputFrame) {
        self.frames.clear();
        self.frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputHandler for ScriptedInput {
    fn update(&mut self) {
        self.previous = self.current.actions;
        if self.frames.len() > 1 {
            if let Some(f) = self.frames.pop_front() {
                self.current = f;
            }
        } else if let Some(&f) = self.frames.front() {
            self.current = f;
        }
    }

    fn input_state(&self) -> InputState {
        self.current.state
    }

    fn has_action(&self, action: Action) -> bool {
        self.current.actions.contains(action.into())
    }

    fn has_debounced_action(&self, action: Action) -> bool {
        let bit: ActionSet = action.into();
        self.current.actions.contains(bit) && !self.previous.contains(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward() -> InputFrame {
        InputFrame {
            state: InputState { z_movement: AxisMovement::Forward, ..Default::default() },
            actions: ActionSet::empty(),
        }
    }

    #[test]
    fn test_scripted_input_holds_last_frame() {
        let mut input = ScriptedInput::new();
        input.push(forward());
        input.push(InputFrame::default());
        input.update();
        assert_eq!(input.input_state().z_movement, AxisMovement::Forward);
        input.update();
        input.update();
        assert_eq!(input.input_state().z_movement, AxisMovement::Null);
        assert_eq!(input.remaining(), 1);
    }

    #[test]
    fn test_debounced_action() {
        let mut input = ScriptedInput::new();
        let action = InputFrame { actions: ActionSet::ACTION, ..Default::default() };
        input.push_repeat(action, 3);
        input.update();
        assert!(input.has_action(Action::Action));
        assert!(input.has_debounced_action(Action::Action));
        input.update();
        assert!(input.has_action(Action::Action));
        assert!(!input.has_debounced_action(Action::Action));
        assert!(!input.has_action(Action::Walk));
    }
}
