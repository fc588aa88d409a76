// state.rs — Avatar motion state ids

use serde::{Deserialize, Serialize};

/// Motion states of the avatar, as stored in the animation tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum LaraStateId {
    WalkForward = 0,
    RunForward = 1,
    Stop = 2,
    JumpForward = 3,
    Pose = 4,
    RunBack = 5,
    TurnRightSlow = 6,
    TurnLeftSlow = 7,
    Death = 8,
    FreeFall = 9,
    Hang = 10,
    Reach = 11,
    Unknown12 = 12,
    UnderwaterStop = 13,
    GrabToFall = 14,
    JumpPrepare = 15,
    WalkBackward = 16,
    UnderwaterForward = 17,
    UnderwaterInertia = 18,
    Climbing = 19,
    TurnFast = 20,
    StepRight = 21,
    StepLeft = 22,
    RollBackward = 23,
    SlideForward = 24,
    JumpBack = 25,
    JumpRight = 26,
    JumpLeft = 27,
    JumpUp = 28,
    FallBackward = 29,
    ShimmyLeft = 30,
    ShimmyRight = 31,
    SlideBackward = 32,
    OnWaterStop = 33,
    OnWaterForward = 34,
    UnderwaterDiving = 35,
    PushablePush = 36,
    PushablePull = 37,
    PushableGrab = 38,
    PickUp = 39,
    SwitchDown = 40,
    SwitchUp = 41,
    InsertKey = 42,
    InsertPuzzle = 43,
    WaterDeath = 44,
    RollForward = 45,
    BoulderDeath = 46,
    OnWaterBackward = 47,
    OnWaterLeft = 48,
    OnWaterRight = 49,
    UseMidas = 50,
    MidasDeath = 51,
    SwandiveBegin = 52,
    SwandiveEnd = 53,
    Handstand = 54,
    OnWaterExit = 55,
}

pub const LARA_STATE_COUNT: usize = 56;

const ALL: [LaraStateId; LARA_STATE_COUNT] = {
    use LaraStateId::*;
    [
        WalkForward, RunForward, Stop, JumpForward, Pose, RunBack, TurnRightSlow, TurnLeftSlow, Death, FreeFall,
        Hang, Reach, Unknown12, UnderwaterStop, GrabToFall, JumpPrepare, WalkBackward, UnderwaterForward,
        UnderwaterInertia, Climbing, TurnFast, StepRight, StepLeft, RollBackward, SlideForward, JumpBack,
        JumpRight, JumpLeft, JumpUp, FallBackward, ShimmyLeft, ShimmyRight, SlideBackward, OnWaterStop,
        OnWaterForward, UnderwaterDiving, PushablePush, PushablePull, PushableGrab, PickUp, SwitchDown,
        SwitchUp, InsertKey, InsertPuzzle, WaterDeath, RollForward, BoulderDeath, OnWaterBackward,
        OnWaterLeft, OnWaterRight, UseMidas, MidasDeath, SwandiveBegin, SwandiveEnd, Handstand, OnWaterExit,
    ]
};

impl LaraStateId {
    pub fn from_u16(id: u16) -> Option<Self> {
        ALL.get(id as usize).copied()
    }

    #[inline]
    pub const fn id(self) -> u16 {
        self as u16
    }

    pub fn all() -> &'static [LaraStateId] {
        &ALL
    }
}

impl From<LaraStateId> for u16 {
    fn from(s: LaraStateId) -> u16 {
        s as u16
    }
}
