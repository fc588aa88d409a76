// anim_ids.rs — Avatar animations the state handlers switch to directly

pub const STOP_HANG: usize = 28;
pub const FREE_FALL_LAND: usize = 31;
pub const SMASH_JUMP: usize = 32;
pub const FREE_FALL_FORWARD: usize = 34;
pub const STAY_SOLID: usize = 11;
pub const VAULT34: usize = 42;
pub const VAULT12: usize = 50;
pub const WALL_SMASH_LEFT: usize = 53;
pub const WALL_SMASH_RIGHT: usize = 54;
pub const RUN_UP_STEP_RIGHT: usize = 55;
pub const RUN_UP_STEP_LEFT: usize = 56;
pub const WALK_UP_STEP_RIGHT: usize = 57;
pub const WALK_UP_STEP_LEFT: usize = 58;
pub const WALK_DOWN_LEFT: usize = 59;
pub const WALK_DOWN_RIGHT: usize = 60;
pub const WALK_DOWN_BACK_LEFT: usize = 61;
pub const WALK_DOWN_BACK_RIGHT: usize = 62;
pub const SLIDE: usize = 70;
pub const FREE_FALL_BACK: usize = 93;
pub const HANG: usize = 96;
pub const SLIDE_BACK: usize = 104;
pub const CLIMB_OUT_OF_WATER: usize = 111;
pub const FREE_FALL_TO_UNDERWATER: usize = 112;
pub const UNDERWATER_TO_ONWATER: usize = 114;
pub const FREE_FALL_TO_UNDERWATER_ALTERNATE: usize = 119;
pub const ROLL_BEGIN: usize = 146;
pub const BOULDER_DEATH: usize = 139;
