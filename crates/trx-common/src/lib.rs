#![allow(dead_code)]
#![allow(clippy::too_many_arguments, clippy::collapsible_if, clippy::collapsible_else_if,
         clippy::field_reassign_with_default, clippy::manual_range_contains,
         clippy::comparison_chain, clippy::new_without_default)]

pub mod units;
pub mod error;
pub mod floordata;
pub mod room;
pub mod location;
pub mod height;
pub mod collision;
pub mod animation;
pub mod level;
pub mod audio;
pub mod input;
pub mod cvar;
