#![allow(dead_code, unused_variables, unused_assignments, unused_mut, unused_doc_comments)]
#![allow(clippy::needless_return, clippy::too_many_arguments, clippy::collapsible_if,
         clippy::collapsible_else_if, clippy::field_reassign_with_default,
         clippy::manual_range_contains, clippy::single_match, clippy::comparison_chain,
         clippy::identity_op, clippy::float_cmp, clippy::needless_range_loop,
         clippy::match_single_binding, clippy::if_same_then_else, clippy::manual_clamp,
         clippy::ptr_arg, clippy::type_complexity)]

pub mod object_state;
pub mod skeleton;
pub mod lara;
pub mod objects;
pub mod triggers;
pub mod effects;
pub mod audio_engine;
pub mod camera;
pub mod particles;
pub mod player;
pub mod world;
pub mod save;

#[cfg(test)]
pub(crate) mod testlevel;
