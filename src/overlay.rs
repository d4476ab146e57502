//! Symlink-based union of several directory trees.
//!
//! No union filesystem is mounted. Instead the destination directory becomes a
//! tree of symbolic links where every relative path found in any source is
//! represented exactly once, pointing into a private subtree (`/__root`) under
//! which the sandbox exposes the untouched host root. Because the destination
//! only ever holds links and the directories containing them, removing it can
//! never touch real file content.

mod builder;
mod gateway;

pub use builder::{
    BuildReport, OverlayBuilder, OverlayLayout, PRIVATE_ROOT_NAME, build_overlay, relative_of,
};
pub use gateway::{Action, Gateway, GatewayOptions, Mode, Prompt};
