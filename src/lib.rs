//! Ardysa - modspack installation doctor for Dota 2
//!
//! Checks whether the modspack is installed, patched for the running game
//! build, and wired into the game's config, and explains what is wrong if not.

pub mod games;
pub mod settings;
pub mod status;
pub mod verify;
pub mod version;
