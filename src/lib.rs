//! Deterministic simulation core for PacSnake: Pac-Man style maze chase where
//! the player also leaves a fading trail that is lethal to cross.
//!
//! The crate owns no I/O. A host feeds directional intents into
//! [`engine::GameEngine`], drives it with fixed-rate `step()` calls, and reads
//! a serializable [`types::Snapshot`] back at each tick boundary.

pub mod constants;
pub mod engine;
pub mod grid;
pub mod rng;
pub mod types;
