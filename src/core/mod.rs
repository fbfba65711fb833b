//! Core primitives.
//!
//! Grid coordinates, injectable randomness and injectable time.
//! Nothing in here knows about the game rules.

pub mod clock;
pub mod position;
pub mod rng;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use position::{Direction, Position};
pub use rng::{DeterministicRng, RandomSource, ScriptedRng};
