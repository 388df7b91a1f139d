//! Channel mixing driven by an ordered command chain.
//!
//! A stream owns one [`MixingState`]. During configuration, primitive
//! commands (`push_*`) and macros (`macro_*`) append to its chain and keep
//! track of how the channel count changes. [`MixingState::activate`] sizes
//! the working buffer and freezes the chain; [`MixingState::mix`] then runs
//! the chain over each decoded block in place.

mod builder;
pub mod chain;
pub mod command;
mod engine;
mod error;
mod macros;
mod state;

pub use chain::{MixChain, MAX_MIXES};
pub use command::{ChannelTarget, MixCommand};
pub use error::MixError;
pub use macros::LayerMode;
pub use state::MixingState;

/// Widest a frame may get while mixing.
pub const MAX_CHANNELS: usize = 64;
