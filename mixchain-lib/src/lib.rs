//! # Mixchain Library
//!
//! Post-decode mixing for multichannel PCM streams. A stream owns one
//! [`mixing::MixingState`], fills it with commands during configuration,
//! activates it once the host knows its block size, and then runs
//! [`mixing::MixingState::mix`] over every decoded block.

pub mod diagnostics;
pub mod dsp;
pub mod mixing;
pub mod settings;
pub mod stream;
