//! DSP primitives used by the mixing engine.

pub mod fade;
