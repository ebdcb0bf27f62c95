//! Low-level DSP behind the click renderer.

/// Topology-preserving state-variable filter.
pub mod filter;
/// Sample-by-sample rendering of a click spec.
pub mod voice;
