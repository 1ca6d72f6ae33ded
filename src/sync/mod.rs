//! Timing primitives for background cache maintenance

pub mod timer;

pub use timer::TrimTimer;
