//! Shared helpers.

pub mod sites;
pub mod timestamp;

pub use timestamp::TimeInstant;
