//! Adapters that talk to the real world: disk, wall clock, and the platform API.

pub mod filesystem;
pub mod platform;
pub mod system;
