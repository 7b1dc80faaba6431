//! Port implementations.
//!
//! `live` holds the adapters used at runtime: system clock, disk, random ids,
//! and the Discord REST API.

pub mod live;
