//! Key/value storage abstractions
//!
//! Profiles, cached artifacts, voice sessions and activity logs all live in a
//! single TTL-capable string store. The production backing store is an
//! external collaborator; this module defines its contract and ships an
//! in-memory implementation for development, tests and single-instance use.
//!
//! ## Available Backends
//!
//! - `memory`: concurrent in-memory map with per-entry expiry (default)

mod memory;
mod traits;

pub use memory::InMemoryKeyValueStore;
pub use traits::KeyValueStore;
