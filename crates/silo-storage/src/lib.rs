//! Filesystem-backed blob storage for Silo.
//!
//! This crate owns bytes, never facts: it has no notion of buckets owning
//! objects or of which version is current. The storage engine composes
//! with `silo-metadata` at the route layer, which enforces that a committed
//! object row exists if and only if its blob exists here.

pub mod engine;

pub use engine::{LocalStorage, StorageEngine};
