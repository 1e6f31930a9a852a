//! Cryptography utilities for Silo

pub mod hash;

pub use hash::*;
