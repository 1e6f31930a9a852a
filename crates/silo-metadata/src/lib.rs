//! Metadata storage for Silo
//!
//! SQLite-backed store for buckets, objects, versions, multipart uploads,
//! tags, ACLs, and bucket policies.

pub mod repository;

pub use repository::MetadataStore;
