//! Core types for Silo

mod acl;
mod bucket;
mod common;
mod lifecycle;
mod object;
mod policy;
mod presigned;
mod user;

// Re-export everything except modules with duplicates
pub use acl::*;
pub use bucket::*;
pub use common::*;
pub use lifecycle::*;
pub use object::*;
pub use policy::*;
pub use presigned::*;

// Re-export from user (except Owner which conflicts with acl)
pub use user::User;
