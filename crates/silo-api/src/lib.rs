//! S3 API Server for Silo

pub mod authz;
pub mod janitor;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod xml;

pub use server::S3Server;
