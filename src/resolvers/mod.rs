//! Resolvers: one per concern the compose and cluster models disagree on.
//!
//! Each resolver:
//! 1. Reads a slice of a service declaration (or the top-level descriptor)
//! 2. Produces the matching IR fragment
//! 3. Records anything it had to skip or rewrite in a `Diagnostics` sink

pub mod health;
pub mod network;
pub mod resources;
pub mod storage;
