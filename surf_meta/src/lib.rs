//! The metadata service: the single authoritative node mapping filenames
//! to versioned, ordered block hashlists, plus the global record of which
//! block-store shard holds each block.
//!
//! All metadata is memory-resident; a restart loses it. The metadata node
//! is the serialization point for file mutations: `modify_file` and
//! `delete_file` enforce that versions advance by exactly one, and
//! `modify_file` only commits once every referenced block is present on
//! its assigned shard.

pub mod rpc;

mod client;
pub use client::{MetaClient, RpcError};

mod server;
pub use server::MetadataStore;
