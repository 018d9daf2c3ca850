//! Wire messages of the metadata service.

use serde::{Deserialize, Serialize};
use surf_core::{BlockHash, MetaError, ShardId, Version};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Current version and `(hash, shard)` list of a file. Never fails;
    /// unknown files read as version 0 with an empty list.
    ReadFile { name: String },
    /// Replace a file's content with the given placement list, at exactly
    /// one version past the current one.
    ModifyFile {
        name: String,
        version: Version,
        placement: Vec<(BlockHash, ShardId)>,
    },
    /// Tombstone a file, at exactly one version past the current one.
    DeleteFile { name: String, version: Version },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    ReadFile {
        version: Version,
        placement: Vec<(BlockHash, ShardId)>,
    },
    ModifyFile(Result<(), MetaError>),
    DeleteFile(Result<(), MetaError>),
}
