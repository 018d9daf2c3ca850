//! Protocol errors returned by the metadata node.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ShardId, Version, hash::BlockHash};

/// The errors `modify_file` and `delete_file` can return.
///
/// `WrongVersion` and `MissingBlocks` are recoverable by protocol: the
/// client folds their payloads into the next attempt. `NotFound` is
/// terminal for deletes and never arises for modifies (absent files are
/// created at version 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum MetaError {
    #[error("wrong version, current version is {current}")]
    WrongVersion { current: Version },
    #[error("{} referenced block(s) not yet on their block stores", missing.len())]
    MissingBlocks { missing: Vec<(BlockHash, ShardId)> },
    #[error("file not found")]
    NotFound,
}
