//! Wire messages of the block-store service.

use serde::{Deserialize, Serialize};
use surf_core::BlockHash;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Store a block under its hash. The caller is trusted to have hashed
    /// the bytes correctly; the store does not re-verify.
    StoreBlock { hash: BlockHash, block: Vec<u8> },
    /// Fetch the bytes of a block.
    GetBlock { hash: BlockHash },
    /// Presence check without transferring the bytes.
    HasBlock { hash: BlockHash },
    /// Round-trip probe used for shard selection.
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    StoreBlock,
    /// `None` if the hash is unknown to this store.
    GetBlock(Option<Vec<u8>>),
    HasBlock(bool),
    Pong,
}
