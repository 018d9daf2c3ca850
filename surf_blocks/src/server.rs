use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use surf_core::BlockHash;
use surf_core::wire::Handler;
use tracing::debug;

use crate::rpc::{Request, Response};

/// In-memory block store: an immutable mapping from hash to bytes.
///
/// Entries are write-once by content-equivalence (re-storing a hash keeps
/// the existing bytes) and are never removed. Per-key operations are
/// linearizable through the underlying concurrent map.
#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: DashMap<BlockHash, Bytes>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, hash: BlockHash, block: Bytes) {
        self.blocks.entry(hash).or_insert(block);
    }

    pub fn get(&self, hash: &BlockHash) -> Option<Bytes> {
        self.blocks.get(hash).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Number of distinct blocks held.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[async_trait]
impl Handler for BlockStore {
    type Request = Request;
    type Response = Response;

    async fn handle(&self, request: Request) -> Result<Response, String> {
        Ok(match request {
            Request::StoreBlock { hash, block } => {
                debug!(hash = %hash.fmt_short(), len = block.len(), "storing block");
                self.put(hash, Bytes::from(block));
                Response::StoreBlock
            }
            Request::GetBlock { hash } => {
                let block = self.get(&hash);
                debug!(hash = %hash.fmt_short(), found = block.is_some(), "serving block");
                Response::GetBlock(block.map(|bytes| bytes.to_vec()))
            }
            Request::HasBlock { hash } => {
                let present = self.contains(&hash);
                debug!(hash = %hash.fmt_short(), present, "presence query");
                Response::HasBlock(present)
            }
            Request::Ping => Response::Pong,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_write_once() {
        let store = BlockStore::new();
        let hash = BlockHash::of(b"data");
        store.put(hash, Bytes::from_static(b"data"));
        store.put(hash, Bytes::from_static(b"data"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&hash), Some(Bytes::from_static(b"data")));
    }

    #[test]
    fn get_of_unknown_hash_is_none() {
        let store = BlockStore::new();
        assert!(store.is_empty());
        assert!(!store.contains(&BlockHash::of(b"nope")));
        assert_eq!(store.get(&BlockHash::of(b"nope")), None);
    }
}
