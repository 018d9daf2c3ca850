use bytes::Bytes;
use surf_core::BlockHash;
use surf_core::cluster::NodeAddr;
use surf_core::wire::{RpcConn, WireError};
use thiserror::Error;

use crate::rpc::{Request, Response};

#[derive(Debug, Error)]
pub enum BlockError {
    /// The store does not hold this block. A correct client never sees
    /// this for hashes reported by the metadata node; its occurrence
    /// indicates a store/metadata inconsistency and is terminal.
    #[error("block {0} not present on its block store")]
    NotPresent(BlockHash),
    #[error(transparent)]
    Transport(#[from] WireError),
}

/// Client for one block-store shard.
pub struct BlockClient {
    conn: RpcConn<Request, Response>,
}

impl BlockClient {
    pub async fn connect(addr: &NodeAddr) -> Result<Self, WireError> {
        Ok(BlockClient {
            conn: RpcConn::connect(addr).await?,
        })
    }

    pub async fn store_block(&mut self, hash: BlockHash, block: &[u8]) -> Result<(), BlockError> {
        match self
            .conn
            .call(&Request::StoreBlock {
                hash,
                block: block.to_vec(),
            })
            .await?
        {
            Response::StoreBlock => Ok(()),
            _ => Err(WireError::UnexpectedResponse.into()),
        }
    }

    pub async fn get_block(&mut self, hash: BlockHash) -> Result<Bytes, BlockError> {
        match self.conn.call(&Request::GetBlock { hash }).await? {
            Response::GetBlock(Some(block)) => Ok(Bytes::from(block)),
            Response::GetBlock(None) => Err(BlockError::NotPresent(hash)),
            _ => Err(WireError::UnexpectedResponse.into()),
        }
    }

    pub async fn has_block(&mut self, hash: BlockHash) -> Result<bool, BlockError> {
        match self.conn.call(&Request::HasBlock { hash }).await? {
            Response::HasBlock(present) => Ok(present),
            _ => Err(WireError::UnexpectedResponse.into()),
        }
    }

    pub async fn ping(&mut self) -> Result<(), BlockError> {
        match self.conn.call(&Request::Ping).await? {
            Response::Pong => Ok(()),
            _ => Err(WireError::UnexpectedResponse.into()),
        }
    }
}
