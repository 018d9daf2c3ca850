use surf_core::cluster::NodeAddr;
use surf_core::wire::{RpcConn, WireError};
use surf_core::{BlockHash, MetaError, ShardId, Version};
use thiserror::Error;

use crate::rpc::{Request, Response};

/// What a metadata call can come back with: a protocol error the caller
/// folds into its next attempt, or a transport-class failure that is
/// terminal for the current command.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Remote(#[from] MetaError),
    #[error(transparent)]
    Transport(#[from] WireError),
}

/// Client for the metadata node. Holds one connection; a command keeps it
/// open across its whole read/retry loop.
pub struct MetaClient {
    conn: RpcConn<Request, Response>,
}

impl MetaClient {
    pub async fn connect(addr: &NodeAddr) -> Result<Self, WireError> {
        Ok(MetaClient {
            conn: RpcConn::connect(addr).await?,
        })
    }

    pub async fn read_file(
        &mut self,
        name: &str,
    ) -> Result<(Version, Vec<(BlockHash, ShardId)>), RpcError> {
        match self
            .conn
            .call(&Request::ReadFile { name: name.into() })
            .await?
        {
            Response::ReadFile { version, placement } => Ok((version, placement)),
            _ => Err(WireError::UnexpectedResponse.into()),
        }
    }

    pub async fn modify_file(
        &mut self,
        name: &str,
        version: Version,
        placement: Vec<(BlockHash, ShardId)>,
    ) -> Result<(), RpcError> {
        match self
            .conn
            .call(&Request::ModifyFile {
                name: name.into(),
                version,
                placement,
            })
            .await?
        {
            Response::ModifyFile(result) => result.map_err(RpcError::Remote),
            _ => Err(WireError::UnexpectedResponse.into()),
        }
    }

    pub async fn delete_file(&mut self, name: &str, version: Version) -> Result<(), RpcError> {
        match self
            .conn
            .call(&Request::DeleteFile {
                name: name.into(),
                version,
            })
            .await?
        {
            Response::DeleteFile(result) => result.map_err(RpcError::Remote),
            _ => Err(WireError::UnexpectedResponse.into()),
        }
    }
}
