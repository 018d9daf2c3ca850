use std::collections::{HashMap, hash_map::Entry};

use anyhow::Context;
use async_trait::async_trait;
use surf_blocks::BlockClient;
use surf_core::cluster::ClusterSpec;
use surf_core::wire::Handler;
use surf_core::{BlockHash, MetaError, ShardId, Version};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::rpc::{Request, Response};

#[derive(Debug, Clone, Default)]
struct FileRecord {
    version: Version,
    /// Empty for tombstoned files.
    hashlist: Vec<BlockHash>,
}

#[derive(Default)]
struct State {
    files: HashMap<String, FileRecord>,
    /// Which shard holds each block, global across files. A hash has one
    /// canonical shard; a later accepted modify may move it.
    placement: HashMap<BlockHash, ShardId>,
}

/// The single authoritative metadata node.
///
/// One mutex guards all three maps; mutations on any file serialize
/// through it, including the block-presence probes of `modify_file`, so
/// no writer can advance a version between the probe phase and commit.
pub struct MetadataStore {
    cluster: ClusterSpec,
    state: Mutex<State>,
}

impl MetadataStore {
    pub fn new(cluster: ClusterSpec) -> Self {
        MetadataStore {
            cluster,
            state: Mutex::new(State::default()),
        }
    }

    /// Current `(version, [(hash, shard)])` of a file. Never fails:
    /// unknown files are `(0, [])`, tombstoned files `(version, [])`.
    pub async fn read_file(&self, name: &str) -> (Version, Vec<(BlockHash, ShardId)>) {
        let state = self.state.lock().await;
        let Some(record) = state.files.get(name) else {
            debug!(file = name, "read of unknown file");
            return (0, Vec::new());
        };
        let placement = record
            .hashlist
            .iter()
            .map(|hash| {
                // every committed hash has a placement entry
                let shard = state.placement.get(hash).copied().unwrap_or_default();
                (*hash, shard)
            })
            .collect();
        debug!(file = name, version = record.version, "read");
        (record.version, placement)
    }

    /// Replace the content of `name` with `placement`, which must carry
    /// version exactly one past the current one and reference only blocks
    /// already present on their assigned shards.
    ///
    /// The outer error is a fault talking to a block store and is terminal
    /// for the caller; the inner error is a protocol error the client
    /// resolves by retrying.
    pub async fn modify_file(
        &self,
        name: &str,
        version: Version,
        placement: &[(BlockHash, ShardId)],
    ) -> anyhow::Result<Result<(), MetaError>> {
        let mut state = self.state.lock().await;

        // version check strictly first: a stale writer must not trigger
        // presence probes for its obsolete view
        let current = state.files.get(name).map(|r| r.version).unwrap_or(0);
        if version != current + 1 {
            debug!(file = name, version, current, "modify rejected, wrong version");
            return Ok(Err(MetaError::WrongVersion { current }));
        }

        let missing = self.missing_blocks(placement).await?;
        if !missing.is_empty() {
            debug!(
                file = name,
                missing = missing.len(),
                "modify rejected, blocks not yet stored"
            );
            return Ok(Err(MetaError::MissingBlocks { missing }));
        }

        for &(hash, shard) in placement {
            state.placement.insert(hash, shard);
        }
        let record = state.files.entry(name.to_string()).or_default();
        record.version = version;
        record.hashlist = placement.iter().map(|(hash, _)| *hash).collect();
        info!(file = name, version, blocks = placement.len(), "modify accepted");
        Ok(Ok(()))
    }

    /// Tombstone `name` at `version`, which must be exactly one past the
    /// current one. The hashlist empties; placement entries survive, other
    /// files may still reference those blocks.
    pub async fn delete_file(&self, name: &str, version: Version) -> Result<(), MetaError> {
        let mut state = self.state.lock().await;
        let Some(record) = state.files.get_mut(name) else {
            debug!(file = name, "delete of unknown file");
            return Err(MetaError::NotFound);
        };
        if version != record.version + 1 {
            debug!(
                file = name,
                version,
                current = record.version,
                "delete rejected, wrong version"
            );
            return Err(MetaError::WrongVersion {
                current: record.version,
            });
        }
        record.version = version;
        record.hashlist.clear();
        info!(file = name, version, "delete accepted");
        Ok(())
    }

    /// Probe every `(hash, shard)` pair on its assigned block store and
    /// collect the pairs that are not yet present, in submission order.
    async fn missing_blocks(
        &self,
        placement: &[(BlockHash, ShardId)],
    ) -> anyhow::Result<Vec<(BlockHash, ShardId)>> {
        let mut conns: HashMap<ShardId, BlockClient> = HashMap::new();
        let mut missing = Vec::new();
        for &(hash, shard) in placement {
            let addr = self
                .cluster
                .block_store(shard)
                .with_context(|| format!("shard {shard} not in cluster descriptor"))?;
            let conn = match conns.entry(shard) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let client = BlockClient::connect(addr)
                        .await
                        .with_context(|| format!("block store {shard} at {addr} unreachable"))?;
                    entry.insert(client)
                }
            };
            let present = conn
                .has_block(hash)
                .await
                .with_context(|| format!("presence query on block store {shard} failed"))?;
            if !present {
                missing.push((hash, shard));
            }
        }
        Ok(missing)
    }
}

#[async_trait]
impl Handler for MetadataStore {
    type Request = Request;
    type Response = Response;

    async fn handle(&self, request: Request) -> Result<Response, String> {
        match request {
            Request::ReadFile { name } => {
                let (version, placement) = self.read_file(&name).await;
                Ok(Response::ReadFile { version, placement })
            }
            Request::ModifyFile {
                name,
                version,
                placement,
            } => {
                let result = self
                    .modify_file(&name, version, &placement)
                    .await
                    .map_err(|err| format!("{err:#}"))?;
                Ok(Response::ModifyFile(result))
            }
            Request::DeleteFile { name, version } => {
                Ok(Response::DeleteFile(self.delete_file(&name, version).await))
            }
        }
    }
}
