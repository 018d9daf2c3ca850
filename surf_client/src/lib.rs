//! Client workflows for SurfStore.
//!
//! [`SurfClient`] drives the three commands against a cluster:
//!
//! - **upload**: chunk the local file, negotiate with the metadata node,
//!   and push only the blocks the cluster does not already hold;
//! - **download**: fetch only the blocks missing from any existing local
//!   copy and reassemble in hashlist order;
//! - **delete**: tombstone the file on the metadata node.
//!
//! Retries are bounded by protocol progress alone: every `WRONG_VERSION`
//! observes a strictly larger version, and every `MISSING_BLOCKS` round
//! strictly shrinks the set of absent blocks, because stored blocks never
//! disappear.

use std::collections::{HashMap, HashSet, hash_map::Entry};
use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use surf_blocks::BlockClient;
use surf_core::cluster::{ClusterSpec, NodeAddr};
use surf_core::{BlockHash, FileBlocks, MetaError, ShardId, split_blocks};
use surf_meta::{MetaClient, RpcError};
use tracing::{debug, info};

pub mod placement;
pub use placement::{LocMethod, ParseLocMethodError, probe_nearest, shard_for};

/// Contractual result of a command: the caller prints `OK` or `Not Found`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    NotFound,
}

pub struct SurfClient {
    cluster: ClusterSpec,
    meta_addr: NodeAddr,
    method: LocMethod,
}

impl SurfClient {
    pub fn new(cluster: ClusterSpec, method: LocMethod) -> anyhow::Result<Self> {
        let meta_addr = cluster
            .metadata_addr()
            .context("client needs the metadata address")?
            .clone();
        anyhow::ensure!(
            !cluster.block_stores.is_empty(),
            "cluster descriptor lists no block stores"
        );
        Ok(SurfClient {
            cluster,
            meta_addr,
            method,
        })
    }

    /// Upload the file at `path` under its final path component.
    pub async fn upload(&self, path: &Path) -> anyhow::Result<Outcome> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Ok(Outcome::NotFound),
        }
        let filename = file_name_of(path)?;

        let mut meta = MetaClient::connect(&self.meta_addr).await?;
        let (current, _) = meta.read_file(filename).await?;

        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file_blocks = split_blocks(&content);

        let nearest = match self.method {
            LocMethod::Hash => None,
            LocMethod::Dist => Some(probe_nearest(&self.cluster).await?),
        };
        let num_shards = self.cluster.num_block_stores();
        let placement: Vec<(BlockHash, ShardId)> = file_blocks
            .hashlist
            .iter()
            .map(|hash| {
                let shard = nearest.unwrap_or_else(|| shard_for(hash, num_shards));
                (*hash, shard)
            })
            .collect();

        let mut version = current + 1;
        loop {
            match meta.modify_file(filename, version, placement.clone()).await {
                Ok(()) => {
                    info!(file = filename, version, "upload accepted");
                    return Ok(Outcome::Ok);
                }
                Err(RpcError::Remote(MetaError::MissingBlocks { missing })) => {
                    debug!(file = filename, count = missing.len(), "pushing missing blocks");
                    self.push_blocks(&missing, &file_blocks).await?;
                }
                Err(RpcError::Remote(MetaError::WrongVersion { current })) => {
                    debug!(file = filename, current, "lost a version race, retrying");
                    version = current + 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Download `filename` into `dest_dir`, reusing any blocks an existing
    /// copy at `dest_dir/filename` already holds.
    pub async fn download(&self, filename: &str, dest_dir: &Path) -> anyhow::Result<Outcome> {
        let mut meta = MetaClient::connect(&self.meta_addr).await?;
        let (_, wanted) = meta.read_file(filename).await?;
        if wanted.is_empty() {
            return Ok(Outcome::NotFound);
        }

        let target = dest_dir.join(filename);
        let have = match tokio::fs::read(&target).await {
            Ok(existing) => split_blocks(&existing).blocks,
            Err(_) => HashMap::new(),
        };

        let plan = fetch_plan(&wanted, &have);
        debug!(
            file = filename,
            total = wanted.len(),
            fetching = plan.len(),
            "assembling download"
        );
        let mut fetched: HashMap<BlockHash, Bytes> = HashMap::new();
        let mut conns: HashMap<ShardId, BlockClient> = HashMap::new();
        for (hash, shard) in plan {
            let conn = self.shard_conn(&mut conns, shard).await?;
            let block = conn
                .get_block(hash)
                .await
                .with_context(|| format!("failed to fetch block {} from shard {shard}", hash.fmt_short()))?;
            fetched.insert(hash, block);
        }

        let mut content = Vec::new();
        for (hash, _) in &wanted {
            let block = have
                .get(hash)
                .or_else(|| fetched.get(hash))
                .with_context(|| format!("block {} neither local nor fetched", hash.fmt_short()))?;
            content.extend_from_slice(block);
        }
        tokio::fs::write(&target, &content)
            .await
            .with_context(|| format!("failed to write {}", target.display()))?;
        info!(file = filename, bytes = content.len(), "download complete");
        Ok(Outcome::Ok)
    }

    /// Tombstone `filename` on the metadata node.
    pub async fn delete(&self, filename: &str) -> anyhow::Result<Outcome> {
        let mut meta = MetaClient::connect(&self.meta_addr).await?;
        let (current, placement) = meta.read_file(filename).await?;
        if current == 0 && placement.is_empty() {
            return Ok(Outcome::NotFound);
        }
        let mut version = current + 1;
        loop {
            match meta.delete_file(filename, version).await {
                Ok(()) => {
                    info!(file = filename, version, "delete accepted");
                    return Ok(Outcome::Ok);
                }
                Err(RpcError::Remote(MetaError::WrongVersion { current })) => {
                    debug!(file = filename, current, "lost a version race, retrying");
                    version = current + 1;
                }
                Err(RpcError::Remote(MetaError::NotFound)) => return Ok(Outcome::NotFound),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Store the listed blocks on their listed shards, one connection per
    /// distinct shard.
    async fn push_blocks(
        &self,
        missing: &[(BlockHash, ShardId)],
        file_blocks: &FileBlocks,
    ) -> anyhow::Result<()> {
        let mut conns: HashMap<ShardId, BlockClient> = HashMap::new();
        for &(hash, shard) in missing {
            let block = file_blocks
                .blocks
                .get(&hash)
                .with_context(|| format!("metadata reported a block we never offered: {hash}"))?;
            let conn = self.shard_conn(&mut conns, shard).await?;
            conn.store_block(hash, block).await?;
        }
        Ok(())
    }

    async fn shard_conn<'c>(
        &self,
        conns: &'c mut HashMap<ShardId, BlockClient>,
        shard: ShardId,
    ) -> anyhow::Result<&'c mut BlockClient> {
        let addr = self
            .cluster
            .block_store(shard)
            .with_context(|| format!("shard {shard} not in cluster descriptor"))?;
        Ok(match conns.entry(shard) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let client = BlockClient::connect(addr)
                    .await
                    .with_context(|| format!("block store {shard} at {addr} unreachable"))?;
                entry.insert(client)
            }
        })
    }
}

/// Which `(hash, shard)` pairs actually need a network fetch: the wanted
/// list minus locally held blocks, each distinct hash at most once.
pub fn fetch_plan(
    wanted: &[(BlockHash, ShardId)],
    have: &HashMap<BlockHash, Bytes>,
) -> Vec<(BlockHash, ShardId)> {
    let mut seen = HashSet::new();
    wanted
        .iter()
        .copied()
        .filter(|(hash, _)| !have.contains_key(hash) && seen.insert(*hash))
        .collect()
}

fn file_name_of(path: &Path) -> anyhow::Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("path {} has no usable file name", path.display()))
}
