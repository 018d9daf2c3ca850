//! Shard-selection policies for uploads.
//!
//! Whatever the policy picks, the metadata node records the shard per
//! hash, and downloads always follow that record; the policies only have
//! to agree on where *new* blocks go.

use std::str::FromStr;

use anyhow::Context;
use surf_blocks::BlockClient;
use surf_core::cluster::ClusterSpec;
use surf_core::{BlockHash, ShardId};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// How the client picks a shard for the blocks it uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocMethod {
    /// Hash of the block mod shard count. Deterministic: every client
    /// routes the same bytes to the same shard.
    Hash,
    /// RTT-probe all block stores once per upload and send every block of
    /// that upload to the nearest one.
    Dist,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid block-locating method {0:?}, expected \"hash\" or \"dist\"")]
pub struct ParseLocMethodError(pub String);

impl FromStr for LocMethod {
    type Err = ParseLocMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" => Ok(LocMethod::Hash),
            "dist" => Ok(LocMethod::Dist),
            other => Err(ParseLocMethodError(other.into())),
        }
    }
}

/// The digest interpreted as a 256-bit big-endian integer, mod the shard
/// count. Computed by folding one byte at a time, so no bignum is needed.
pub fn shard_for(hash: &BlockHash, num_shards: ShardId) -> ShardId {
    let modulus = num_shards as u64;
    let mut acc = 0u64;
    for &byte in hash.as_bytes() {
        acc = ((acc << 8) | byte as u64) % modulus;
    }
    acc as ShardId
}

/// Ping every block store once and return the shard with the smallest
/// round trip. Probes are sequential; ties keep the earlier shard.
pub async fn probe_nearest(cluster: &ClusterSpec) -> anyhow::Result<ShardId> {
    let mut nearest = None;
    for (index, addr) in cluster.block_stores.iter().enumerate() {
        let shard = index as ShardId;
        let mut client = BlockClient::connect(addr)
            .await
            .with_context(|| format!("block store {shard} at {addr} unreachable"))?;
        let start = Instant::now();
        client
            .ping()
            .await
            .with_context(|| format!("ping to block store {shard} failed"))?;
        let rtt = start.elapsed();
        debug!(shard, ?rtt, "probed block store");
        if nearest.is_none_or(|(best, _)| rtt < best) {
            nearest = Some((rtt, shard));
        }
    }
    nearest
        .map(|(_, shard)| shard)
        .context("cluster descriptor lists no block stores")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loc_method_parsing() {
        assert_eq!("hash".parse(), Ok(LocMethod::Hash));
        assert_eq!("dist".parse(), Ok(LocMethod::Dist));
        assert_eq!(
            "nearest".parse::<LocMethod>(),
            Err(ParseLocMethodError("nearest".into()))
        );
    }

    #[test]
    fn shard_for_matches_big_integer_mod() {
        // 0x01 followed by 31 zero bytes is 2^248; 2^248 mod 10 == 6
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        assert_eq!(shard_for(&BlockHash::from_bytes(bytes), 10), 6);

        // low byte only: value is the byte itself
        let mut bytes = [0u8; 32];
        bytes[31] = 0x2a;
        assert_eq!(shard_for(&BlockHash::from_bytes(bytes), 100), 42);
    }

    #[test]
    fn shard_for_is_always_in_range() {
        for i in 0..64u8 {
            let hash = BlockHash::of([i]);
            for n in 1..7 {
                assert!(shard_for(&hash, n) < n);
            }
        }
    }

    #[test]
    fn single_shard_gets_everything() {
        assert_eq!(shard_for(&BlockHash::of(b"anything"), 1), 0);
    }
}
