//! The cluster descriptor: which hosts run the metadata node and the
//! block-store shards.
//!
//! Line-oriented `key: value` text, one entry per line:
//!
//! ```text
//! B: 2
//! metadata: localhost:6000
//! block0: localhost:5000
//! block1: localhost:5001
//! ```
//!
//! Line order is not significant and blank lines are ignored. The
//! `metadata:` line is optional for consumers that do not dial the
//! metadata node.

use std::{collections::BTreeMap, fmt, io, path::Path, str::FromStr};

use thiserror::Error;

use crate::ShardId;

/// A dialable `host:port` pair from the cluster descriptor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

impl NodeAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        NodeAddr {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid node address {0:?}, expected host:port")]
pub struct ParseAddrError(pub String);

impl FromStr for NodeAddr {
    type Err = ParseAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s.rsplit_once(':').ok_or_else(|| ParseAddrError(s.into()))?;
        if host.is_empty() {
            return Err(ParseAddrError(s.into()));
        }
        let port = port.parse().map_err(|_| ParseAddrError(s.into()))?;
        Ok(NodeAddr::new(host, port))
    }
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("failed to read cluster file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed cluster descriptor line {line:?}")]
    Malformed { line: String },
    #[error("cluster descriptor has no 'B:' block-store count")]
    MissingCount,
    #[error("block store {index} listed more than once")]
    DuplicateShard { index: ShardId },
    #[error("block store {index} missing from cluster descriptor")]
    MissingShard { index: ShardId },
    #[error("block store {index} out of range for declared count {count}")]
    ShardOutOfRange { index: ShardId, count: ShardId },
    #[error("cluster descriptor has no 'metadata:' address")]
    NoMetadata,
}

/// Parsed cluster descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub metadata: Option<NodeAddr>,
    /// Block-store addresses indexed by shard id.
    pub block_stores: Vec<NodeAddr>,
}

impl ClusterSpec {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ClusterError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ClusterError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(input: &str) -> Result<Self, ClusterError> {
        let malformed = |line: &str| ClusterError::Malformed { line: line.into() };

        let mut declared: Option<ShardId> = None;
        let mut metadata = None;
        let mut stores: BTreeMap<ShardId, NodeAddr> = BTreeMap::new();

        for raw in input.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| malformed(line))?;
            let (key, value) = (key.trim(), value.trim());
            match key {
                "B" => {
                    declared = Some(value.parse().map_err(|_| malformed(line))?);
                }
                "metadata" => {
                    metadata = Some(value.parse().map_err(|_| malformed(line))?);
                }
                _ => {
                    let index = key
                        .strip_prefix("block")
                        .and_then(|idx| idx.parse::<ShardId>().ok())
                        .ok_or_else(|| malformed(line))?;
                    let addr = value.parse().map_err(|_| malformed(line))?;
                    if stores.insert(index, addr).is_some() {
                        return Err(ClusterError::DuplicateShard { index });
                    }
                }
            }
        }

        let count = declared.ok_or(ClusterError::MissingCount)?;
        let mut block_stores = Vec::with_capacity(count as usize);
        for index in 0..count {
            let addr = stores
                .remove(&index)
                .ok_or(ClusterError::MissingShard { index })?;
            block_stores.push(addr);
        }
        if let Some((&index, _)) = stores.iter().next() {
            return Err(ClusterError::ShardOutOfRange { index, count });
        }

        Ok(ClusterSpec {
            metadata,
            block_stores,
        })
    }

    /// Number of block-store shards in the cluster.
    pub fn num_block_stores(&self) -> ShardId {
        self.block_stores.len() as ShardId
    }

    pub fn block_store(&self, shard: ShardId) -> Option<&NodeAddr> {
        self.block_stores.get(shard as usize)
    }

    /// The metadata node address, required by everything that dials it.
    pub fn metadata_addr(&self) -> Result<&NodeAddr, ClusterError> {
        self.metadata.as_ref().ok_or(ClusterError::NoMetadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_descriptor() {
        let spec = ClusterSpec::parse(
            "B: 2\nmetadata: localhost:6000\nblock0: localhost:5000\nblock1: otherhost:5001\n",
        )
        .unwrap();
        assert_eq!(spec.num_block_stores(), 2);
        assert_eq!(spec.metadata_addr().unwrap(), &NodeAddr::new("localhost", 6000));
        assert_eq!(spec.block_store(1), Some(&NodeAddr::new("otherhost", 5001)));
        assert_eq!(spec.block_store(2), None);
    }

    #[test]
    fn line_order_and_blank_lines_do_not_matter() {
        let spec = ClusterSpec::parse(
            "\nblock1: h:2\n\nB: 2\nblock0: h:1\n\nmetadata: m:3\n",
        )
        .unwrap();
        assert_eq!(spec.block_stores[0], NodeAddr::new("h", 1));
        assert_eq!(spec.block_stores[1], NodeAddr::new("h", 2));
    }

    #[test]
    fn metadata_line_is_optional() {
        let spec = ClusterSpec::parse("B: 1\nblock0: h:1\n").unwrap();
        assert!(spec.metadata.is_none());
        assert!(matches!(
            spec.metadata_addr(),
            Err(ClusterError::NoMetadata)
        ));
    }

    #[test]
    fn count_must_match_block_lines() {
        assert!(matches!(
            ClusterSpec::parse("B: 2\nblock0: h:1\n"),
            Err(ClusterError::MissingShard { index: 1 })
        ));
        assert!(matches!(
            ClusterSpec::parse("B: 1\nblock0: h:1\nblock1: h:2\n"),
            Err(ClusterError::ShardOutOfRange { index: 1, count: 1 })
        ));
        assert!(matches!(
            ClusterSpec::parse("block0: h:1\n"),
            Err(ClusterError::MissingCount)
        ));
    }

    #[test]
    fn rejects_junk() {
        assert!(matches!(
            ClusterSpec::parse("B: 1\nnonsense\nblock0: h:1\n"),
            Err(ClusterError::Malformed { .. })
        ));
        assert!(matches!(
            ClusterSpec::parse("B: 1\nblock0: h:notaport\n"),
            Err(ClusterError::Malformed { .. })
        ));
    }
}
