//! Fixed-size block chunking of file contents.

use std::collections::HashMap;

use bytes::Bytes;

use crate::hash::BlockHash;

/// Maximum block size in bytes. The last block of a file may be shorter.
pub const BLOCK_SIZE: usize = 4096;

/// The blocks of one file: the ordered hashlist that defines its content,
/// plus the deduplicated bytes per hash.
#[derive(Debug, Clone, Default)]
pub struct FileBlocks {
    /// Block hashes in file order. May contain duplicates if the file
    /// repeats a block.
    pub hashlist: Vec<BlockHash>,
    /// Bytes per distinct hash.
    pub blocks: HashMap<BlockHash, Bytes>,
}

/// Split content into [`BLOCK_SIZE`] blocks and hash each one.
///
/// Empty content yields an empty hashlist.
pub fn split_blocks(content: &[u8]) -> FileBlocks {
    let mut file_blocks = FileBlocks::default();
    for chunk in content.chunks(BLOCK_SIZE) {
        let hash = BlockHash::of(chunk);
        file_blocks.hashlist.push(hash);
        file_blocks
            .blocks
            .entry(hash)
            .or_insert_with(|| Bytes::copy_from_slice(chunk));
    }
    file_blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_has_no_blocks() {
        let blocks = split_blocks(b"");
        assert!(blocks.hashlist.is_empty());
        assert!(blocks.blocks.is_empty());
    }

    #[test]
    fn short_file_is_one_block() {
        let blocks = split_blocks(b"hello");
        assert_eq!(blocks.hashlist, vec![BlockHash::of(b"hello")]);
        assert_eq!(blocks.blocks[&blocks.hashlist[0]], Bytes::from_static(b"hello"));
    }

    #[test]
    fn exact_multiple_has_no_tail_block() {
        let content = vec![7u8; BLOCK_SIZE * 3];
        let blocks = split_blocks(&content);
        assert_eq!(blocks.hashlist.len(), 3);
        // all three blocks identical, so only one distinct hash
        assert_eq!(blocks.blocks.len(), 1);
        assert_eq!(blocks.blocks[&blocks.hashlist[0]].len(), BLOCK_SIZE);
    }

    #[test]
    fn tail_block_keeps_remainder() {
        let content = vec![1u8; BLOCK_SIZE + 10];
        let blocks = split_blocks(&content);
        assert_eq!(blocks.hashlist.len(), 2);
        assert_eq!(blocks.blocks[&blocks.hashlist[1]].len(), 10);
        assert_ne!(blocks.hashlist[0], blocks.hashlist[1]);
    }
}
