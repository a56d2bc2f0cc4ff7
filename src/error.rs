// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io;
use std::sync::Arc;

use crate::eiff::Tag;

/// Error conditions which may occur when importing packages or decoding their blocks.
///
/// All of them are fatal for the operation which raised them: a failed [import](crate::Graph::import_file)
/// leaves the graph unchanged, and a block which failed to decode is never cached.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] Arc<io::Error>),

    #[error("not an EIFF form: got tag {0}")]
    BadMagic(Tag),

    #[error("chunk {tag} at offset {offset} is truncated")]
    TruncatedChunk { tag: Tag, offset: u64 },

    #[error("read of {len} bytes at offset {offset} overruns chunk {tag} ({size} bytes)")]
    ChunkOverrun {
        tag: Tag,
        offset: u64,
        len: u64,
        size: u64,
    },

    #[error("graph missing section {0}")]
    MissingSection(Tag),

    #[error("unsupported graph version: got {got}, expected {expected}")]
    UnsupportedVersion { got: u32, expected: u32 },

    #[error("bitstream exhausted: wanted {wanted} bits at bit {position} of {available}")]
    EndOfStream {
        wanted: u32,
        position: usize,
        available: usize,
    },

    #[error("invalid bit width {bits} for a {max}-bit field")]
    InvalidBitWidth { bits: u32, max: u32 },

    #[error("section {tag}: bad offsets for block {block}: [{start}, {end})")]
    BadBlockOffsets {
        tag: Tag,
        block: u32,
        start: u64,
        end: u64,
    },

    #[error("node block {block} is corrupted: nodes claim {claimed} edges, block has {actual}")]
    EdgeCountMismatch {
        block: crate::BlockId,
        claimed: usize,
        actual: usize,
    },

    #[error("{what} {index} out of range (have {len})")]
    OutOfRange {
        what: &'static str,
        index: u64,
        len: u64,
    },

    #[error("block {block}: relative {what} reference underflows")]
    BadReference {
        block: crate::BlockId,
        what: &'static str,
    },
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl Error {
    pub(crate) fn out_of_range(what: &'static str, index: impl Into<u64>, len: usize) -> Self {
        Error::OutOfRange {
            what,
            index: index.into(),
            len: len as u64,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
