// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Reader for EIFF containers: IFF-style files made of tagged, length-prefixed chunks.
//!
//! Every chunk starts with a 12-byte header: a 4-byte [Tag] and a little-endian `u64`
//! payload length. A chunk tagged `FORM` is a container, whose payload starts with
//! a 4-byte form type followed by a sequence of nested chunks. Any other chunk is
//! a [DataChunk] holding opaque bytes.
//!
//! Only chunk headers are read when a [Form] is opened; payloads are fetched
//! on demand with [DataChunk::read], which allows partial loads of huge files.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Size of a chunk header: tag + payload length.
const CHUNK_HEADER_SIZE: u64 = 12;

/// Four-byte chunk identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const FORM: Tag = Tag(*b"FORM");
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

/// Byte-addressable, random-access data source.
///
/// Implementations must be usable from multiple threads;
/// [read_at](Source::read_at) takes `&self`.
pub trait Source: Send + Sync {
    /// Returns the total number of bytes available.
    fn len(&self) -> io::Result<u64>;

    /// Fills the whole `buf` with bytes starting at `offset`.
    /// Reads past the end must fail with [io::ErrorKind::UnexpectedEof].
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

impl Source for Vec<u8> {
    fn len(&self) -> io::Result<u64> {
        Ok(self.as_slice().len() as u64)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let data = self.as_slice();
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        match start.checked_add(buf.len()) {
            Some(end) if end <= data.len() => {
                buf.copy_from_slice(&data[start..end]);
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read of {} bytes at {} past end of buffer", buf.len(), offset),
            )),
        }
    }
}

/// [Source] backed by a file on disk.
///
/// Positioned reads seek a shared file handle, so concurrent reads are serialized.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl Source for FileSource {
    fn len(&self) -> io::Result<u64> {
        Ok(self.len)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

/// Handle to the payload of a single data chunk.
///
/// Cloning a handle is cheap; all clones share the underlying [Source].
#[derive(Clone)]
pub struct DataChunk {
    source: Arc<dyn Source>,
    tag: Tag,
    offset: u64,
    size: u64,
}

impl DataChunk {
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the payload size, in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Fills `buf` with payload bytes starting at `offset` (relative to the payload start).
    pub fn read(&self, buf: &mut [u8], offset: u64) -> Result<()> {
        let len = buf.len() as u64;
        match offset.checked_add(len) {
            Some(end) if end <= self.size => {}
            _ => {
                return Err(Error::ChunkOverrun {
                    tag: self.tag,
                    offset,
                    len,
                    size: self.size,
                })
            }
        }
        self.source.read_at(self.offset + offset, buf)?;
        Ok(())
    }

    /// Reads `len` payload bytes starting at `offset` into a new buffer.
    pub fn read_vec(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        if offset.saturating_add(len) > self.size {
            return Err(Error::ChunkOverrun {
                tag: self.tag,
                offset,
                len,
                size: self.size,
            });
        }
        let mut buf = vec![0u8; len as usize];
        self.read(&mut buf, offset)?;
        Ok(buf)
    }

    /// Reads the whole payload.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        self.read_vec(0, self.size)
    }
}

impl fmt::Debug for DataChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataChunk")
            .field("tag", &self.tag)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .finish()
    }
}

#[derive(Debug, Clone)]
enum Chunk {
    Form(Form),
    Data(DataChunk),
}

/// A parsed `FORM` chunk: a typed list of nested chunks.
#[derive(Debug, Clone)]
pub struct Form {
    form_type: Tag,
    chunks: Vec<Chunk>,
}

impl Form {
    /// Parses the top-level form of a container.
    ///
    /// Fails with [Error::BadMagic] if the source does not start with a `FORM` chunk,
    /// or [Error::TruncatedChunk] if any chunk header or length is inconsistent
    /// with the available data.
    pub fn open(source: Arc<dyn Source>) -> Result<Self> {
        let total = source.len()?;
        let (tag, size) = read_chunk_header(source.as_ref(), 0, total)?;
        if tag != Tag::FORM {
            return Err(Error::BadMagic(tag));
        }
        let end = payload_end(tag, 0, size, total)?;
        Self::parse(&source, CHUNK_HEADER_SIZE, end)
    }

    /// Parses the payload of a `FORM` chunk spanning `[start, end)`.
    fn parse(source: &Arc<dyn Source>, start: u64, end: u64) -> Result<Self> {
        if end - start < 4 {
            return Err(Error::TruncatedChunk {
                tag: Tag::FORM,
                offset: start,
            });
        }
        let mut form_type = [0u8; 4];
        source.read_at(start, &mut form_type)?;

        let mut chunks = Vec::new();
        let mut offset = start + 4;
        while offset < end {
            let (tag, size) = read_chunk_header(source.as_ref(), offset, end)?;
            let payload_start = offset + CHUNK_HEADER_SIZE;
            let chunk_end = payload_end(tag, offset, size, end)?;

            if tag == Tag::FORM {
                chunks.push(Chunk::Form(Self::parse(source, payload_start, chunk_end)?));
            } else {
                chunks.push(Chunk::Data(DataChunk {
                    source: source.clone(),
                    tag,
                    offset: payload_start,
                    size,
                }));
            }
            offset = chunk_end;
        }

        Ok(Self {
            form_type: Tag(form_type),
            chunks,
        })
    }

    pub fn form_type(&self) -> Tag {
        self.form_type
    }

    /// Returns the first data chunk with the given tag.
    pub fn get(&self, tag: Tag) -> Option<&DataChunk> {
        self.chunks.iter().find_map(|c| match c {
            Chunk::Data(d) if d.tag == tag => Some(d),
            _ => None,
        })
    }

    /// Returns the first nested form of the given type.
    pub fn form(&self, form_type: Tag) -> Option<&Form> {
        self.chunks.iter().find_map(|c| match c {
            Chunk::Form(f) if f.form_type == form_type => Some(f),
            _ => None,
        })
    }

    /// Like [get](Form::get), but fails with [Error::MissingSection] instead of returning `None`.
    pub fn require(&self, tag: Tag) -> Result<&DataChunk> {
        self.get(tag).ok_or(Error::MissingSection(tag))
    }
}

fn read_chunk_header(source: &dyn Source, offset: u64, limit: u64) -> Result<(Tag, u64)> {
    if limit.saturating_sub(offset) < CHUNK_HEADER_SIZE {
        return Err(Error::TruncatedChunk {
            tag: Tag(*b"????"),
            offset,
        });
    }
    let mut header = [0u8; CHUNK_HEADER_SIZE as usize];
    source.read_at(offset, &mut header)?;

    let mut tag = [0u8; 4];
    tag.copy_from_slice(&header[..4]);
    let mut size = [0u8; 8];
    size.copy_from_slice(&header[4..]);
    Ok((Tag(tag), u64::from_le_bytes(size)))
}

fn payload_end(tag: Tag, offset: u64, size: u64, limit: u64) -> Result<u64> {
    match (offset + CHUNK_HEADER_SIZE).checked_add(size) {
        Some(end) if end <= limit => Ok(end),
        _ => Err(Error::TruncatedChunk { tag, offset }),
    }
}
