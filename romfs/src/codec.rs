use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use byml_value::{DocumentCodec, JsonDocumentCodec};
use thiserror::Error;
use zip::read::ZipArchive;
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("zstd stream failed: {0}")]
    Zstd(#[source] std::io::Error),
}

pub trait Compression {
    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError>;
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

#[derive(Clone, Copy, Debug)]
pub struct ZstdCompression {
    pub level: i32,
}

impl Default for ZstdCompression {
    fn default() -> Self {
        Self {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl Compression for ZstdCompression {
    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
        zstd::decode_all(bytes).map_err(CompressionError::Zstd)
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
        zstd::encode_all(bytes, self.level).map_err(CompressionError::Zstd)
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive open failed: {0}")]
    Open(#[source] ZipError),
    #[error("archive entry {index} unreadable: {source}")]
    Entry {
        index: usize,
        #[source]
        source: ZipError,
    },
    #[error("archive entry {name} truncated: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("archive write failed: {0}")]
    Write(#[source] ZipError),
    #[error("archive write failed: {0}")]
    WriteIo(#[source] std::io::Error),
}

/// An opened pack: file name to stored bytes.
pub trait Archive {
    fn get(&self, path: &str) -> Option<&[u8]>;
    fn names(&self) -> Vec<&str>;
}

pub trait ArchiveCodec {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn Archive>, ArchiveError>;
    fn build(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>, ArchiveError>;
}

#[derive(Debug, Default)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self { entries }
    }
}

impl Archive for MemoryArchive {
    fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

/// Upper bound on what an entry's declared size may preallocate.
const MAX_ENTRY_PREALLOCATION: u64 = 16 * 1024 * 1024;

fn entry_preallocation(declared: u64) -> usize {
    declared.min(MAX_ENTRY_PREALLOCATION) as usize
}

/// Packs as zip archives. Entries are read eagerly; directory entries are
/// skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipArchiveCodec;

impl ArchiveCodec for ZipArchiveCodec {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn Archive>, ArchiveError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(ArchiveError::Open)?;
        let mut entries = BTreeMap::new();
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|source| ArchiveError::Entry { index, source })?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().replace('\\', "/");
            let mut buffer = Vec::with_capacity(entry_preallocation(entry.size()));
            entry
                .read_to_end(&mut buffer)
                .map_err(|source| ArchiveError::Read {
                    name: name.clone(),
                    source,
                })?;
            entries.insert(name, buffer);
        }
        Ok(Box::new(MemoryArchive::new(entries)))
    }

    fn build(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, bytes) in entries {
            writer
                .start_file(name.as_str(), options)
                .map_err(ArchiveError::Write)?;
            writer.write_all(bytes).map_err(ArchiveError::WriteIo)?;
        }
        let cursor = writer.finish().map_err(ArchiveError::Write)?;
        Ok(cursor.into_inner())
    }
}

/// The three byte-level collaborators the loader delegates to.
pub struct Codecs {
    pub document: Box<dyn DocumentCodec>,
    pub archive: Box<dyn ArchiveCodec>,
    pub compression: Box<dyn Compression>,
}

impl Default for Codecs {
    fn default() -> Self {
        Self {
            document: Box::new(JsonDocumentCodec),
            archive: Box::new(ZipArchiveCodec),
            compression: Box::new(ZstdCompression::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zstd_round_trips() {
        let codec = ZstdCompression::default();
        let packed = codec.compress(b"stage data").unwrap();
        assert_eq!(codec.decompress(&packed).unwrap(), b"stage data");
    }

    #[test]
    fn zstd_rejects_garbage() {
        let codec = ZstdCompression::default();
        assert!(codec.decompress(b"definitely not zstd").is_err());
    }

    #[test]
    fn zip_pack_lists_entries() {
        let mut entries = BTreeMap::new();
        entries.insert("Stage/A.bgyml".to_string(), b"a".to_vec());
        entries.insert("Stage/B.bgyml".to_string(), b"bb".to_vec());
        let bytes = ZipArchiveCodec.build(&entries).unwrap();
        let archive = ZipArchiveCodec.open(&bytes).unwrap();
        assert_eq!(archive.names(), vec!["Stage/A.bgyml", "Stage/B.bgyml"]);
        assert_eq!(archive.get("Stage/B.bgyml"), Some(&b"bb"[..]));
        assert!(archive.get("Stage/C.bgyml").is_none());
    }

    #[test]
    fn declared_entry_size_is_capped() {
        assert_eq!(entry_preallocation(12), 12);
        assert_eq!(entry_preallocation(u64::MAX), MAX_ENTRY_PREALLOCATION as usize);
    }

    #[test]
    fn overstated_entry_size_still_reads_actual_bytes() {
        let mut entries = BTreeMap::new();
        entries.insert("Stage/A.bgyml".to_string(), b"abc".to_vec());
        let mut bytes = ZipArchiveCodec.build(&entries).unwrap();
        let central = bytes
            .windows(4)
            .position(|window| window == b"PK\x01\x02")
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0x7fff_0000u32.to_le_bytes());
        let archive = ZipArchiveCodec.open(&bytes).unwrap();
        assert_eq!(archive.get("Stage/A.bgyml"), Some(&b"abc"[..]));
    }
}
