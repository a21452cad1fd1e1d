use std::collections::BTreeMap;

use thiserror::Error;

const MAGIC: &[u8; 6] = b"RESTBL";
const HEADER_SIZE: usize = 22;
const CRC_ENTRY_SIZE: usize = 8;
pub const DEFAULT_STRING_BLOCK_SIZE: u32 = 160;
const MAX_ENTRIES: usize = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeTableError {
    #[error("invalid size table header")]
    InvalidHeader,
    #[error("size table has too many entries: {entries}")]
    TooManyEntries { entries: usize },
    #[error("size table {table} entries out of bounds")]
    EntriesOutOfBounds { table: &'static str },
    #[error("size table name entry {index} is not utf-8")]
    NameNotUtf8 { index: usize },
    #[error("name '{name}' does not fit the {limit} byte string block")]
    NameTooLong { name: String, limit: u32 },
}

/// Resource size table: decompressed sizes keyed by path hash, with a
/// by-name table for paths whose hashes collide.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceSizeTable {
    version: u32,
    string_block_size: u32,
    crc_entries: BTreeMap<u32, u32>,
    name_entries: BTreeMap<String, u32>,
}

impl Default for ResourceSizeTable {
    fn default() -> Self {
        Self {
            version: 1,
            string_block_size: DEFAULT_STRING_BLOCK_SIZE,
            crc_entries: BTreeMap::new(),
            name_entries: BTreeMap::new(),
        }
    }
}

impl ResourceSizeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.crc_entries.len() + self.name_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name entries take precedence over the hash table.
    pub fn get(&self, path: &str) -> Option<u32> {
        if let Some(size) = self.name_entries.get(path) {
            return Some(*size);
        }
        self.crc_entries.get(&crc32fast::hash(path.as_bytes())).copied()
    }

    pub fn insert(&mut self, path: &str, size: u32) {
        self.crc_entries.insert(crc32fast::hash(path.as_bytes()), size);
    }

    pub fn insert_name(&mut self, path: &str, size: u32) -> Result<(), SizeTableError> {
        if path.len() >= self.string_block_size as usize {
            return Err(SizeTableError::NameTooLong {
                name: path.to_string(),
                limit: self.string_block_size,
            });
        }
        self.name_entries.insert(path.to_string(), size);
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let block = self.string_block_size as usize;
        let mut out = Vec::with_capacity(
            HEADER_SIZE
                + self.crc_entries.len() * CRC_ENTRY_SIZE
                + self.name_entries.len() * (block + 4),
        );
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.string_block_size.to_le_bytes());
        out.extend_from_slice(&(self.crc_entries.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.name_entries.len() as u32).to_le_bytes());
        for (crc, size) in &self.crc_entries {
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
        }
        for (name, size) in &self.name_entries {
            let mut field = vec![0u8; block];
            field[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&field);
            out.extend_from_slice(&size.to_le_bytes());
        }
        out
    }
}

pub fn parse_size_table(data: &[u8]) -> Result<ResourceSizeTable, SizeTableError> {
    if data.len() < HEADER_SIZE || &data[0..6] != MAGIC {
        return Err(SizeTableError::InvalidHeader);
    }
    let version = read_u32_le(&data[6..10]);
    let string_block_size = read_u32_le(&data[10..14]);
    let crc_count = read_u32_le(&data[14..18]) as usize;
    let name_count = read_u32_le(&data[18..22]) as usize;
    if string_block_size == 0 {
        return Err(SizeTableError::InvalidHeader);
    }
    if crc_count + name_count > MAX_ENTRIES {
        return Err(SizeTableError::TooManyEntries {
            entries: crc_count + name_count,
        });
    }

    let crc_end = crc_count
        .checked_mul(CRC_ENTRY_SIZE)
        .and_then(|size| size.checked_add(HEADER_SIZE))
        .ok_or(SizeTableError::EntriesOutOfBounds { table: "crc" })?;
    if crc_end > data.len() {
        return Err(SizeTableError::EntriesOutOfBounds { table: "crc" });
    }
    let mut crc_entries = BTreeMap::new();
    for i in 0..crc_count {
        let base = HEADER_SIZE + i * CRC_ENTRY_SIZE;
        let crc = read_u32_le(&data[base..base + 4]);
        let size = read_u32_le(&data[base + 4..base + 8]);
        crc_entries.insert(crc, size);
    }

    let name_entry_size = string_block_size as usize + 4;
    let name_end = name_count
        .checked_mul(name_entry_size)
        .and_then(|size| size.checked_add(crc_end))
        .ok_or(SizeTableError::EntriesOutOfBounds { table: "name" })?;
    if name_end > data.len() {
        return Err(SizeTableError::EntriesOutOfBounds { table: "name" });
    }
    let mut name_entries = BTreeMap::new();
    for i in 0..name_count {
        let base = crc_end + i * name_entry_size;
        let name_bytes = &data[base..base + string_block_size as usize];
        let name_len = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name_bytes.len());
        let name = std::str::from_utf8(&name_bytes[..name_len])
            .map_err(|_| SizeTableError::NameNotUtf8 { index: i })?;
        let size_offset = base + string_block_size as usize;
        let size = read_u32_le(&data[size_offset..size_offset + 4]);
        name_entries.insert(name.to_string(), size);
    }

    Ok(ResourceSizeTable {
        version,
        string_block_size,
        crc_entries,
        name_entries,
    })
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
